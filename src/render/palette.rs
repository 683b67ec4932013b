/// Colors shared by every card.
pub const DEFAULT_RANK_COLOR: &str = "#000000";
pub const BACKGROUND: &str = "#FFFFFF";
pub const BORDER: &str = "#E4E2E2";
pub const TEXT_PRIMARY: &str = "#24292F";
pub const TEXT_MUTED: &str = "#57606A";
pub const POSITIVE: &str = "#2E7D32";
pub const NEGATIVE: &str = "#C62828";
pub const LINE: &str = "#2F3A4A";

/// Rank tier name to display color, most specific names first.
const RANK_COLORS: &[(&str, &str)] = &[
    ("legendary grandmaster", "#FF0000"),
    ("international grandmaster", "#FF0000"),
    ("grandmaster", "#FF0000"),
    ("international master", "#FF8C00"),
    ("candidate master", "#AA00AA"),
    ("master", "#FF8C00"),
    ("expert", "#0000FF"),
    ("specialist", "#03A89E"),
    ("pupil", "#008000"),
    ("newbie", "#808080"),
];

/// Color for a rank tier name, case-insensitive; unknown and empty names
/// (unrated users) get [`DEFAULT_RANK_COLOR`].
pub fn rank_color(rank: &str) -> &'static str {
    let rank = rank.trim().to_lowercase();
    RANK_COLORS
        .iter()
        .find(|(name, _)| *name == rank)
        .map(|(_, color)| *color)
        .unwrap_or(DEFAULT_RANK_COLOR)
}

/// A named rating interval drawn as a background stripe on the rating graph.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatingBand {
    pub name: &'static str,
    pub min: i64,
    /// Exclusive upper bound; `None` for the open-ended top band.
    pub max: Option<i64>,
    pub color: &'static str,
}

pub const BAND_OPACITY: f64 = 0.3;

pub const RATING_BANDS: &[RatingBand] = &[
    RatingBand { name: "newbie", min: 0, max: Some(1200), color: "#CCCCCC" },
    RatingBand { name: "pupil", min: 1200, max: Some(1400), color: "#77FF77" },
    RatingBand { name: "specialist", min: 1400, max: Some(1600), color: "#77DDBB" },
    RatingBand { name: "expert", min: 1600, max: Some(1900), color: "#AAAAFF" },
    RatingBand { name: "candidate master", min: 1900, max: Some(2100), color: "#FF88FF" },
    RatingBand { name: "master", min: 2100, max: Some(2300), color: "#FFCC88" },
    RatingBand { name: "international master", min: 2300, max: Some(2400), color: "#FFBB55" },
    RatingBand { name: "grandmaster", min: 2400, max: Some(2600), color: "#FF7777" },
    RatingBand { name: "international grandmaster", min: 2600, max: Some(3000), color: "#FF3333" },
    RatingBand { name: "legendary grandmaster", min: 3000, max: None, color: "#AA0000" },
];

/// Rank color for a numeric rating, using the band it falls in.
pub fn rating_color(rating: i64) -> &'static str {
    RATING_BANDS
        .iter()
        .rev()
        .find(|band| rating >= band.min)
        .map(|band| rank_color(band.name))
        .unwrap_or(DEFAULT_RANK_COLOR)
}

/// Heatmap fill for a day's distinct-solve count.
pub fn heat_color(count: usize) -> &'static str {
    match count {
        0 => "#EBEDF0",
        1 => "#9BE9A8",
        2 => "#40C463",
        3..=4 => "#30A14E",
        _ => "#216E39",
    }
}
