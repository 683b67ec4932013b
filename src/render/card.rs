use chrono::{DateTime, Utc};

use crate::models::{NormalizedProfile, Result};
use crate::render::palette::{self, rank_color};
use crate::render::svg::{Anchor, Circle, ClipCircle, Document, Image, Rect, Text};
use crate::render::{finish, CardKind, Rendered};
use crate::utils::format_relative_seconds;

const WIDTH: f64 = 500.0;
const HEIGHT: f64 = 300.0;
const HEADER_HEIGHT: f64 = 72.0;
const PAD: f64 = 24.0;

const AVATAR_CX: f64 = 420.0;
const AVATAR_CY: f64 = 84.0;
const AVATAR_SIZE: f64 = 100.0;

const INFO_TOP: f64 = 96.0;
const INFO_STEP: f64 = 18.0;
const INFO_MAX_CHARS: usize = 42;

const TILES_TOP: f64 = 148.0;
const TILE_HEIGHT: f64 = 50.0;
const TILE_GAP: f64 = 10.0;
const MAX_TILES: usize = 6;

const TILE_BACKGROUND: &str = "#F6F8FA";

/// Profile summary badge. `avatar` must already be an embeddable data URI.
pub fn render_card(profile: &NormalizedProfile, avatar: &str, now: DateTime<Utc>) -> Rendered {
    finish(CardKind::Profile, layout(profile, avatar, now))
}

struct Tile {
    label: &'static str,
    value: String,
    color: &'static str,
}

fn layout(profile: &NormalizedProfile, avatar: &str, now: DateTime<Utc>) -> Result<Document> {
    profile.validate()?;

    let accent = rank_color(&profile.rank_label);
    let mut doc = Document::new(WIDTH, HEIGHT).title(format!("{}'s profile", profile.handle));

    doc.push(
        Rect::new(0.5, 0.5, WIDTH - 1.0, HEIGHT - 1.0)
            .fill(palette::BACKGROUND)
            .stroke(palette::BORDER, 1.0)
            .radius(10.0),
    );

    // Header band: rounded on top, square where it meets the body.
    doc.push(Rect::new(0.0, 0.0, WIDTH, HEADER_HEIGHT).fill(accent).radius(10.0));
    doc.push(Rect::new(0.0, HEADER_HEIGHT - 12.0, WIDTH, 12.0).fill(accent));

    doc.push(
        Text::new(PAD, 38.0, ellipsize(&profile.handle, 22))
            .size(24.0)
            .fill("#FFFFFF")
            .bold(),
    );
    let rank = if profile.rank_label.trim().is_empty() {
        "unrated".to_string()
    } else {
        profile.rank_label.clone()
    };
    doc.push(Text::new(PAD, 60.0, title_case(&rank)).size(14.0).fill("#FFFFFF"));

    push_avatar(&mut doc, avatar, accent);

    for (i, line) in info_lines(profile, now).into_iter().enumerate() {
        doc.push(
            Text::new(PAD, INFO_TOP + i as f64 * INFO_STEP, line)
                .size(13.0)
                .fill(palette::TEXT_MUTED),
        );
    }

    push_tiles(&mut doc, &stat_tiles(profile));

    let (caption, color) = match profile.peak_rating() {
        Some(max) => {
            let label = if profile.max_rank_label.trim().is_empty() {
                String::new()
            } else {
                format!(" ({})", profile.max_rank_label)
            };
            (format!("Max rating: {}{}", max, label), rank_color(&profile.max_rank_label))
        }
        None => ("Max rating: unrated".to_string(), palette::TEXT_MUTED),
    };
    doc.push(Text::new(PAD, HEIGHT - 18.0, caption).size(13.0).fill(color).bold());

    Ok(doc)
}

fn push_avatar(doc: &mut Document, avatar: &str, accent: &str) {
    let r = AVATAR_SIZE / 2.0;

    doc.clip(ClipCircle {
        id: "avatar-clip".to_string(),
        cx: AVATAR_CX,
        cy: AVATAR_CY,
        r,
    });
    doc.push(Circle::new(AVATAR_CX, AVATAR_CY, r + 5.0).fill(palette::BACKGROUND));
    doc.push(Image {
        x: AVATAR_CX - r,
        y: AVATAR_CY - r,
        width: AVATAR_SIZE,
        height: AVATAR_SIZE,
        href: avatar.to_string(),
        clip_path: Some("avatar-clip".to_string()),
    });
    doc.push(Circle::new(AVATAR_CX, AVATAR_CY, r + 1.0).stroke(accent, 4.0));
}

fn info_lines(profile: &NormalizedProfile, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = Vec::new();

    let place: Vec<&str> = [profile.location.as_deref(), profile.country.as_deref()]
        .into_iter()
        .flatten()
        .filter(|s| !s.trim().is_empty())
        .collect();
    if !place.is_empty() {
        lines.push(place.join(", "));
    }

    if let Some(org) = profile.organization.as_deref().filter(|s| !s.trim().is_empty()) {
        lines.push(org.to_string());
    }

    if let Some(seen) = profile
        .last_online_seconds
        .and_then(|ts| format_relative_seconds(ts, now))
    {
        lines.push(format!("Last seen {}", seen));
    } else if let Some(registered) = profile
        .registered_seconds
        .and_then(|ts| format_relative_seconds(ts, now))
    {
        lines.push(format!("Registered {}", registered));
    }

    lines
        .into_iter()
        .take(3)
        .map(|line| ellipsize(&line, INFO_MAX_CHARS))
        .collect()
}

fn stat_tiles(profile: &NormalizedProfile) -> Vec<Tile> {
    let contribution = profile.contribution.unwrap_or(0);

    let mut tiles = vec![
        Tile {
            label: "Rating",
            value: profile
                .rating()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "Unrated".to_string()),
            color: rank_color(&profile.rank_label),
        },
        Tile {
            label: "Contests",
            value: profile.rating_history.len().to_string(),
            color: palette::TEXT_PRIMARY,
        },
        Tile {
            label: "Contribution",
            value: if contribution > 0 {
                format!("+{}", contribution)
            } else {
                contribution.to_string()
            },
            color: if contribution > 0 { palette::POSITIVE } else { palette::NEGATIVE },
        },
        Tile {
            label: "Solved",
            value: profile.distinct_problems().to_string(),
            color: palette::TEXT_PRIMARY,
        },
    ];

    let extras = [
        ("Friends of", profile.friend_count),
        ("Global rank", profile.global_rank),
        ("Country rank", profile.country_rank),
    ];
    for (label, value) in extras {
        if let Some(value) = value {
            tiles.push(Tile {
                label,
                value: value.to_string(),
                color: palette::TEXT_PRIMARY,
            });
        }
    }

    tiles.truncate(MAX_TILES);
    tiles
}

/// Two rows; two columns for up to four tiles, three beyond that.
fn push_tiles(doc: &mut Document, tiles: &[Tile]) {
    let columns = if tiles.len() > 4 { 3 } else { 2 };
    let area = WIDTH - 2.0 * PAD;
    let tile_width = (area - (columns as f64 - 1.0) * TILE_GAP) / columns as f64;

    for (i, tile) in tiles.iter().enumerate() {
        let x = PAD + (i % columns) as f64 * (tile_width + TILE_GAP);
        let y = TILES_TOP + (i / columns) as f64 * (TILE_HEIGHT + TILE_GAP);

        doc.push(
            Rect::new(x, y, tile_width, TILE_HEIGHT)
                .fill(TILE_BACKGROUND)
                .radius(6.0),
        );
        doc.push(
            Text::new(x + 12.0, y + 18.0, tile.label)
                .size(11.0)
                .fill(palette::TEXT_MUTED),
        );
        doc.push(
            Text::new(x + 12.0, y + 40.0, tile.value.clone())
                .size(18.0)
                .fill(tile.color)
                .bold(),
        );
    }
}

fn ellipsize(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
