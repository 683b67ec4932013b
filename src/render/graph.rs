use chrono::{DateTime, Utc};

use crate::models::{NormalizedProfile, RatingChange, Result};
use crate::render::palette::{
    self, rank_color, rating_color, RatingBand, BAND_OPACITY, RATING_BANDS,
};
use crate::render::scale::LinearScale;
use crate::render::svg::{Anchor, Circle, Document, Group, Line, Path, Rect, Text};
use crate::render::{fallback, finish, CardKind, Rendered};
use crate::utils::{month_year, short_month_year};

const WIDTH: f64 = 900.0;
const HEIGHT: f64 = 420.0;
const LEFT_PAD: f64 = 60.0;
const RIGHT_PAD: f64 = 30.0;
const PLOT_TOP: f64 = 60.0;
const PLOT_BOTTOM: f64 = HEIGHT - 50.0;

/// Minimum horizontal distance between two x-axis labels.
const MIN_LABEL_SPACING: f64 = 100.0;

/// Lowest ceiling the y axis ever gets, so the top bands always show.
const RATING_CEILING_FLOOR: i64 = 3000;
const RATING_HEADROOM: i64 = 200;

/// Rating history line chart over tier bands.
///
/// `now` is accepted for symmetry with the other renderers; the chart
/// itself only depends on the profile.
pub fn render_graph(profile: &NormalizedProfile, _now: DateTime<Utc>) -> Rendered {
    if let Err(e) = profile.validate() {
        return finish(CardKind::Graph, Err(e));
    }

    let history = profile.sorted_history();
    if history.is_empty() {
        return Rendered::Svg(fallback::render(
            CardKind::Graph,
            &format!("No rating history available for {}", profile.handle),
        ));
    }

    finish(CardKind::Graph, layout(profile, &history))
}

/// Top of the y axis: the user's peak (at least 3000) plus headroom, rounded
/// up to the next hundred. Saturates near `i64::MAX`.
pub fn dynamic_max_rating(max_rating: i64) -> i64 {
    let top = max_rating
        .max(RATING_CEILING_FLOOR)
        .saturating_add(RATING_HEADROOM);
    top.saturating_add(99).div_euclid(100) * 100
}

/// Indices of the points that get an x-axis label: first and last always,
/// interior points only once they are far enough from the previous label.
pub fn x_label_indices(xs: &[f64], min_spacing: f64) -> Vec<usize> {
    let Some(last_index) = xs.len().checked_sub(1) else {
        return Vec::new();
    };

    let mut picked = vec![0];
    let mut last_x = xs[0];
    for (i, &x) in xs.iter().enumerate().take(last_index).skip(1) {
        if x - last_x >= min_spacing {
            picked.push(i);
            last_x = x;
        }
    }
    if last_index > 0 {
        picked.push(last_index);
    }
    picked
}

/// Visible slice `[low, high)` of a band clipped to the y domain, or `None`
/// when nothing of it is on screen.
fn visible_band(band: &RatingBand, floor: i64, ceiling: i64) -> Option<(i64, i64)> {
    let low = band.min.max(floor);
    let high = band.max.unwrap_or(ceiling).min(ceiling);
    (high > low).then_some((low, high))
}

fn layout(profile: &NormalizedProfile, history: &[RatingChange]) -> Result<Document> {
    let user_min = history.iter().map(|c| c.new_rating).min().unwrap_or(0);
    let user_max = history.iter().map(|c| c.new_rating).max().unwrap_or(0);
    let ceiling = dynamic_max_rating(profile.peak_rating().unwrap_or(0).max(user_max));

    let first_ts = history.first().map(|c| c.timestamp_seconds).unwrap_or(0);
    let last_ts = history.last().map(|c| c.timestamp_seconds).unwrap_or(0);

    let x_scale = LinearScale::new(
        (first_ts as f64, last_ts as f64),
        (LEFT_PAD, WIDTH - RIGHT_PAD),
    );
    let y_scale = LinearScale::new((user_min as f64, ceiling as f64), (PLOT_BOTTOM, PLOT_TOP));
    let plot_width = WIDTH - LEFT_PAD - RIGHT_PAD;

    let mut doc =
        Document::new(WIDTH, HEIGHT).title(format!("{}'s rating history", profile.handle));
    doc.push(
        Rect::new(0.5, 0.5, WIDTH - 1.0, HEIGHT - 1.0)
            .fill(palette::BACKGROUND)
            .stroke(palette::BORDER, 1.0)
            .radius(10.0),
    );

    push_header(&mut doc, profile);

    let mut bands = Group::new().class("bands");
    let mut y_axis = Group::new().class("y-axis");
    for band in RATING_BANDS {
        if let Some((low, high)) = visible_band(band, user_min, ceiling) {
            let top = y_scale.map(high as f64);
            let bottom = y_scale.map(low as f64);
            bands.push(
                Rect::new(LEFT_PAD, top, plot_width, bottom - top)
                    .fill(band.color)
                    .opacity(BAND_OPACITY),
            );
        }

        if band.min >= user_min && band.min <= ceiling {
            let y = y_scale.map(band.min as f64);
            y_axis.push(
                Line::new(LEFT_PAD, y, WIDTH - RIGHT_PAD, y, palette::BORDER, 1.0).dashed(),
            );
            y_axis.push(
                Text::new(LEFT_PAD - 8.0, y + 4.0, band.min.to_string())
                    .size(11.0)
                    .fill(palette::TEXT_MUTED)
                    .anchor(Anchor::End),
            );
        }
    }
    doc.push(bands);
    doc.push(y_axis);

    doc.push(
        Rect::new(LEFT_PAD, PLOT_TOP, plot_width, PLOT_BOTTOM - PLOT_TOP)
            .stroke(palette::BORDER, 1.0),
    );

    let points: Vec<(f64, f64)> = history
        .iter()
        .map(|c| (x_scale.map(c.timestamp_seconds as f64), y_scale.map(c.new_rating as f64)))
        .collect();

    let mut x_axis = Group::new().class("x-axis");
    let xs: Vec<f64> = points.iter().map(|p| p.0).collect();
    for i in x_label_indices(&xs, MIN_LABEL_SPACING) {
        let x = xs[i];
        x_axis.push(Line::new(x, PLOT_BOTTOM, x, PLOT_BOTTOM + 5.0, palette::TEXT_MUTED, 1.0));
        x_axis.push(
            Text::new(x, PLOT_BOTTOM + 20.0, short_month_year(history[i].timestamp_seconds))
                .size(11.0)
                .fill(palette::TEXT_MUTED)
                .anchor(Anchor::Middle),
        );
    }
    doc.push(x_axis);

    if points.len() >= 2 {
        doc.push(Path::polyline(&points, palette::LINE, 2.0));
    }

    let mut markers = Group::new().class("points");
    for (change, &(x, y)) in history.iter().zip(&points) {
        markers.push(
            Circle::new(x, y, 4.0)
                .fill(palette::BACKGROUND)
                .stroke(rating_color(change.new_rating), 2.0)
                .title(tooltip(change)),
        );
    }
    doc.push(markers);

    Ok(doc)
}

fn tooltip(change: &RatingChange) -> String {
    let mut text = format!(
        "{} — {}: {}",
        change.new_rating,
        month_year(change.timestamp_seconds),
        change.contest_name
    );
    if let Some(rank) = change.contest_rank {
        text.push_str(&format!(" (rank {})", rank));
    }
    text
}

fn push_header(doc: &mut Document, profile: &NormalizedProfile) {
    doc.push(
        Text::new(LEFT_PAD, 36.0, profile.handle.clone())
            .size(20.0)
            .fill(rank_color(&profile.rank_label))
            .bold(),
    );

    let current = profile
        .rating()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unrated".to_string());
    let max = profile
        .peak_rating()
        .map(|r| r.to_string())
        .unwrap_or_else(|| "unrated".to_string());
    doc.push(
        Text::new(WIDTH - RIGHT_PAD, 36.0, format!("Current: {}   Max: {}", current, max))
            .size(14.0)
            .fill(palette::TEXT_PRIMARY)
            .anchor(Anchor::End),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn change(ts: i64, rating: i64) -> RatingChange {
        RatingChange {
            timestamp_seconds: ts,
            new_rating: rating,
            contest_name: format!("Round {}", ts),
            contest_rank: None,
        }
    }

    fn profile_with(history: Vec<RatingChange>) -> NormalizedProfile {
        let mut profile = NormalizedProfile::new("petr");
        profile.current_rating = history.last().map(|c| c.new_rating);
        profile.max_rating = history.iter().map(|c| c.new_rating).max();
        profile.rank_label = "master".to_string();
        profile.rating_history = history;
        profile
    }

    fn path_data(svg: &str) -> Option<String> {
        let start = svg.find("<path d=\"")? + "<path d=\"".len();
        let end = svg[start..].find('"')? + start;
        Some(svg[start..end].to_string())
    }

    #[test]
    fn test_dynamic_max_rating() {
        assert_eq!(dynamic_max_rating(0), 3200);
        assert_eq!(dynamic_max_rating(3000), 3200);
        assert_eq!(dynamic_max_rating(3001), 3300);
        assert_eq!(dynamic_max_rating(3850), 4100);
    }

    #[test]
    fn test_dynamic_max_rating_saturates() {
        let top = dynamic_max_rating(i64::MAX);
        assert!(top > 3000);
        assert_eq!(top % 100, 0);
        assert!(dynamic_max_rating(i64::MAX - 150) > 3000);
    }

    #[test]
    fn test_huge_ratings_still_render() {
        let history = vec![change(1_600_000_000, 1500), change(1_700_000_000, i64::MAX)];
        let mut profile = profile_with(history);
        profile.max_rating = Some(i64::MAX);

        let rendered = render_graph(&profile, now());
        assert!(!rendered.is_fallback());
        assert!(roxmltree::Document::parse(rendered.svg()).is_ok());
    }

    #[test]
    fn test_shared_timestamp_collapses_to_midpoint() {
        let history = vec![change(1_600_000_000, 1500), change(1_600_000_000, 1600)];
        let rendered = render_graph(&profile_with(history), now());
        assert!(!rendered.is_fallback());

        let d = path_data(rendered.svg()).unwrap();
        assert!(d.starts_with("M 465 "));
        assert!(d.contains("L 465 "));
    }

    #[test]
    fn test_path_has_one_move_and_n_minus_one_lines() {
        let history = vec![
            change(1_500_000_000, 1500),
            change(1_510_000_000, 1620),
            change(1_520_000_000, 1580),
            change(1_530_000_000, 1710),
        ];
        let svg = render_graph(&profile_with(history), now()).into_svg();
        let d = path_data(&svg).unwrap();

        assert_eq!(d.matches('M').count(), 1);
        assert_eq!(d.matches('L').count(), 3);
        assert_eq!(svg.matches("<circle").count(), 4);
    }

    #[test]
    fn test_unsorted_history_is_drawn_in_time_order() {
        let history = vec![change(300, 1400), change(100, 1200), change(200, 1300)];
        let svg = render_graph(&profile_with(history), now()).into_svg();
        let d = path_data(&svg).unwrap();

        assert!(d.starts_with("M 60 "));
        assert!(d.contains("L 870 "));
        let xs: Vec<f64> = d
            .split(|c: char| c == 'M' || c == 'L')
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.split_whitespace().next().unwrap().parse().unwrap())
            .collect();
        assert!(xs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_single_point_has_marker_and_no_line() {
        let rendered = render_graph(&profile_with(vec![change(1_600_000_000, 1900)]), now());
        assert!(!rendered.is_fallback());

        let svg = rendered.into_svg();
        assert!(path_data(&svg).is_none());
        assert_eq!(svg.matches("<circle").count(), 1);
        // degenerate time domain lands in the middle of the plot
        assert!(svg.contains(r#"cx="465""#));
    }

    #[test]
    fn test_empty_history_placeholder() {
        let rendered = render_graph(&NormalizedProfile::new("petr"), now());
        assert!(!rendered.is_fallback());

        let svg = rendered.into_svg();
        assert!(svg.contains("No rating history available for petr"));
        assert!(svg.contains(r#"width="900" height="420""#));
    }

    #[test]
    fn test_label_spacing() {
        let xs = [60.0, 100.0, 170.0, 200.0, 280.0, 300.0];
        assert_eq!(x_label_indices(&xs, 100.0), vec![0, 2, 4, 5]);
        assert_eq!(x_label_indices(&[465.0], 100.0), vec![0]);
        assert!(x_label_indices(&[], 100.0).is_empty());
    }

    #[test]
    fn test_bands_below_floor_are_skipped() {
        let newbie = &RATING_BANDS[0];
        assert_eq!(visible_band(newbie, 1500, 3200), None);

        let specialist = &RATING_BANDS[2];
        assert_eq!(visible_band(specialist, 1500, 3200), Some((1500, 1600)));

        let legendary = RATING_BANDS.last().unwrap();
        assert_eq!(visible_band(legendary, 1500, 3200), Some((3000, 3200)));
    }

    #[test]
    fn test_tooltip_text() {
        let mut c = change(1_709_251_200, 2100); // 2024-03-01
        c.contest_rank = Some(12);
        assert_eq!(tooltip(&c), "2100 — March 2024: Round 1709251200 (rank 12)");
    }
}
