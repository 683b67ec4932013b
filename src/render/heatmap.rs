use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::models::{NormalizedProfile, Result};
use crate::render::palette::{self, heat_color};
use crate::render::svg::{Anchor, Document, Group, Rect, Text};
use crate::render::{finish, CardKind, Rendered};
use crate::utils::{day_of, daily_distinct_counts, longest_streak};

const WIDTH: f64 = 700.0;
const HEIGHT: f64 = 250.0;

pub const WEEKS: usize = 52;
pub const DAYS_PER_WEEK: usize = 7;

const CELL: f64 = 10.0;
const CELL_GAP: f64 = 2.0;
const PITCH: f64 = CELL + CELL_GAP;
const GRID_LEFT: f64 = 40.0;
const GRID_TOP: f64 = 48.0;

const TILES_TOP: f64 = 148.0;
const TILE_HEIGHT: f64 = 72.0;
const TILE_GAP: f64 = 8.0;
const SIDE_PAD: f64 = 20.0;

const FUTURE_OPACITY: f64 = 0.4;

const YEAR_DAYS: i64 = 365;
const MONTH_DAYS: i64 = 30;

/// Distinct-problem counts and longest streaks over three windows ending
/// today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityStats {
    pub total_solved: usize,
    pub solved_last_year: usize,
    pub solved_last_month: usize,
    pub max_streak: u32,
    pub max_streak_year: u32,
    pub max_streak_month: u32,
}

/// Inclusive `[today - (days - 1), today]`.
fn trailing(today: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(days - 1), today)
}

fn distinct_in(profile: &NormalizedProfile, window: (NaiveDate, NaiveDate)) -> usize {
    profile
        .activity_events
        .iter()
        .filter(|e| {
            day_of(e.timestamp_seconds)
                .map(|day| day >= window.0 && day <= window.1)
                .unwrap_or(false)
        })
        .map(|e| e.problem_key.as_str())
        .collect::<HashSet<_>>()
        .len()
}

pub fn activity_stats(profile: &NormalizedProfile, today: NaiveDate) -> ActivityStats {
    let year = trailing(today, YEAR_DAYS);
    let month = trailing(today, MONTH_DAYS);
    let all_days = daily_distinct_counts(&profile.activity_events, None);

    ActivityStats {
        total_solved: profile.distinct_problems(),
        solved_last_year: distinct_in(profile, year),
        solved_last_month: distinct_in(profile, month),
        max_streak: longest_streak(&all_days, None),
        max_streak_year: longest_streak(&all_days, Some(year)),
        max_streak_month: longest_streak(&all_days, Some(month)),
    }
}

/// Monday of the first grid column. The last column is the week holding
/// `today`, so rows line up with weekdays (row 0 is Monday).
pub fn grid_start(today: NaiveDate) -> NaiveDate {
    let this_monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    this_monday - Duration::weeks(WEEKS as i64 - 1)
}

/// Columns that get a month label: the first week starting within the
/// first seven days of a month, once per month.
pub fn month_label_columns(start: NaiveDate) -> Vec<(usize, String)> {
    let mut labels = Vec::new();
    let mut last_month = None;

    for column in 0..WEEKS {
        let week_start = start + Duration::weeks(column as i64);
        let month = (week_start.year(), week_start.month());
        if week_start.day() <= 7 && last_month != Some(month) {
            labels.push((column, week_start.format("%b").to_string()));
            last_month = Some(month);
        }
    }

    labels
}

/// Calendar heatmap of the trailing year of solves plus summary tiles.
pub fn render_heatmap(profile: &NormalizedProfile, now: DateTime<Utc>) -> Rendered {
    finish(CardKind::Heatmap, layout(profile, now.date_naive()))
}

fn layout(profile: &NormalizedProfile, today: NaiveDate) -> Result<Document> {
    profile.validate()?;

    let counts = daily_distinct_counts(&profile.activity_events, Some(trailing(today, YEAR_DAYS)));
    let stats = activity_stats(profile, today);
    let start = grid_start(today);

    let mut doc = Document::new(WIDTH, HEIGHT).title(format!("{}'s activity", profile.handle));
    doc.push(
        Rect::new(0.5, 0.5, WIDTH - 1.0, HEIGHT - 1.0)
            .fill(palette::BACKGROUND)
            .stroke(palette::BORDER, 1.0)
            .radius(10.0),
    );
    doc.push(
        Text::new(
            SIDE_PAD,
            24.0,
            format!("{} · {} problems in the last year", profile.handle, stats.solved_last_year),
        )
        .size(14.0)
        .fill(palette::TEXT_PRIMARY)
        .bold(),
    );
    push_legend(&mut doc);

    let mut months = Group::new().class("months");
    for (column, label) in month_label_columns(start) {
        months.push(
            Text::new(GRID_LEFT + column as f64 * PITCH, GRID_TOP - 6.0, label)
                .size(10.0)
                .fill(palette::TEXT_MUTED),
        );
    }
    doc.push(months);

    let mut weekdays = Group::new().class("weekdays");
    for (row, label) in [(0, "Mon"), (2, "Wed"), (4, "Fri")] {
        weekdays.push(
            Text::new(GRID_LEFT - 6.0, GRID_TOP + row as f64 * PITCH + CELL - 1.0, label)
                .size(9.0)
                .fill(palette::TEXT_MUTED)
                .anchor(Anchor::End),
        );
    }
    doc.push(weekdays);

    doc.push(grid(&counts, start, today));
    push_tiles(&mut doc, &stats);

    Ok(doc)
}

/// All 52×7 cells. Days after `today` in the last column are dimmed and
/// carry no tooltip.
fn grid(counts: &BTreeMap<NaiveDate, usize>, start: NaiveDate, today: NaiveDate) -> Group {
    let mut cells = Group::new().class("cells");

    for column in 0..WEEKS {
        for row in 0..DAYS_PER_WEEK {
            let day = start + Duration::days((column * DAYS_PER_WEEK + row) as i64);
            let cell = Rect::new(
                GRID_LEFT + column as f64 * PITCH,
                GRID_TOP + row as f64 * PITCH,
                CELL,
                CELL,
            )
            .radius(2.0);

            if day > today {
                cells.push(cell.fill(heat_color(0)).opacity(FUTURE_OPACITY));
                continue;
            }

            let count = counts.get(&day).copied().unwrap_or(0);
            let noun = if count == 1 { "problem" } else { "problems" };
            cells.push(
                cell.fill(heat_color(count))
                    .title(format!("{} {} on {}", count, noun, day.format("%Y-%m-%d"))),
            );
        }
    }

    cells
}

fn push_legend(doc: &mut Document) {
    let mut legend = Group::new().class("legend");
    let right = WIDTH - SIDE_PAD;
    let swatches = [0, 1, 2, 3, 5];
    let swatch = 8.0;
    let first_x = right - 28.0 - swatches.len() as f64 * (swatch + 2.0);

    legend.push(
        Text::new(first_x - 4.0, 24.0, "Less")
            .size(9.0)
            .fill(palette::TEXT_MUTED)
            .anchor(Anchor::End),
    );
    for (i, count) in swatches.into_iter().enumerate() {
        legend.push(
            Rect::new(first_x + i as f64 * (swatch + 2.0), 16.0, swatch, swatch)
                .fill(heat_color(count))
                .radius(1.5),
        );
    }
    legend.push(
        Text::new(right, 24.0, "More")
            .size(9.0)
            .fill(palette::TEXT_MUTED)
            .anchor(Anchor::End),
    );

    doc.push(legend);
}

fn push_tiles(doc: &mut Document, stats: &ActivityStats) {
    let days = |n: u32| if n == 1 { "1 day".to_string() } else { format!("{} days", n) };
    let tiles = [
        ("Solved", "all time", stats.total_solved.to_string()),
        ("Solved", "last year", stats.solved_last_year.to_string()),
        ("Solved", "last month", stats.solved_last_month.to_string()),
        ("Max streak", "all time", days(stats.max_streak)),
        ("Max streak", "last year", days(stats.max_streak_year)),
        ("Max streak", "last month", days(stats.max_streak_month)),
    ];

    let count = tiles.len() as f64;
    let tile_width = (WIDTH - 2.0 * SIDE_PAD - (count - 1.0) * TILE_GAP) / count;

    let mut group = Group::new().class("stats");
    for (i, (label, window, value)) in tiles.into_iter().enumerate() {
        let x = SIDE_PAD + i as f64 * (tile_width + TILE_GAP);
        let center = x + tile_width / 2.0;

        group.push(
            Rect::new(x, TILES_TOP, tile_width, TILE_HEIGHT)
                .fill("#F6F8FA")
                .radius(6.0),
        );
        group.push(
            Text::new(center, TILES_TOP + 30.0, value)
                .size(18.0)
                .fill(palette::TEXT_PRIMARY)
                .anchor(Anchor::Middle)
                .bold(),
        );
        group.push(
            Text::new(center, TILES_TOP + 48.0, label)
                .size(10.0)
                .fill(palette::TEXT_MUTED)
                .anchor(Anchor::Middle),
        );
        group.push(
            Text::new(center, TILES_TOP + 62.0, window)
                .size(9.0)
                .fill(palette::TEXT_MUTED)
                .anchor(Anchor::Middle),
        );
    }
    doc.push(group);
}
