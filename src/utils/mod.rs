pub mod dates;

pub use dates::{
    day_of, daily_distinct_counts, format_relative, format_relative_seconds, longest_streak,
    month_year, short_month_year,
};
