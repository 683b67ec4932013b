use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{CardError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Codeforces,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Codeforces => "codeforces",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "codeforces" | "cf" => Some(Platform::Codeforces),
            _ => None,
        }
    }
}

/// Source-independent view of a competitive programmer, as consumed by the
/// renderers. Built fresh per request and never mutated while rendering.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NormalizedProfile {
    pub handle: String,
    pub current_rating: Option<i64>,
    pub max_rating: Option<i64>,
    #[serde(default)]
    pub rank_label: String,
    #[serde(default)]
    pub max_rank_label: String,
    #[serde(default)]
    pub rating_history: Vec<RatingChange>,
    #[serde(default)]
    pub activity_events: Vec<ActivityEvent>,
    pub avatar_ref: Option<String>,

    // Display-only extras
    pub location: Option<String>,
    pub organization: Option<String>,
    pub country: Option<String>,
    pub contribution: Option<i64>,
    pub friend_count: Option<u64>,
    pub global_rank: Option<u64>,
    pub country_rank: Option<u64>,
    pub last_online_seconds: Option<i64>,
    pub registered_seconds: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RatingChange {
    pub timestamp_seconds: i64,
    pub new_rating: i64,
    pub contest_name: String,
    pub contest_rank: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityEvent {
    pub timestamp_seconds: i64,
    pub problem_key: String,
}

impl NormalizedProfile {
    pub fn new(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            ..Default::default()
        }
    }

    /// Checks the invariants the renderers rely on.
    pub fn validate(&self) -> Result<()> {
        if self.handle.trim().is_empty() {
            return Err(CardError::MalformedInput("profile has no handle".to_string()));
        }

        if let Some(bad) = self.rating_history.iter().find(|c| c.new_rating <= 0) {
            return Err(CardError::MalformedInput(format!(
                "non-positive rating {} after {}",
                bad.new_rating, bad.contest_name
            )));
        }

        Ok(())
    }

    /// Zero and missing ratings both mean unrated.
    pub fn rating(&self) -> Option<i64> {
        self.current_rating.filter(|r| *r > 0)
    }

    pub fn peak_rating(&self) -> Option<i64> {
        self.max_rating.filter(|r| *r > 0)
    }

    /// Rating history in chronological order, regardless of input order.
    pub fn sorted_history(&self) -> Vec<RatingChange> {
        let mut history = self.rating_history.clone();
        history.sort_by_key(|change| change.timestamp_seconds);
        history
    }

    /// Number of distinct problems solved over the whole history.
    pub fn distinct_problems(&self) -> usize {
        self.activity_events
            .iter()
            .map(|e| e.problem_key.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(ts: i64, key: &str) -> ActivityEvent {
        ActivityEvent {
            timestamp_seconds: ts,
            problem_key: key.to_string(),
        }
    }

    #[test]
    fn test_platform_parsing() {
        assert_eq!(Platform::from_str("codeforces"), Some(Platform::Codeforces));
        assert_eq!(Platform::from_str("CF"), Some(Platform::Codeforces));
        assert_eq!(Platform::from_str("topcoder"), None);
    }

    #[test]
    fn test_validate_rejects_blank_handle() {
        let profile = NormalizedProfile::new("   ");
        assert!(matches!(profile.validate(), Err(CardError::MalformedInput(_))));
    }

    #[test]
    fn test_zero_rating_is_unrated() {
        let mut profile = NormalizedProfile::new("tourist");
        profile.current_rating = Some(0);
        assert_eq!(profile.rating(), None);
        profile.current_rating = Some(3800);
        assert_eq!(profile.rating(), Some(3800));
    }

    #[test]
    fn test_distinct_problem_counts() {
        let mut profile = NormalizedProfile::new("tourist");
        profile.activity_events = vec![
            event(100, "1A"),
            event(200, "1A"),
            event(300, "1B"),
            event(400, "2C"),
        ];

        assert_eq!(profile.distinct_problems(), 3);
    }

    #[test]
    fn test_sorted_history_is_chronological() {
        let mut profile = NormalizedProfile::new("tourist");
        let change = |ts: i64, rating: i64, name: &str| RatingChange {
            timestamp_seconds: ts,
            new_rating: rating,
            contest_name: name.to_string(),
            contest_rank: None,
        };
        profile.rating_history = vec![
            change(30, 1500, "C"),
            change(10, 1400, "A"),
            change(20, 1450, "B"),
        ];

        let names: Vec<_> = profile.sorted_history().into_iter().map(|c| c.contest_name).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
    }
}
