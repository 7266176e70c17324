use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Inclusive upper bound, in whole days, of the `ACTIVE` window.
///
/// Older display tables used 7 days for this badge; the classifier's 30-day
/// cutoff is authoritative and the display table is derived from it.
pub const ACTIVE_WINDOW_DAYS: i64 = 30;

/// Inclusive upper bound, in whole days, of the `MODERATE` window.
pub const MODERATE_WINDOW_DAYS: i64 = 90;

/// Coarse activity tier, ordered from least to most engaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    NoActivity,
    Stale,
    Moderate,
    Active,
}

impl ActivityStatus {
    /// Display order, most engaged first.
    pub const fn ordered() -> [Self; 4] {
        [Self::Active, Self::Moderate, Self::Stale, Self::NoActivity]
    }

    pub const fn code(self) -> &'static str {
        match self {
            Self::NoActivity => "NO_ACTIVITY",
            Self::Stale => "STALE",
            Self::Moderate => "MODERATE",
            Self::Active => "ACTIVE",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NoActivity => "No Activity",
            Self::Stale => "Stale",
            Self::Moderate => "Moderate",
            Self::Active => "Active",
        }
    }

    pub fn display(self) -> StatusDisplay {
        match self {
            Self::Active => StatusDisplay {
                status: self,
                label: self.label(),
                color: "green",
                threshold_days: Some(ACTIVE_WINDOW_DAYS),
                description: format!("Activity recorded within the last {ACTIVE_WINDOW_DAYS} days"),
            },
            Self::Moderate => StatusDisplay {
                status: self,
                label: self.label(),
                color: "yellow",
                threshold_days: Some(MODERATE_WINDOW_DAYS),
                description: format!(
                    "Last activity between {} and {MODERATE_WINDOW_DAYS} days ago",
                    ACTIVE_WINDOW_DAYS + 1
                ),
            },
            Self::Stale => StatusDisplay {
                status: self,
                label: self.label(),
                color: "red",
                threshold_days: None,
                description: format!("No activity in more than {MODERATE_WINDOW_DAYS} days"),
            },
            Self::NoActivity => StatusDisplay {
                status: self,
                label: self.label(),
                color: "gray",
                threshold_days: None,
                description: "No interactions, opportunities, or contact updates recorded"
                    .to_string(),
            },
        }
    }

    pub fn needs_attention(self) -> bool {
        matches!(self, Self::Stale | Self::NoActivity)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity status '{0}' (expected ACTIVE, MODERATE, STALE, or NO_ACTIVITY)")]
pub struct ParseActivityStatusError(pub String);

impl FromStr for ActivityStatus {
    type Err = ParseActivityStatusError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "ACTIVE" => Ok(Self::Active),
            "MODERATE" => Ok(Self::Moderate),
            "STALE" => Ok(Self::Stale),
            "NO_ACTIVITY" | "NONE" => Ok(Self::NoActivity),
            _ => Err(ParseActivityStatusError(raw.to_string())),
        }
    }
}

/// Badge metadata for a status, derived from the classifier thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub status: ActivityStatus,
    pub label: &'static str,
    pub color: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold_days: Option<i64>,
    pub description: String,
}

/// Whole days elapsed from `since` to `now`, negative when `since` is ahead.
pub fn elapsed_days(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let seconds = now.signed_duration_since(since).num_seconds();
    seconds.div_euclid(86_400)
}

/// Buckets a principal by how long ago its last recorded activity was.
pub fn classify(last_activity_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> ActivityStatus {
    let Some(last_activity_at) = last_activity_at else {
        return ActivityStatus::NoActivity;
    };

    match elapsed_days(last_activity_at, now) {
        days if days <= ACTIVE_WINDOW_DAYS => ActivityStatus::Active,
        days if days <= MODERATE_WINDOW_DAYS => ActivityStatus::Moderate,
        _ => ActivityStatus::Stale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 15, 9, 30, 0).unwrap()
    }

    fn days_ago(days: i64) -> Option<DateTime<Utc>> {
        Some(now() - Duration::days(days))
    }

    #[test]
    fn absent_activity_is_no_activity() {
        assert_eq!(classify(None, now()), ActivityStatus::NoActivity);
    }

    #[test]
    fn buckets_follow_thirty_and_ninety_day_windows() {
        assert_eq!(classify(days_ago(0), now()), ActivityStatus::Active);
        assert_eq!(classify(days_ago(1), now()), ActivityStatus::Active);
        assert_eq!(classify(days_ago(30), now()), ActivityStatus::Active);
        assert_eq!(classify(days_ago(31), now()), ActivityStatus::Moderate);
        assert_eq!(classify(days_ago(45), now()), ActivityStatus::Moderate);
        assert_eq!(classify(days_ago(90), now()), ActivityStatus::Moderate);
        assert_eq!(classify(days_ago(91), now()), ActivityStatus::Stale);
        assert_eq!(classify(days_ago(200), now()), ActivityStatus::Stale);
    }

    #[test]
    fn partial_days_are_floored() {
        let just_under_31 = now() - Duration::days(31) + Duration::minutes(1);
        assert_eq!(elapsed_days(just_under_31, now()), 30);
        assert_eq!(classify(Some(just_under_31), now()), ActivityStatus::Active);
    }

    #[test]
    fn future_activity_counts_as_active() {
        let ahead = now() + Duration::hours(5);
        assert_eq!(elapsed_days(ahead, now()), -1);
        assert_eq!(classify(Some(ahead), now()), ActivityStatus::Active);
    }

    #[test]
    fn ordering_runs_from_no_activity_to_active() {
        assert!(ActivityStatus::NoActivity < ActivityStatus::Stale);
        assert!(ActivityStatus::Stale < ActivityStatus::Moderate);
        assert!(ActivityStatus::Moderate < ActivityStatus::Active);
    }

    #[test]
    fn display_table_matches_classifier_thresholds() {
        assert_eq!(
            ActivityStatus::Active.display().threshold_days,
            Some(ACTIVE_WINDOW_DAYS)
        );
        assert_eq!(
            ActivityStatus::Moderate.display().threshold_days,
            Some(MODERATE_WINDOW_DAYS)
        );
        assert_eq!(
            classify(days_ago(ACTIVE_WINDOW_DAYS), now()),
            ActivityStatus::Active
        );
    }

    #[test]
    fn display_descriptions_quote_the_window_constants() {
        assert_eq!(
            ActivityStatus::Active.display().description,
            "Activity recorded within the last 30 days"
        );
        assert_eq!(
            ActivityStatus::Moderate.display().description,
            "Last activity between 31 and 90 days ago"
        );
        assert_eq!(
            ActivityStatus::Stale.display().description,
            "No activity in more than 90 days"
        );
        for status in [ActivityStatus::Active, ActivityStatus::Moderate] {
            let display = status.display();
            let days = display.threshold_days.expect("windowed status");
            assert!(display.description.contains(&format!("{days} days")));
        }
    }

    #[test]
    fn parses_codes_leniently() {
        assert_eq!("active".parse(), Ok(ActivityStatus::Active));
        assert_eq!("NO_ACTIVITY".parse(), Ok(ActivityStatus::NoActivity));
        assert_eq!(" no-activity ".parse(), Ok(ActivityStatus::NoActivity));
        assert_eq!("Stale".parse(), Ok(ActivityStatus::Stale));
        assert!("dormant".parse::<ActivityStatus>().is_err());
    }

    #[test]
    fn serializes_as_screaming_snake_case() {
        let json = serde_json::to_string(&ActivityStatus::NoActivity).expect("serializes");
        assert_eq!(json, "\"NO_ACTIVITY\"");
    }
}
