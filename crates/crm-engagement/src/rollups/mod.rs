mod export;

pub use export::{CsvRollupImporter, CsvRollupSource};

use crate::engagement::{PrincipalId, PrincipalRollup};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Refreshable aggregate store producing one rollup per principal.
pub trait RollupSource: Send + Sync {
    fn fetch(&self, id: &PrincipalId) -> Result<Option<PrincipalRollup>, RollupSourceError>;
    fn fetch_all(&self) -> Result<Vec<PrincipalRollup>, RollupSourceError>;
    fn refresh(&self) -> Result<RefreshSummary, RollupSourceError>;
}

/// Outcome of a rollup refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshSummary {
    pub principals: usize,
    pub refreshed_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum RollupSourceError {
    #[error("failed to read rollup export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid rollup CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("principal {principal}: unrecognized last_activity_at '{value}'")]
    InvalidTimestamp { principal: PrincipalId, value: String },
    #[error("rollup source unavailable: {0}")]
    Unavailable(String),
}

/// Parses the timestamp shapes rollup exports use, reading naive values as UTC.
///
/// Accepts RFC 3339, Postgres text output (`2025-01-31 14:05:09.123+00`),
/// `YYYY-MM-DD HH:MM:SS`, and bare `YYYY-MM-DD` dates (midnight).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%d %H:%M:%S%.f%:z"] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parse_timestamp_supports_export_shapes() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 31, 14, 5, 9).unwrap();
        assert_eq!(parse_timestamp("2025-01-31T14:05:09Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-31T16:05:09+02:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-31 14:05:09+00"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-31 14:05:09"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-01-31"),
            Some(Utc.with_ymd_and_hms(2025, 1, 31, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn parse_timestamp_keeps_fractional_seconds() {
        let parsed = parse_timestamp("2025-01-31 14:05:09.250+00").expect("parses");
        assert_eq!(parsed.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn parse_timestamp_rejects_blank_and_garbage() {
        assert!(parse_timestamp("   ").is_none());
        assert!(parse_timestamp("last tuesday").is_none());
    }
}
