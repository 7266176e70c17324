use chrono::{DateTime, Duration, Utc};
use crm_engagement::engagement::{ActivityRollup, PrincipalId, PrincipalRollup};
use crm_engagement::rollups::{parse_timestamp, RefreshSummary, RollupSource, RollupSourceError};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Rollup source held in process memory; used when no export is configured
/// and by the demo.
#[derive(Default)]
pub(crate) struct InMemoryRollupSource {
    rollups: RwLock<Vec<PrincipalRollup>>,
}

impl InMemoryRollupSource {
    pub(crate) fn with_rollups(rollups: Vec<PrincipalRollup>) -> Self {
        Self {
            rollups: RwLock::new(rollups),
        }
    }
}

fn poisoned() -> RollupSourceError {
    RollupSourceError::Unavailable("in-memory rollups lock poisoned".to_string())
}

impl RollupSource for InMemoryRollupSource {
    fn fetch(&self, id: &PrincipalId) -> Result<Option<PrincipalRollup>, RollupSourceError> {
        let guard = self.rollups.read().map_err(|_| poisoned())?;
        Ok(guard
            .iter()
            .find(|record| &record.principal_id == id)
            .cloned())
    }

    fn fetch_all(&self) -> Result<Vec<PrincipalRollup>, RollupSourceError> {
        let guard = self.rollups.read().map_err(|_| poisoned())?;
        Ok(guard.clone())
    }

    fn refresh(&self) -> Result<RefreshSummary, RollupSourceError> {
        let guard = self.rollups.read().map_err(|_| poisoned())?;
        Ok(RefreshSummary {
            principals: guard.len(),
            refreshed_at: Utc::now(),
        })
    }
}

/// Synthetic food-service portfolio spanning every activity tier.
pub(crate) fn demo_rollups(now: DateTime<Utc>) -> Vec<PrincipalRollup> {
    let at = |days: i64| Some(now - Duration::days(days));
    vec![
        PrincipalRollup::new(
            "b1d4c7e0-0001",
            "Harbor Seafood Co.",
            ActivityRollup::new(64, 12, 7, at(1)),
        ),
        PrincipalRollup::new(
            "b1d4c7e0-0002",
            "Mesa Grain Mills",
            ActivityRollup::new(10, 3, 2, at(5)),
        ),
        PrincipalRollup::new(
            "b1d4c7e0-0003",
            "Prairie Creamery",
            ActivityRollup::new(22, 4, 3, at(28)),
        ),
        PrincipalRollup::new(
            "b1d4c7e0-0004",
            "Sunrise Produce",
            ActivityRollup::new(6, 1, 4, at(47)),
        ),
        PrincipalRollup::new(
            "b1d4c7e0-0005",
            "Old Mill Bakery Supply",
            ActivityRollup::new(15, 2, 1, at(133)),
        ),
        PrincipalRollup::new(
            "b1d4c7e0-0006",
            "Northwind Spices",
            ActivityRollup::default(),
        ),
    ]
}

/// Parses `--as-of` values: RFC 3339 or `YYYY-MM-DD` (midnight UTC).
pub(crate) fn parse_as_of(raw: &str) -> Result<DateTime<Utc>, String> {
    parse_timestamp(raw).ok_or_else(|| {
        format!("failed to parse '{raw}' as an RFC 3339 timestamp or YYYY-MM-DD date")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crm_engagement::engagement::{evaluate_batch, ActivityStatus};

    #[test]
    fn demo_portfolio_covers_every_status() {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let evaluations = evaluate_batch(&demo_rollups(now), now);
        for status in ActivityStatus::ordered() {
            assert!(
                evaluations
                    .iter()
                    .any(|evaluation| evaluation.status == status),
                "missing {status}"
            );
        }
    }

    #[test]
    fn in_memory_source_fetches_by_id() {
        let now = Utc::now();
        let source = InMemoryRollupSource::with_rollups(demo_rollups(now));
        let record = source
            .fetch(&PrincipalId::new("b1d4c7e0-0002"))
            .expect("fetch works")
            .expect("record present");
        assert_eq!(record.principal_name, "Mesa Grain Mills");
        assert_eq!(source.refresh().expect("refresh works").principals, 6);
    }

    #[test]
    fn parse_as_of_accepts_dates_and_rejects_garbage() {
        let parsed = parse_as_of("2025-09-01").expect("date parses");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap());
        assert!(parse_as_of("next week").is_err());
    }
}
