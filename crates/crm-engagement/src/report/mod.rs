pub mod views;

pub use views::{EngagementReport, PrincipalSummaryView, StatusCountEntry};

use crate::engagement::{rank, ActivityStatus, PrincipalEngagement};
use chrono::{DateTime, Utc};
use std::cmp::Reverse;

pub const DEFAULT_TOP_PRINCIPALS: usize = 5;

impl EngagementReport {
    /// Portfolio summary over a batch of evaluations taken at `as_of`.
    pub fn build(
        mut evaluations: Vec<PrincipalEngagement>,
        as_of: DateTime<Utc>,
        top: usize,
    ) -> Self {
        rank(&mut evaluations);

        let principal_count = evaluations.len();
        let average_score = average_score(&evaluations);

        let status_breakdown = ActivityStatus::ordered()
            .into_iter()
            .map(|status| {
                let display = status.display();
                StatusCountEntry {
                    status,
                    status_label: display.label,
                    color: display.color,
                    count: evaluations
                        .iter()
                        .filter(|evaluation| evaluation.status == status)
                        .count(),
                }
            })
            .collect();

        let top_principals = evaluations
            .iter()
            .take(top)
            .map(PrincipalSummaryView::from)
            .collect();

        let mut dormant: Vec<&PrincipalEngagement> = evaluations
            .iter()
            .filter(|evaluation| evaluation.status.needs_attention())
            .collect();
        // Never-active first, then longest dormant.
        dormant.sort_by_key(|evaluation| {
            (
                evaluation.status,
                Reverse(evaluation.days_since_activity),
                evaluation.principal_name.clone(),
            )
        });
        let needs_attention = dormant.into_iter().map(PrincipalSummaryView::from).collect();

        let integrity_fault_count = evaluations
            .iter()
            .map(|evaluation| evaluation.integrity_faults.len())
            .sum();

        Self {
            as_of,
            principal_count,
            average_score,
            status_breakdown,
            top_principals,
            needs_attention,
            integrity_fault_count,
        }
    }
}

fn average_score(evaluations: &[PrincipalEngagement]) -> f32 {
    if evaluations.is_empty() {
        return 0.0;
    }
    let total: u32 = evaluations
        .iter()
        .map(|evaluation| u32::from(evaluation.score.value()))
        .sum();
    let average = total as f32 / evaluations.len() as f32;
    (average * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::{evaluate_batch, ActivityRollup, PrincipalRollup};
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()
    }

    fn status_count(report: &EngagementReport, status: ActivityStatus) -> usize {
        report
            .status_breakdown
            .iter()
            .find(|entry| entry.status == status)
            .map_or(0, |entry| entry.count)
    }

    fn portfolio() -> Vec<PrincipalEngagement> {
        let at = |days: i64| Some(now() - Duration::days(days));
        evaluate_batch(
            &[
                PrincipalRollup::new("p-1", "Harbor Seafood", ActivityRollup::new(50, 10, 5, at(0))),
                PrincipalRollup::new("p-2", "Mesa Grains", ActivityRollup::new(10, 3, 2, at(5))),
                PrincipalRollup::new("p-3", "Old Mill", ActivityRollup::new(4, 1, 0, at(120))),
                PrincipalRollup::new("p-4", "Older Mill", ActivityRollup::new(4, 1, 0, at(300))),
                PrincipalRollup::new("p-5", "Quiet Co", ActivityRollup::default()),
                PrincipalRollup::new("p-6", "Midway Dairy", ActivityRollup::new(2, 0, 1, at(60))),
            ],
            now(),
        )
    }

    #[test]
    fn report_counts_every_status_in_display_order() {
        let report = EngagementReport::build(portfolio(), now(), DEFAULT_TOP_PRINCIPALS);
        let order: Vec<ActivityStatus> = report
            .status_breakdown
            .iter()
            .map(|entry| entry.status)
            .collect();
        assert_eq!(order, ActivityStatus::ordered().to_vec());
        assert_eq!(report.principal_count, 6);
        assert_eq!(status_count(&report, ActivityStatus::Active), 2);
        assert_eq!(status_count(&report, ActivityStatus::Moderate), 1);
        assert_eq!(status_count(&report, ActivityStatus::Stale), 2);
        assert_eq!(status_count(&report, ActivityStatus::NoActivity), 1);
    }

    #[test]
    fn report_lists_top_principals_by_rank() {
        let report = EngagementReport::build(portfolio(), now(), 2);
        let top: Vec<&str> = report
            .top_principals
            .iter()
            .map(|view| view.principal_id.as_str())
            .collect();
        assert_eq!(top, vec!["p-1", "p-2"]);
        assert_eq!(report.top_principals[0].score, 100);
    }

    #[test]
    fn needs_attention_puts_never_active_first_then_longest_dormant() {
        let report = EngagementReport::build(portfolio(), now(), DEFAULT_TOP_PRINCIPALS);
        let ids: Vec<&str> = report
            .needs_attention
            .iter()
            .map(|view| view.principal_id.as_str())
            .collect();
        assert_eq!(ids, vec!["p-5", "p-4", "p-3"]);
    }

    #[test]
    fn empty_portfolio_reports_zero_average() {
        let report = EngagementReport::build(Vec::new(), now(), DEFAULT_TOP_PRINCIPALS);
        assert_eq!(report.principal_count, 0);
        assert_eq!(report.average_score, 0.0);
        assert!(report.top_principals.is_empty());
        assert_eq!(report.status_breakdown.len(), 4);
    }

    #[test]
    fn average_is_rounded_to_one_decimal() {
        let report = EngagementReport::build(portfolio(), now(), DEFAULT_TOP_PRINCIPALS);
        // 100 + 36 + 6 + 6 + 0 + 9 = 157 over 6 principals
        assert!((report.average_score - 26.2).abs() < 1e-4);
    }
}
