use super::domain::{ActivityRollup, IntegrityFault, PrincipalId, PrincipalRollup};
use super::score::{breakdown, EngagementScore, ScoreBreakdown};
use super::status::{classify, elapsed_days, ActivityStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Rollup with its score and activity status attached for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrincipalEngagement {
    pub principal_id: PrincipalId,
    pub principal_name: String,
    pub rollup: ActivityRollup,
    pub score: EngagementScore,
    pub breakdown: ScoreBreakdown,
    pub status: ActivityStatus,
    pub status_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_activity: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integrity_faults: Vec<IntegrityFault>,
}

/// Scores and classifies a single principal. Scorer and classifier run
/// independently against the same rollup.
pub fn evaluate(record: &PrincipalRollup, now: DateTime<Utc>) -> PrincipalEngagement {
    let rollup = &record.rollup;
    let breakdown = breakdown(rollup, now);
    let status = classify(rollup.last_activity_at, now);

    PrincipalEngagement {
        principal_id: record.principal_id.clone(),
        principal_name: record.principal_name.clone(),
        rollup: rollup.clone(),
        score: breakdown.total,
        breakdown,
        status,
        status_label: status.label().to_string(),
        days_since_activity: rollup
            .last_activity_at
            .map(|at| elapsed_days(at, now).max(0)),
        integrity_faults: rollup.audit(now),
    }
}

pub fn evaluate_batch(records: &[PrincipalRollup], now: DateTime<Utc>) -> Vec<PrincipalEngagement> {
    records.iter().map(|record| evaluate(record, now)).collect()
}

fn rank_order(a: &PrincipalEngagement, b: &PrincipalEngagement) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| b.status.cmp(&a.status))
        .then_with(|| a.principal_name.cmp(&b.principal_name))
        .then_with(|| a.principal_id.cmp(&b.principal_id))
}

/// Sorts highest score first; ties go to the more active principal, then by name and id.
pub fn rank(evaluations: &mut [PrincipalEngagement]) {
    evaluations.sort_by(rank_order);
}

/// Query-side narrowing of a ranked list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngagementFilter {
    pub statuses: Vec<ActivityStatus>,
    pub min_score: Option<u8>,
    pub limit: Option<usize>,
}

impl EngagementFilter {
    pub fn matches(&self, evaluation: &PrincipalEngagement) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&evaluation.status);
        let score_ok = self
            .min_score
            .map_or(true, |min| evaluation.score.value() >= min);
        status_ok && score_ok
    }

    /// Ranks, filters, then truncates to `limit`.
    pub fn apply(&self, mut evaluations: Vec<PrincipalEngagement>) -> Vec<PrincipalEngagement> {
        rank(&mut evaluations);
        let filtered = evaluations
            .into_iter()
            .filter(|evaluation| self.matches(evaluation));
        match self.limit {
            Some(limit) => filtered.take(limit).collect(),
            None => filtered.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 3, 8, 0, 0).unwrap()
    }

    fn principal(id: &str, name: &str, interactions: i64, days_ago: Option<i64>) -> PrincipalRollup {
        PrincipalRollup::new(
            id,
            name,
            ActivityRollup::new(
                interactions,
                0,
                0,
                days_ago.map(|days| now() - Duration::days(days)),
            ),
        )
    }

    #[test]
    fn evaluate_attaches_score_status_and_age() {
        let record = PrincipalRollup::new(
            "p-7",
            "Blue Ridge Farms",
            ActivityRollup::new(10, 3, 2, Some(now() - Duration::days(5))),
        );
        let evaluation = evaluate(&record, now());
        assert_eq!(evaluation.score.value(), 36);
        assert_eq!(evaluation.status, ActivityStatus::Active);
        assert_eq!(evaluation.status_label, "Active");
        assert_eq!(evaluation.days_since_activity, Some(5));
        assert!(evaluation.integrity_faults.is_empty());
    }

    #[test]
    fn evaluate_surfaces_integrity_faults_without_failing() {
        let record = principal("p-1", "Backwards Co", -4, Some(-2));
        let evaluation = evaluate(&record, now());
        assert_eq!(evaluation.integrity_faults.len(), 2);
        assert_eq!(evaluation.days_since_activity, Some(0));
        assert_eq!(evaluation.status, ActivityStatus::Active);
    }

    #[test]
    fn rank_breaks_score_ties_by_status_then_name() {
        // 5 interactions and 40 days ago => 10*0.3 + 60*0.1 = 9
        // 0 interactions and 10 days ago => 90*0.1 = 9
        let mut evaluations = evaluate_batch(
            &[
                principal("p-3", "Zeta Foods", 5, Some(40)),
                principal("p-2", "Alpha Foods", 0, Some(10)),
                principal("p-1", "Beta Foods", 0, Some(10)),
                principal("p-4", "Top Brand", 50, Some(1)),
            ],
            now(),
        );
        rank(&mut evaluations);
        let order: Vec<&str> = evaluations
            .iter()
            .map(|evaluation| evaluation.principal_id.as_str())
            .collect();
        assert_eq!(order, vec!["p-4", "p-2", "p-1", "p-3"]);
    }

    #[test]
    fn filter_applies_status_score_and_limit() {
        let evaluations = evaluate_batch(
            &[
                principal("p-1", "Active High", 50, Some(2)),
                principal("p-2", "Active Low", 1, Some(20)),
                principal("p-3", "Stale", 40, Some(120)),
                principal("p-4", "Silent", 0, None),
            ],
            now(),
        );

        let only_active = EngagementFilter {
            statuses: vec![ActivityStatus::Active],
            ..EngagementFilter::default()
        }
        .apply(evaluations.clone());
        assert_eq!(only_active.len(), 2);

        let scored = EngagementFilter {
            min_score: Some(20),
            ..EngagementFilter::default()
        }
        .apply(evaluations.clone());
        assert!(scored.iter().all(|evaluation| evaluation.score.value() >= 20));
        assert_eq!(scored.len(), 2);

        let limited = EngagementFilter {
            limit: Some(1),
            ..EngagementFilter::default()
        }
        .apply(evaluations);
        assert_eq!(limited[0].principal_id.as_str(), "p-1");
        assert_eq!(limited.len(), 1);
    }
}
