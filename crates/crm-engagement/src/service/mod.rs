mod router;

pub use router::engagement_router;

use crate::engagement::{
    evaluate, evaluate_batch, ActivityRollup, EngagementFilter, PrincipalEngagement, PrincipalId,
    PrincipalRollup,
};
use crate::report::EngagementReport;
use crate::rollups::{RefreshSummary, RollupSource, RollupSourceError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Service composing a rollup source with the scorer and classifier.
pub struct EngagementService<S> {
    source: Arc<S>,
}

impl<S> Clone for EngagementService<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S> EngagementService<S>
where
    S: RollupSource + 'static,
{
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }

    /// Engagement for one principal as of `now`.
    pub fn principal(
        &self,
        id: &PrincipalId,
        now: DateTime<Utc>,
    ) -> Result<PrincipalEngagement, EngagementServiceError> {
        let record = self
            .source
            .fetch(id)?
            .ok_or_else(|| EngagementServiceError::PrincipalNotFound(id.clone()))?;
        let evaluation = evaluate(&record, now);
        log_faults(&evaluation);
        Ok(evaluation)
    }

    /// Ranked, filtered engagement for every principal in the source.
    pub fn principals(
        &self,
        filter: &EngagementFilter,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrincipalEngagement>, EngagementServiceError> {
        let evaluations = self.evaluate_all(now)?;
        Ok(filter.apply(evaluations))
    }

    pub fn report(
        &self,
        now: DateTime<Utc>,
        top: usize,
    ) -> Result<EngagementReport, EngagementServiceError> {
        let evaluations = self.evaluate_all(now)?;
        Ok(EngagementReport::build(evaluations, now, top))
    }

    pub fn refresh(&self) -> Result<RefreshSummary, EngagementServiceError> {
        match self.source.refresh() {
            Ok(summary) => {
                info!(
                    principals = summary.principals,
                    refreshed_at = %summary.refreshed_at,
                    "rollup source refreshed"
                );
                Ok(summary)
            }
            Err(err) => {
                warn!(error = %err, "rollup refresh failed; keeping previous snapshot");
                Err(err.into())
            }
        }
    }

    /// Scores an ad hoc rollup that is not held by the source.
    pub fn score_rollup(&self, rollup: ActivityRollup, now: DateTime<Utc>) -> PrincipalEngagement {
        let record = PrincipalRollup::new("adhoc", "Ad hoc rollup", rollup);
        evaluate(&record, now)
    }

    fn evaluate_all(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<PrincipalEngagement>, EngagementServiceError> {
        let rollups = self.source.fetch_all()?;
        let evaluations = evaluate_batch(&rollups, now);
        evaluations.iter().for_each(log_faults);
        debug!(principals = evaluations.len(), %now, "evaluated principal engagement");
        Ok(evaluations)
    }
}

fn log_faults(evaluation: &PrincipalEngagement) {
    for fault in &evaluation.integrity_faults {
        warn!(
            principal = %evaluation.principal_id,
            fault = %fault.summary(),
            "rollup integrity violation clamped"
        );
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngagementServiceError {
    #[error(transparent)]
    Source(#[from] RollupSourceError),
    #[error("principal {0} not found")]
    PrincipalNotFound(PrincipalId),
}
