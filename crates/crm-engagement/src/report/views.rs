use crate::engagement::{ActivityStatus, PrincipalEngagement, PrincipalId};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StatusCountEntry {
    pub status: ActivityStatus,
    pub status_label: &'static str,
    pub color: &'static str,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrincipalSummaryView {
    pub principal_id: PrincipalId,
    pub principal_name: String,
    pub score: u8,
    pub status: ActivityStatus,
    pub status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_since_activity: Option<i64>,
}

impl From<&PrincipalEngagement> for PrincipalSummaryView {
    fn from(evaluation: &PrincipalEngagement) -> Self {
        Self {
            principal_id: evaluation.principal_id.clone(),
            principal_name: evaluation.principal_name.clone(),
            score: evaluation.score.value(),
            status: evaluation.status,
            status_label: evaluation.status.label(),
            days_since_activity: evaluation.days_since_activity,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngagementReport {
    pub as_of: DateTime<Utc>,
    pub principal_count: usize,
    pub average_score: f32,
    pub status_breakdown: Vec<StatusCountEntry>,
    pub top_principals: Vec<PrincipalSummaryView>,
    pub needs_attention: Vec<PrincipalSummaryView>,
    pub integrity_fault_count: usize,
}
