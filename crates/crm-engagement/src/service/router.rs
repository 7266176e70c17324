use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{EngagementService, EngagementServiceError};
use crate::engagement::{
    ActivityRollup, ActivityStatus, EngagementFilter, EngagementScore, IntegrityFault,
    PrincipalId, ScoreBreakdown,
};
use crate::report::DEFAULT_TOP_PRINCIPALS;
use crate::rollups::{parse_timestamp, RollupSource};

/// Router builder exposing engagement scoring over HTTP.
pub fn engagement_router<S>(service: EngagementService<S>) -> Router
where
    S: RollupSource + 'static,
{
    Router::new()
        .route("/api/v1/principals/engagement", get(list_handler::<S>))
        .route(
            "/api/v1/principals/:principal_id/engagement",
            get(principal_handler::<S>),
        )
        .route("/api/v1/engagement/report", get(report_handler::<S>))
        .route("/api/v1/engagement/refresh", post(refresh_handler::<S>))
        .route("/api/v1/engagement/score", post(score_handler::<S>))
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    pub(crate) status: Option<String>,
    #[serde(default)]
    pub(crate) min_score: Option<u8>,
    #[serde(default)]
    pub(crate) limit: Option<usize>,
    #[serde(default)]
    pub(crate) as_of: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ReportQuery {
    #[serde(default)]
    pub(crate) top: Option<usize>,
    #[serde(default)]
    pub(crate) as_of: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRequest {
    #[serde(flatten)]
    pub(crate) rollup: ActivityRollup,
    #[serde(default)]
    pub(crate) as_of: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ScoreResponse {
    pub(crate) as_of: DateTime<Utc>,
    pub(crate) score: EngagementScore,
    pub(crate) breakdown: ScoreBreakdown,
    pub(crate) status: ActivityStatus,
    pub(crate) status_label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) days_since_activity: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub(crate) integrity_faults: Vec<IntegrityFault>,
}

fn bad_request(message: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

fn error_response(error: EngagementServiceError) -> Response {
    let status = match &error {
        EngagementServiceError::PrincipalNotFound(_) => StatusCode::NOT_FOUND,
        EngagementServiceError::Source(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status, Json(json!({ "error": error.to_string() }))).into_response()
}

fn resolve_as_of(raw: Option<&str>) -> Result<DateTime<Utc>, Response> {
    match raw {
        None => Ok(Utc::now()),
        Some(value) => parse_timestamp(value)
            .ok_or_else(|| bad_request(format!("as_of '{value}' is not a recognized timestamp"))),
    }
}

fn parse_statuses(raw: Option<&str>) -> Result<Vec<ActivityStatus>, Response> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(|code| {
            code.parse::<ActivityStatus>()
                .map_err(|err| bad_request(err.to_string()))
        })
        .collect()
}

pub(crate) async fn list_handler<S>(
    State(service): State<EngagementService<S>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: RollupSource + 'static,
{
    let now = match resolve_as_of(query.as_of.as_deref()) {
        Ok(now) => now,
        Err(response) => return response,
    };
    let statuses = match parse_statuses(query.status.as_deref()) {
        Ok(statuses) => statuses,
        Err(response) => return response,
    };
    let filter = EngagementFilter {
        statuses,
        min_score: query.min_score,
        limit: query.limit,
    };

    match service.principals(&filter, now) {
        Ok(evaluations) => (StatusCode::OK, Json(evaluations)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn principal_handler<S>(
    State(service): State<EngagementService<S>>,
    Path(principal_id): Path<String>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    S: RollupSource + 'static,
{
    let now = match resolve_as_of(query.as_of.as_deref()) {
        Ok(now) => now,
        Err(response) => return response,
    };

    match service.principal(&PrincipalId(principal_id), now) {
        Ok(evaluation) => (StatusCode::OK, Json(evaluation)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn report_handler<S>(
    State(service): State<EngagementService<S>>,
    Query(query): Query<ReportQuery>,
) -> Response
where
    S: RollupSource + 'static,
{
    let now = match resolve_as_of(query.as_of.as_deref()) {
        Ok(now) => now,
        Err(response) => return response,
    };
    let top = query.top.unwrap_or(DEFAULT_TOP_PRINCIPALS);

    match service.report(now, top) {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn refresh_handler<S>(State(service): State<EngagementService<S>>) -> Response
where
    S: RollupSource + 'static,
{
    match service.refresh() {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn score_handler<S>(
    State(service): State<EngagementService<S>>,
    Json(request): Json<ScoreRequest>,
) -> Response
where
    S: RollupSource + 'static,
{
    let now = match resolve_as_of(request.as_of.as_deref()) {
        Ok(now) => now,
        Err(response) => return response,
    };
    let evaluation = service.score_rollup(request.rollup, now);

    let response = ScoreResponse {
        as_of: now,
        score: evaluation.score,
        breakdown: evaluation.breakdown,
        status: evaluation.status,
        status_label: evaluation.status.label(),
        days_since_activity: evaluation.days_since_activity,
        integrity_faults: evaluation.integrity_faults,
    };
    (StatusCode::OK, Json(response)).into_response()
}
