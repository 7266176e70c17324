use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use crm_engagement::engagement::ActivityStatus;
use crm_engagement::rollups::RollupSource;
use crm_engagement::service::{engagement_router, EngagementService};
use serde_json::json;

pub(crate) fn with_service_routes<S>(service: EngagementService<S>) -> axum::Router
where
    S: RollupSource + 'static,
{
    engagement_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route(
            "/api/v1/engagement/statuses",
            axum::routing::get(status_table_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Badge table for the activity tiers, in display order.
pub(crate) async fn status_table_endpoint() -> impl IntoResponse {
    let table: Vec<_> = ActivityStatus::ordered()
        .into_iter()
        .map(ActivityStatus::display)
        .collect();
    Json(table)
}
