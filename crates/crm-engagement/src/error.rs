use crate::config::ConfigError;
use crate::rollups::RollupSourceError;
use crate::service::EngagementServiceError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Rollups(RollupSourceError),
    Engagement(EngagementServiceError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Rollups(err) => write!(f, "rollup error: {}", err),
            AppError::Engagement(err) => write!(f, "engagement error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Rollups(err) => Some(err),
            AppError::Engagement(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Rollups(RollupSourceError::Csv(_))
            | AppError::Rollups(RollupSourceError::InvalidTimestamp { .. }) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Engagement(EngagementServiceError::PrincipalNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            AppError::Rollups(_) | AppError::Engagement(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_) | AppError::Telemetry(_) | AppError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<RollupSourceError> for AppError {
    fn from(value: RollupSourceError) -> Self {
        Self::Rollups(value)
    }
}

impl From<EngagementServiceError> for AppError {
    fn from(value: EngagementServiceError) -> Self {
        Self::Engagement(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::PrincipalId;

    #[test]
    fn missing_principal_maps_to_not_found() {
        let error = AppError::from(EngagementServiceError::PrincipalNotFound(PrincipalId::new(
            "p-404",
        )));
        assert!(error.to_string().contains("p-404"));
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn bad_export_data_maps_to_bad_request() {
        let error = AppError::from(RollupSourceError::InvalidTimestamp {
            principal: PrincipalId::new("p-1"),
            value: "soon".to_string(),
        });
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
