// HTTP error mapping - JSON `{error, code, message}` bodies
use crate::application::error::AnalyticsError;
use crate::domain::analytics::FilterError;
use crate::domain::metric::Metric;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};

#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    InvalidMetric { message: String },
    NotFound { code: String, message: String },
    Unprocessable { code: String, message: String },
    BadGateway { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(e: AnalyticsError) -> Self {
        let message = e.to_string();
        match e {
            AnalyticsError::InvalidMetric { .. } => Self::InvalidMetric { message },
            AnalyticsError::InvalidInterval { .. } => Self::bad_request("INVALID_INTERVAL", message),
            AnalyticsError::InvalidFilter(_) => Self::bad_request("INVALID_FILTER", message),
            AnalyticsError::InsufficientData { .. } => Self::NotFound {
                code: "INSUFFICIENT_DATA".to_string(),
                message,
            },
            AnalyticsError::Calculation { .. } => {
                tracing::warn!(error = %message, "Calculation rejected its inputs");
                Self::Unprocessable {
                    code: "CALCULATION_ERROR".to_string(),
                    message,
                }
            }
            AnalyticsError::Source(source) => {
                tracing::error!(error = %source, "Measurement source failure");
                Self::BadGateway { message }
            }
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        AnalyticsError::from(e).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::InvalidMetric { message } => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(serde_json::json!({
                        "error": "bad_request",
                        "code": "INVALID_METRIC",
                        "message": message,
                        "supported_metrics": Metric::names(),
                    })),
                )
                    .into_response();
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Unprocessable { code, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable_entity",
                code,
                message,
            ),
            Self::BadGateway { message } => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                "SOURCE_UNAVAILABLE".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}

/// Parse an optional RFC 3339 timestamp query parameter
pub fn parse_timestamp_param(s: &Option<String>) -> Result<Option<DateTime<Utc>>, ApiError> {
    match s {
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| {
                ApiError::bad_request(
                    "INVALID_TIMESTAMP",
                    format!("Invalid timestamp format: {ts}. Use RFC 3339, e.g. 2024-05-01T00:00:00Z."),
                )
            }),
        None => Ok(None),
    }
}

pub fn require_controller(controller_id: Option<String>) -> Result<String, ApiError> {
    match controller_id {
        Some(id) if !id.trim().is_empty() => Ok(id),
        _ => Err(ApiError::bad_request(
            "MISSING_CONTROLLER_ID",
            "controller_id query parameter is required",
        )),
    }
}
