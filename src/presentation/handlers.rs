// HTTP request handlers
use crate::domain::analytics::{
    AnalyticsFilter, AnalyticsReport, LatestMeasurement, MultiMetricReport, ParameterSummary,
    TrendAnalysis,
};
use crate::domain::historical::{HistoricalFilters, HistoricalQueryResponse};
use crate::domain::measurement::{Parameter, UnknownParameter};
use crate::domain::metric::Metric;
use crate::presentation::app_state::AppState;
use crate::presentation::error::{ApiError, parse_timestamp_param, require_controller};
use crate::presentation::extractors::{ApiJson, ApiQuery};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_TREND_INTERVAL: &str = "1h";

#[derive(Debug, Default, Deserialize)]
pub struct WindowQuery {
    pub controller_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<usize>,
}

impl WindowQuery {
    fn filter(&self) -> Result<AnalyticsFilter, ApiError> {
        let start = parse_timestamp_param(&self.start_time)?;
        let end = parse_timestamp_param(&self.end_time)?;
        Ok(AnalyticsFilter::new(start, end, self.limit)?)
    }
}

#[derive(Debug, Deserialize)]
pub struct TrendQuery {
    pub controller_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub interval: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LatestQuery {
    pub max_age_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct HistoricalQuery {
    pub controller_id: Option<String>,
    pub sensor_id: Option<String>,
    pub zone: Option<String>,
    pub parameter: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterBody {
    pub start_time: Option<chrono::DateTime<Utc>>,
    pub end_time: Option<chrono::DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MultiReportRequest {
    pub controllers: Vec<String>,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub filters: Option<FilterBody>,
}

#[derive(Debug, Serialize)]
pub struct MetricInfo {
    pub name: &'static str,
    pub unit: &'static str,
    pub inputs: &'static [Parameter],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct MetricsListing {
    pub supported_metrics: &'static [&'static str],
    pub details: Vec<MetricInfo>,
    pub total: usize,
}

/// Health check endpoint; pings the measurement source.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.source.health_check().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "healthy", "source": "ok" })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "degraded", "source": e.to_string() })),
            )
        }
    }
}

pub async fn list_metrics(State(state): State<Arc<AppState>>) -> Json<MetricsListing> {
    let details: Vec<MetricInfo> = Metric::all()
        .iter()
        .map(|m| MetricInfo {
            name: m.name(),
            unit: m.unit(),
            inputs: m.inputs(),
            description: m.description(),
        })
        .collect();

    Json(MetricsListing {
        supported_metrics: state.metric_service.list_supported_metrics(),
        total: details.len(),
        details,
    })
}

pub async fn metric_report(
    Path(metric): Path<String>,
    ApiQuery(query): ApiQuery<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<AnalyticsReport>, ApiError> {
    let filter = query.filter()?;
    let controller_id = require_controller(query.controller_id)?;
    let report = state
        .report_service
        .single_report(&metric, &controller_id, &filter)
        .await?;
    Ok(Json(report))
}

pub async fn multi_report(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<MultiReportRequest>,
) -> Result<Json<MultiMetricReport>, ApiError> {
    if request.controllers.is_empty() || request.metrics.is_empty() {
        return Err(ApiError::bad_request(
            "EMPTY_REQUEST",
            "controllers and metrics must each name at least one entry",
        ));
    }
    let body = request.filters.unwrap_or_default();
    let filter = AnalyticsFilter::new(body.start_time, body.end_time, body.limit)?;

    let report = state
        .report_service
        .multi_report(&request.controllers, &request.metrics, &filter)
        .await?;
    Ok(Json(report))
}

pub async fn metric_trend(
    Path(metric): Path<String>,
    ApiQuery(query): ApiQuery<TrendQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<TrendAnalysis>, ApiError> {
    let start = parse_timestamp_param(&query.start_time)?;
    let end = parse_timestamp_param(&query.end_time)?;
    let controller_id = require_controller(query.controller_id)?;
    let range = AnalyticsFilter::new(start, end, None)?
        .resolve_range(Utc::now(), state.settings.lookback())?;
    let interval = query.interval.as_deref().unwrap_or(DEFAULT_TREND_INTERVAL);

    let trend = state
        .trend_service
        .analyze(&metric, &controller_id, range.start, range.end, interval)
        .await?;
    Ok(Json(trend))
}

pub async fn latest_measurement(
    Path(controller_id): Path<String>,
    ApiQuery(query): ApiQuery<LatestQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<LatestMeasurement>, ApiError> {
    let max_age = query
        .max_age_minutes
        .map(|minutes| {
            Duration::try_minutes(minutes)
                .filter(|age| *age > Duration::zero())
                .ok_or_else(|| {
                    ApiError::bad_request("INVALID_MAX_AGE", "max_age_minutes must be positive")
                })
        })
        .transpose()?;

    let latest = state
        .report_service
        .latest_measurement(&controller_id, max_age)
        .await?;
    Ok(Json(latest))
}

pub async fn historical_data(
    ApiQuery(query): ApiQuery<HistoricalQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistoricalQueryResponse>, ApiError> {
    let parameter = query
        .parameter
        .as_deref()
        .map(str::parse::<Parameter>)
        .transpose()
        .map_err(|e| ApiError::bad_request("INVALID_PARAMETER", e.to_string()))?;

    let filters = HistoricalFilters {
        controller_id: query.controller_id,
        sensor_id: query.sensor_id,
        zone: query.zone,
        parameter,
        start_time: parse_timestamp_param(&query.start_time)?,
        end_time: parse_timestamp_param(&query.end_time)?,
        limit: query.limit,
    };

    Ok(Json(state.historical_service.query(filters).await?))
}

pub async fn parameter_summary(
    Path(parameter): Path<String>,
    ApiQuery(query): ApiQuery<WindowQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ParameterSummary>, ApiError> {
    let parameter: Parameter = parameter
        .parse()
        .map_err(|e: UnknownParameter| ApiError::bad_request("INVALID_PARAMETER", e.to_string()))?;
    let filter = query.filter()?;
    let controller_id = require_controller(query.controller_id)?;

    let summary = state
        .metric_service
        .summarize(parameter, &controller_id, &filter)
        .await?;
    Ok(Json(summary))
}
