// HTTP routes and middleware
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    health_check, historical_data, latest_measurement, list_metrics, metric_report, metric_trend,
    multi_report, parameter_summary,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

/// Requests running past `request_timeout` are answered with 408.
pub fn router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    let analytics = Router::new()
        .route("/metrics", get(list_metrics))
        .route("/report/:metric", get(metric_report))
        .route("/multi-report", post(multi_report))
        .route("/trends/:metric", get(metric_trend))
        .route("/latest/:controller_id", get(latest_measurement))
        .route("/historical", get(historical_data))
        .route("/summary/:parameter", get(parameter_summary));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1/analytics", analytics)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
