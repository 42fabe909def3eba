// Application state for HTTP handlers
use crate::application::historical_service::HistoricalQueryService;
use crate::application::measurement_source::MeasurementSource;
use crate::application::metric_service::MetricCalculationService;
use crate::application::report_service::ReportAggregator;
use crate::application::trend_service::TrendAnalyzer;
use crate::infrastructure::config::AnalyticsSettings;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub metric_service: MetricCalculationService,
    pub report_service: ReportAggregator,
    pub trend_service: TrendAnalyzer,
    pub historical_service: HistoricalQueryService,
    pub source: Arc<dyn MeasurementSource>,
    pub settings: AnalyticsSettings,
}

impl AppState {
    pub fn new(source: Arc<dyn MeasurementSource>, settings: AnalyticsSettings) -> Self {
        let metric_service = MetricCalculationService::new(source.clone(), settings.clone());
        Self {
            report_service: ReportAggregator::new(
                metric_service.clone(),
                source.clone(),
                settings.clone(),
            ),
            trend_service: TrendAnalyzer::new(metric_service.clone()),
            historical_service: HistoricalQueryService::new(source.clone(), settings.clone()),
            metric_service,
            source,
            settings,
        }
    }
}
