// Report aggregator - Single, multi-controller and latest-measurement views
use crate::application::error::AnalyticsError;
use crate::application::measurement_source::MeasurementSource;
use crate::application::metric_service::{Evaluation, MetricCalculationService};
use crate::domain::analytics::{
    AnalyticsFilter, AnalyticsReport, DataStatus, LatestMeasurement, MetricResult,
    MultiMetricReport,
};
use crate::domain::metric::Metric;
use crate::infrastructure::config::AnalyticsSettings;
use chrono::{Duration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

#[derive(Clone)]
pub struct ReportAggregator {
    metrics: MetricCalculationService,
    source: Arc<dyn MeasurementSource>,
    settings: AnalyticsSettings,
}

impl ReportAggregator {
    pub fn new(
        metrics: MetricCalculationService,
        source: Arc<dyn MeasurementSource>,
        settings: AnalyticsSettings,
    ) -> Self {
        Self {
            metrics,
            source,
            settings,
        }
    }

    pub async fn single_report(
        &self,
        metric_name: &str,
        controller_id: &str,
        filter: &AnalyticsFilter,
    ) -> Result<AnalyticsReport, AnalyticsError> {
        let Evaluation {
            result,
            samples_consumed,
        } = self.metrics.compute(metric_name, controller_id, filter).await?;

        Ok(AnalyticsReport::new(
            controller_id.to_string(),
            samples_consumed,
            vec![result],
        ))
    }

    /// Evaluate every controller × metric pair with bounded concurrency.
    ///
    /// A failing or timed-out pair is left out of its controller's `metrics`; every
    /// requested controller still gets a report, in request order.
    pub async fn multi_report(
        &self,
        controllers: &[String],
        metric_names: &[String],
        filter: &AnalyticsFilter,
    ) -> Result<MultiMetricReport, AnalyticsError> {
        let metrics = metric_names
            .iter()
            .map(|name| self.metrics.resolve_metric(name))
            .collect::<Result<Vec<Metric>, _>>()?;
        filter.resolve_range(Utc::now(), self.settings.lookback())?;

        let pairs: Vec<(usize, usize, String, Metric)> = controllers
            .iter()
            .enumerate()
            .flat_map(|(c, controller)| {
                metrics
                    .iter()
                    .enumerate()
                    .map(move |(m, metric)| (c, m, controller.clone(), *metric))
            })
            .collect();

        let timeout = self.settings.pair_timeout();
        let outcomes: Vec<(usize, usize, Option<Evaluation>)> = stream::iter(pairs)
            .map(|(c, m, controller_id, metric)| async move {
                let outcome = tokio::time::timeout(
                    timeout,
                    self.metrics.evaluate(metric, &controller_id, filter),
                )
                .await;
                let evaluation = match outcome {
                    Ok(Ok(evaluation)) => Some(evaluation),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            controller_id = %controller_id,
                            metric = metric.name(),
                            error = %e,
                            "Omitting metric from report"
                        );
                        None
                    }
                    Err(_) => {
                        tracing::warn!(
                            controller_id = %controller_id,
                            metric = metric.name(),
                            timeout_ms = timeout.as_millis() as u64,
                            "Metric evaluation timed out, omitting from report"
                        );
                        None
                    }
                };
                (c, m, evaluation)
            })
            .buffer_unordered(self.settings.multi_report_concurrency.max(1))
            .collect()
            .await;

        // Completion order is arbitrary; slot results back by index.
        let mut slots: Vec<Vec<Option<Evaluation>>> =
            vec![vec![None; metrics.len()]; controllers.len()];
        for (c, m, evaluation) in outcomes {
            slots[c][m] = evaluation;
        }

        let reports = controllers
            .iter()
            .zip(slots)
            .map(|(controller_id, row)| {
                let evaluations: Vec<Evaluation> = row.into_iter().flatten().collect();
                let consumed = evaluations.iter().map(|e| e.samples_consumed).sum();
                let results = evaluations.into_iter().map(|e| e.result).collect();
                AnalyticsReport::new(controller_id.clone(), consumed, results)
            })
            .collect();

        Ok(MultiMetricReport::new(reports, metrics.len()))
    }

    /// Most recent reading of a controller; a stale or missing reading is `no_data`.
    pub async fn latest_measurement(
        &self,
        controller_id: &str,
        max_age: Option<Duration>,
    ) -> Result<LatestMeasurement, AnalyticsError> {
        let max_age = max_age.unwrap_or_else(|| self.settings.latest_max_age());
        let Some(sample) = self.source.fetch_latest(controller_id, max_age).await? else {
            return Ok(LatestMeasurement::no_data(controller_id.to_string()));
        };

        let now = Utc::now();
        let age = now - sample.timestamp;
        if age > max_age {
            tracing::debug!(controller_id, age_seconds = age.num_seconds(), "Latest sample is stale");
            return Ok(LatestMeasurement::no_data(controller_id.to_string()));
        }

        Ok(LatestMeasurement {
            controller_id: controller_id.to_string(),
            measurement: Some(MetricResult {
                metric_name: sample.parameter.as_str().to_string(),
                value: sample.value,
                unit: sample.parameter.unit().to_string(),
                calculated_at: now,
                controller_id: sample.controller_id,
                description: None,
            }),
            status: DataStatus::Data,
            data_age_minutes: Some(age.num_milliseconds().max(0) as f64 / 60_000.0),
        })
    }
}
