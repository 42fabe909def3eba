// Trend analyzer - Fixed-interval bucketing of a metric over a window
use crate::application::error::AnalyticsError;
use crate::application::metric_service::{MetricCalculationService, ReduceError};
use crate::domain::analytics::{FilterError, TrendAnalysis, TrendDataPoint};
use crate::domain::formulas::DomainError;
use crate::domain::interval::TrendInterval;
use crate::domain::measurement::{RawSample, TimeRange};
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

#[derive(Clone)]
pub struct TrendAnalyzer {
    metrics: MetricCalculationService,
}

impl TrendAnalyzer {
    pub fn new(metrics: MetricCalculationService) -> Self {
        Self { metrics }
    }

    /// Buckets are half-open windows anchored at `start`; the last one is clipped
    /// at `end`. Each bucket is reduced on its own samples only and empty or
    /// underfilled buckets are left out.
    pub async fn analyze(
        &self,
        metric_name: &str,
        controller_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: &str,
    ) -> Result<TrendAnalysis, AnalyticsError> {
        let metric = self.metrics.resolve_metric(metric_name)?;
        let interval: TrendInterval =
            interval
                .parse()
                .map_err(|source| AnalyticsError::InvalidInterval {
                    interval: interval.to_string(),
                    source,
                })?;
        if start >= end {
            return Err(FilterError::EmptyRange { start, end }.into());
        }

        let range = TimeRange::new(start, end);
        let samples = self
            .metrics
            .fetch_inputs(metric, controller_id, range, None)
            .await?;

        let step_ms = interval.duration().num_milliseconds();
        let mut buckets: BTreeMap<i64, Vec<RawSample>> = BTreeMap::new();
        for sample in samples.into_iter().filter(|s| range.contains(s.timestamp)) {
            let index = (sample.timestamp - start).num_milliseconds() / step_ms;
            buckets.entry(index).or_default().push(sample);
        }

        let mut data_points = Vec::with_capacity(buckets.len());
        for (index, bucket) in buckets {
            let bucket_start = start + Duration::milliseconds(step_ms * index);
            match self.metrics.reduce(metric, &bucket) {
                Ok(derived) => data_points.push(TrendDataPoint {
                    timestamp: bucket_start,
                    value: derived.value,
                    interval: interval.label().to_string(),
                }),
                Err(ReduceError::Insufficient(reason)) => {
                    tracing::debug!(
                        metric = metric.name(),
                        controller_id,
                        %bucket_start,
                        %reason,
                        "Skipping bucket"
                    );
                }
                Err(e) => return Err(e.into_analytics(metric, controller_id)),
            }
        }

        let trend = TrendAnalysis::from_points(
            metric.name().to_string(),
            controller_id.to_string(),
            interval.label().to_string(),
            data_points,
        )
        .ok_or_else(|| {
            AnalyticsError::insufficient(
                metric.name(),
                controller_id,
                format!("no {} bucket between {start} and {end} produced a value", interval.label()),
            )
        })?;

        if !trend.is_finite() {
            return Err(AnalyticsError::Calculation {
                metric: metric.name().to_string(),
                controller_id: controller_id.to_string(),
                inputs: format!("{} {} buckets", trend.total_points, interval.label()),
                source: DomainError::NonFiniteResult { formula: "trend" },
            });
        }
        Ok(trend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{InMemorySource, hourly};
    use crate::domain::measurement::Parameter;
    use crate::infrastructure::config::AnalyticsSettings;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 8, 15, 0, 0, 0).unwrap()
    }

    fn analyzer(samples: Vec<RawSample>) -> TrendAnalyzer {
        let source = Arc::new(InMemorySource::with_samples(samples));
        TrendAnalyzer::new(MetricCalculationService::new(source, AnalyticsSettings::default()))
    }

    #[tokio::test]
    async fn test_constant_series_in_six_hour_buckets() {
        let samples = hourly("c1", Parameter::Temperature, start(), 24, |_| 20.0);
        let trend = analyzer(samples)
            .analyze("temperature", "c1", start(), start() + Duration::hours(24), "6h")
            .await
            .unwrap();

        assert_eq!(trend.total_points, 4);
        assert_eq!(trend.data_points.len(), 4);
        assert_eq!(trend.average_value, 20.0);
        assert_eq!(trend.min_value, 20.0);
        assert_eq!(trend.max_value, 20.0);
        assert_eq!(trend.interval, "6h");
        assert_eq!(trend.data_points[1].timestamp, start() + Duration::hours(6));
    }

    #[tokio::test]
    async fn test_empty_buckets_are_omitted() {
        let mut samples = hourly("c1", Parameter::Temperature, start(), 2, |_| 10.0);
        samples.extend(hourly(
            "c1",
            Parameter::Temperature,
            start() + Duration::hours(20),
            2,
            |_| 30.0,
        ));
        let trend = analyzer(samples)
            .analyze("temperature", "c1", start(), start() + Duration::hours(24), "6h")
            .await
            .unwrap();

        assert_eq!(trend.total_points, 2);
        assert_eq!(trend.data_points[0].timestamp, start());
        assert_eq!(trend.data_points[1].timestamp, start() + Duration::hours(18));
        assert_eq!(trend.average_value, 20.0);
    }

    #[tokio::test]
    async fn test_last_bucket_is_clipped_at_end() {
        let samples = hourly("c1", Parameter::Temperature, start(), 10, |i| i as f64);
        let trend = analyzer(samples)
            .analyze("temperature", "c1", start(), start() + Duration::hours(7), "4h")
            .await
            .unwrap();

        // [0,4) -> 0..3, [4,7) -> 4..6
        let values: Vec<f64> = trend.data_points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![1.5, 5.0]);
    }

    #[tokio::test]
    async fn test_derived_metric_pairs_within_bucket_only() {
        let mut samples = hourly("c1", Parameter::Temperature, start(), 4, |_| 25.0);
        samples.extend(hourly("c1", Parameter::AirHumidity, start(), 2, |_| 50.0));
        let trend = analyzer(samples)
            .analyze(
                "vapor_pressure_deficit",
                "c1",
                start(),
                start() + Duration::hours(4),
                "2h",
            )
            .await
            .unwrap();

        assert_eq!(trend.total_points, 1);
        assert_eq!(trend.data_points[0].timestamp, start());
    }

    #[tokio::test]
    async fn test_invalid_interval() {
        for interval in ["", "abc", "0h", "-1h", "5x"] {
            let err = analyzer(vec![])
                .analyze("temperature", "c1", start(), start() + Duration::hours(1), interval)
                .await
                .unwrap_err();
            assert!(
                matches!(err, AnalyticsError::InvalidInterval { .. }),
                "{interval:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_empty_window_is_rejected() {
        let err = analyzer(vec![])
            .analyze("temperature", "c1", start(), start(), "1h")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AnalyticsError::InvalidFilter(FilterError::EmptyRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_bucket_with_value_is_insufficient() {
        let err = analyzer(vec![])
            .analyze("dew_point", "c1", start(), start() + Duration::hours(6), "1h")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::InsufficientData { .. }));
    }

    #[tokio::test]
    async fn test_huge_bucket_values_keep_a_finite_average() {
        let samples = hourly("c1", Parameter::LightIntensity, start(), 2, |_| 1e308);
        let trend = analyzer(samples)
            .analyze("light_intensity", "c1", start(), start() + Duration::hours(2), "1h")
            .await
            .unwrap();

        assert_eq!(trend.total_points, 2);
        assert_eq!(trend.average_value, 1e308);
        let json = serde_json::to_value(&trend).unwrap();
        assert_eq!(json["average_value"], 1e308);
    }

    #[tokio::test]
    async fn test_out_of_domain_bucket_aborts() {
        let mut samples = hourly("c1", Parameter::Temperature, start(), 2, |_| 20.0);
        samples.extend(hourly("c1", Parameter::AirHumidity, start(), 2, |_| 0.0));
        let err = analyzer(samples)
            .analyze("dew_point", "c1", start(), start() + Duration::hours(2), "1h")
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::Calculation { .. }));
    }
}
