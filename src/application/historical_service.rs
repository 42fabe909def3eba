// Historical query service - Filtered raw samples, no formula applied
use crate::application::error::AnalyticsError;
use crate::application::measurement_source::MeasurementSource;
use crate::domain::analytics::{FilterError, MAX_LIMIT};
use crate::domain::historical::{
    AppliedFilters, HistoricalDataPoint, HistoricalFilters, HistoricalQueryResponse,
};
use crate::infrastructure::config::AnalyticsSettings;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct HistoricalQueryService {
    source: Arc<dyn MeasurementSource>,
    settings: AnalyticsSettings,
}

impl HistoricalQueryService {
    pub fn new(source: Arc<dyn MeasurementSource>, settings: AnalyticsSettings) -> Self {
        Self { source, settings }
    }

    pub async fn query(
        &self,
        filters: HistoricalFilters,
    ) -> Result<HistoricalQueryResponse, AnalyticsError> {
        let applied = self.apply_defaults(filters)?;

        let mut samples = self.source.scan(&applied).await?;
        samples.retain(|s| applied.matches(s));
        samples.truncate(applied.limit);

        tracing::debug!(
            controller_id = applied.controller_id.as_deref(),
            points = samples.len(),
            limit = applied.limit,
            "Historical query served"
        );

        let data_points: Vec<HistoricalDataPoint> = samples.into_iter().map(Into::into).collect();
        Ok(HistoricalQueryResponse {
            generated_at: Utc::now(),
            total_points: data_points.len(),
            data_points,
            filters_applied: applied,
        })
    }

    /// Substitute the default window and limit; an oversized limit is clamped.
    pub fn apply_defaults(&self, filters: HistoricalFilters) -> Result<AppliedFilters, FilterError> {
        let end_time = filters.end_time.unwrap_or_else(Utc::now);
        let start_time = filters
            .start_time
            .unwrap_or(end_time - self.settings.lookback());
        if start_time > end_time {
            return Err(FilterError::InvertedRange {
                start: start_time,
                end: end_time,
            });
        }

        let limit = match filters.limit {
            Some(0) => return Err(FilterError::ZeroLimit),
            Some(limit) => limit.min(MAX_LIMIT),
            None => self.settings.historical_default_limit.clamp(1, MAX_LIMIT),
        };

        Ok(AppliedFilters {
            controller_id: filters.controller_id,
            sensor_id: filters.sensor_id,
            zone: filters.zone,
            parameter: filters.parameter,
            start_time,
            end_time,
            limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::{InMemorySource, hourly};
    use crate::domain::measurement::{Parameter, RawSample};
    use chrono::{DateTime, Duration, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 0, 0, 0).unwrap()
    }

    fn window() -> HistoricalFilters {
        HistoricalFilters {
            start_time: Some(start()),
            end_time: Some(start() + Duration::days(1)),
            ..HistoricalFilters::default()
        }
    }

    fn service(samples: Vec<RawSample>) -> HistoricalQueryService {
        HistoricalQueryService::new(
            Arc::new(InMemorySource::with_samples(samples)),
            AnalyticsSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_limit_above_ceiling_is_clamped() {
        let response = service(vec![])
            .query(HistoricalFilters {
                limit: Some(20_000),
                ..window()
            })
            .await
            .unwrap();
        assert_eq!(response.filters_applied.limit, MAX_LIMIT);
        assert_eq!(response.total_points, 0);
    }

    #[tokio::test]
    async fn test_defaults_are_echoed() {
        let response = service(vec![]).query(HistoricalFilters::default()).await.unwrap();
        let applied = response.filters_applied;

        assert_eq!(applied.limit, 1_000);
        assert_eq!(applied.end_time - applied.start_time, Duration::days(30));
        assert!(applied.controller_id.is_none());
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let mut samples = hourly("c1", Parameter::Temperature, start(), 4, |i| i as f64);
        samples.push(
            RawSample::new("c1", Parameter::Temperature, start() + Duration::minutes(30), 99.0)
                .with_zone("south"),
        );
        samples.push(
            RawSample::new("c1", Parameter::SoilHumidity, start() + Duration::minutes(10), 0.3)
                .with_zone("north"),
        );
        samples.push(
            RawSample::new("c1", Parameter::Temperature, start() + Duration::minutes(20), 18.0)
                .with_zone("north")
                .with_sensor("s-7"),
        );

        let response = service(samples)
            .query(HistoricalFilters {
                controller_id: Some("c1".into()),
                zone: Some("north".into()),
                parameter: Some(Parameter::Temperature),
                ..window()
            })
            .await
            .unwrap();

        assert_eq!(response.total_points, 1);
        let point = &response.data_points[0];
        assert_eq!(point.value, 18.0);
        assert_eq!(point.sensor_id.as_deref(), Some("s-7"));
        assert_eq!(point.unit, "°C");
    }

    #[tokio::test]
    async fn test_results_are_capped_and_ascending() {
        let samples = hourly("c1", Parameter::LightIntensity, start(), 10, |i| i as f64 * 100.0);
        let response = service(samples)
            .query(HistoricalFilters {
                limit: Some(3),
                ..window()
            })
            .await
            .unwrap();

        assert_eq!(response.total_points, 3);
        assert!(
            response
                .data_points
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp)
        );
    }

    #[tokio::test]
    async fn test_invalid_filters_are_rejected() {
        let zero = service(vec![])
            .query(HistoricalFilters {
                limit: Some(0),
                ..window()
            })
            .await
            .unwrap_err();
        assert!(matches!(zero, AnalyticsError::InvalidFilter(FilterError::ZeroLimit)));

        let inverted = service(vec![])
            .query(HistoricalFilters {
                start_time: Some(start() + Duration::days(2)),
                ..window()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            inverted,
            AnalyticsError::InvalidFilter(FilterError::InvertedRange { .. })
        ));
    }

    #[tokio::test]
    async fn test_source_failure_is_not_swallowed() {
        let service = HistoricalQueryService::new(
            Arc::new(InMemorySource::unavailable()),
            AnalyticsSettings::default(),
        );
        let err = service.query(window()).await.unwrap_err();
        assert!(matches!(err, AnalyticsError::Source(_)));
    }
}
