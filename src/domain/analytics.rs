// Analytics domain models - request-scoped value objects
use super::measurement::{Parameter, TimeRange};
use super::statistics::{SeriesChange, SeriesStatistics};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

/// Upper bound for any caller-supplied sample cap.
pub const MAX_LIMIT: usize = 10_000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("start_time {start} is after end_time {end}")]
    InvertedRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("start_time {start} must be before end_time {end}")]
    EmptyRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("limit must be greater than zero")]
    ZeroLimit,
    #[error("limit {limit} exceeds the maximum of {max}")]
    LimitTooLarge { limit: usize, max: usize },
}

/// Time window and sample cap for a metric query, validated once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalyticsFilter {
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
    limit: Option<usize>,
}

impl AnalyticsFilter {
    pub fn new(
        start_time: Option<DateTime<Utc>>,
        end_time: Option<DateTime<Utc>>,
        limit: Option<usize>,
    ) -> Result<Self, FilterError> {
        if let (Some(start), Some(end)) = (start_time, end_time) {
            if start > end {
                return Err(FilterError::InvertedRange { start, end });
            }
        }
        match limit {
            Some(0) => return Err(FilterError::ZeroLimit),
            Some(limit) if limit > MAX_LIMIT => {
                return Err(FilterError::LimitTooLarge {
                    limit,
                    max: MAX_LIMIT,
                });
            }
            _ => {}
        }

        Ok(Self {
            start_time,
            end_time,
            limit,
        })
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Concrete window: a missing end is `now`, a missing start is `end - lookback`.
    ///
    /// A start given alone may still land after `now`; the resolved window is
    /// checked again.
    pub fn resolve_range(
        &self,
        now: DateTime<Utc>,
        lookback: Duration,
    ) -> Result<TimeRange, FilterError> {
        let end = self.end_time.unwrap_or(now);
        let start = self.start_time.unwrap_or(end - lookback);
        if start > end {
            return Err(FilterError::InvertedRange { start, end });
        }
        Ok(TimeRange::new(start, end))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    pub calculated_at: DateTime<Utc>,
    pub controller_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub controller_id: String,
    pub generated_at: DateTime<Utc>,
    /// Raw samples consumed to produce `metrics`
    pub data_points_count: usize,
    pub metrics: Vec<MetricResult>,
}

impl AnalyticsReport {
    pub fn new(controller_id: String, data_points_count: usize, metrics: Vec<MetricResult>) -> Self {
        Self {
            controller_id,
            generated_at: Utc::now(),
            data_points_count,
            metrics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiMetricReport {
    pub generated_at: DateTime<Utc>,
    pub total_controllers: usize,
    pub total_metrics: usize,
    pub reports: Vec<AnalyticsReport>,
}

impl MultiMetricReport {
    pub fn new(reports: Vec<AnalyticsReport>, total_metrics: usize) -> Self {
        Self {
            generated_at: Utc::now(),
            total_controllers: reports.len(),
            total_metrics,
            reports,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendDataPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub interval: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendAnalysis {
    pub metric_name: String,
    pub controller_id: String,
    pub interval: String,
    pub generated_at: DateTime<Utc>,
    pub total_points: usize,
    pub average_value: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub data_points: Vec<TrendDataPoint>,
}

impl TrendAnalysis {
    /// Statistics are taken over the emitted points; `None` when there are none.
    pub fn from_points(
        metric_name: String,
        controller_id: String,
        interval: String,
        data_points: Vec<TrendDataPoint>,
    ) -> Option<Self> {
        let values: Vec<f64> = data_points.iter().map(|p| p.value).collect();
        let stats = SeriesStatistics::from_values(&values)?;

        Some(Self {
            metric_name,
            controller_id,
            interval,
            generated_at: Utc::now(),
            total_points: data_points.len(),
            average_value: stats.mean,
            min_value: stats.min,
            max_value: stats.max,
            data_points,
        })
    }

    pub fn is_finite(&self) -> bool {
        [self.average_value, self.min_value, self.max_value]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataStatus {
    Data,
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestMeasurement {
    pub controller_id: String,
    pub measurement: Option<MetricResult>,
    pub status: DataStatus,
    pub data_age_minutes: Option<f64>,
}

impl LatestMeasurement {
    pub fn no_data(controller_id: String) -> Self {
        Self {
            controller_id,
            measurement: None,
            status: DataStatus::NoData,
            data_age_minutes: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSummary {
    pub controller_id: String,
    pub parameter: Parameter,
    pub unit: String,
    pub generated_at: DateTime<Utc>,
    pub statistics: SeriesStatistics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<SeriesChange>,
}
