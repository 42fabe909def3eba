// Error taxonomy of the analytics services
use crate::application::measurement_source::SourceError;
use crate::domain::analytics::FilterError;
use crate::domain::formulas::DomainError;
use crate::domain::interval::IntervalError;
use crate::domain::metric::Metric;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("metric '{name}' is not supported. Supported metrics: {supported}", supported = Metric::names().join(", "))]
    InvalidMetric { name: String },

    #[error("insufficient data for {metric} on controller {controller_id}: {reason}")]
    InsufficientData {
        metric: String,
        controller_id: String,
        reason: String,
    },

    #[error("cannot calculate {metric} for controller {controller_id} from {inputs}: {source}")]
    Calculation {
        metric: String,
        controller_id: String,
        inputs: String,
        #[source]
        source: DomainError,
    },

    #[error("invalid interval '{interval}': {source}")]
    InvalidInterval {
        interval: String,
        #[source]
        source: IntervalError,
    },

    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error(transparent)]
    Source(#[from] SourceError),
}

impl AnalyticsError {
    pub fn insufficient(
        metric: impl Into<String>,
        controller_id: &str,
        reason: impl Into<String>,
    ) -> Self {
        Self::InsufficientData {
            metric: metric.into(),
            controller_id: controller_id.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_metric_lists_catalog() {
        let err = AnalyticsError::InvalidMetric {
            name: "rainfall".to_string(),
        };
        let message = err.to_string();
        assert!(message.starts_with("metric 'rainfall' is not supported"));
        assert!(message.contains("vapor_pressure_deficit"));
    }

    #[test]
    fn test_calculation_error_carries_inputs() {
        let err = AnalyticsError::Calculation {
            metric: "dew_point".to_string(),
            controller_id: "c1".to_string(),
            inputs: "temperature=21.00, air_humidity=0.00".to_string(),
            source: DomainError::HumidityOutOfRange { humidity: 0.0 },
        };
        assert!(err.to_string().contains("air_humidity=0.00"));
    }

    #[test]
    fn test_source_error_is_transparent() {
        let err: AnalyticsError = SourceError::Unavailable("connection refused".into()).into();
        assert_eq!(
            err.to_string(),
            "measurement source unavailable: connection refused"
        );
    }
}
