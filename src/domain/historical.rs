// Historical raw-data query models
use super::measurement::{Parameter, RawSample, TimeRange};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Caller-supplied filters, every one optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalFilters {
    pub controller_id: Option<String>,
    pub sensor_id: Option<String>,
    pub zone: Option<String>,
    pub parameter: Option<Parameter>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

/// Filters after defaults were substituted; echoed back in the response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFilters {
    pub controller_id: Option<String>,
    pub sensor_id: Option<String>,
    pub zone: Option<String>,
    pub parameter: Option<Parameter>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub limit: usize,
}

impl AppliedFilters {
    pub fn range(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }

    /// AND-conjunction of every filter.
    pub fn matches(&self, sample: &RawSample) -> bool {
        fn tag_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
            match wanted {
                Some(wanted) => actual.as_deref() == Some(wanted.as_str()),
                None => true,
            }
        }

        self.controller_id
            .as_ref()
            .is_none_or(|c| *c == sample.controller_id)
            && tag_matches(&self.sensor_id, &sample.sensor_id)
            && tag_matches(&self.zone, &sample.zone)
            && self.parameter.is_none_or(|p| p == sample.parameter)
            && self.range().contains(sample.timestamp)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalDataPoint {
    pub timestamp: DateTime<Utc>,
    pub controller_id: String,
    pub sensor_id: Option<String>,
    pub zone: Option<String>,
    pub parameter: Parameter,
    pub value: f64,
    pub unit: &'static str,
}

impl From<RawSample> for HistoricalDataPoint {
    fn from(sample: RawSample) -> Self {
        Self {
            timestamp: sample.timestamp,
            controller_id: sample.controller_id,
            sensor_id: sample.sensor_id,
            zone: sample.zone,
            unit: sample.parameter.unit(),
            parameter: sample.parameter,
            value: sample.value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoricalQueryResponse {
    pub generated_at: DateTime<Utc>,
    pub total_points: usize,
    pub data_points: Vec<HistoricalDataPoint>,
    pub filters_applied: AppliedFilters,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn applied() -> AppliedFilters {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        AppliedFilters {
            controller_id: Some("ctrl-1".into()),
            sensor_id: None,
            zone: Some("north".into()),
            parameter: Some(Parameter::Temperature),
            start_time: start,
            end_time: start + Duration::days(1),
            limit: 100,
        }
    }

    #[test]
    fn test_matches_requires_every_filter() {
        let filters = applied();
        let t = filters.start_time + Duration::hours(3);
        let sample = RawSample::new("ctrl-1", Parameter::Temperature, t, 21.0).with_zone("north");

        assert!(filters.matches(&sample));
        assert!(!filters.matches(&RawSample { zone: None, ..sample.clone() }));
        assert!(!filters.matches(&RawSample {
            parameter: Parameter::AirHumidity,
            ..sample.clone()
        }));
        assert!(!filters.matches(&RawSample {
            controller_id: "ctrl-2".into(),
            ..sample.clone()
        }));
        assert!(!filters.matches(&RawSample {
            timestamp: filters.end_time,
            ..sample
        }));
    }
}
