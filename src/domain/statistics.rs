// Descriptive statistics and change metrics over ordered series
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStatistics {
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Sample standard deviation (n - 1), zero for a single value
    pub std_dev: f64,
}

impl SeriesStatistics {
    /// Returns `None` for an empty series rather than degenerate zeros.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let (mean, count) = running_mean(values.iter().copied())?;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = if count > 1 {
            // Deviations are scaled by the largest magnitude so squaring cannot overflow.
            let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
            let squares = values
                .iter()
                .map(|v| (v / scale - mean / scale).powi(2))
                .sum::<f64>();
            scale * (squares / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Some(Self {
            count,
            mean,
            min,
            max,
            std_dev,
        })
    }

    pub fn is_finite(&self) -> bool {
        [self.mean, self.min, self.max, self.std_dev]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Mean and count, accumulated without summing first so large finite values stay finite.
pub fn running_mean(values: impl IntoIterator<Item = f64>) -> Option<(f64, usize)> {
    let mut mean = 0.0;
    let mut count = 0usize;
    for value in values {
        count += 1;
        mean += value / count as f64 - mean / count as f64;
    }
    (count > 0).then_some((mean, count))
}

/// First-to-last movement of a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesChange {
    pub start_value: f64,
    pub end_value: f64,
    pub change: f64,
    /// Relative to the first value; zero when the first value is zero
    pub percent_change: f64,
    pub slope_per_hour: f64,
    pub duration_hours: f64,
}

impl SeriesChange {
    /// Needs at least two points; the series must be in ascending time order.
    pub fn from_series(series: &[(DateTime<Utc>, f64)]) -> Option<Self> {
        let (first, last) = match series {
            [first, .., last] => (first, last),
            _ => return None,
        };

        let (start_time, start_value) = *first;
        let (end_time, end_value) = *last;
        let change = end_value - start_value;
        let percent_change = if start_value != 0.0 {
            change / start_value * 100.0
        } else {
            0.0
        };
        let duration_hours = ((end_time - start_time).num_milliseconds() as f64 / 3_600_000.0).max(0.0);
        let slope_per_hour = if duration_hours > 0.0 {
            change / duration_hours
        } else {
            0.0
        };

        Some(Self {
            start_value,
            end_value,
            change,
            percent_change,
            slope_per_hour,
            duration_hours,
        })
    }

    pub fn is_finite(&self) -> bool {
        [self.change, self.percent_change, self.slope_per_hour]
            .iter()
            .all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_statistics_of_small_series() {
        let stats = SeriesStatistics::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(stats.count, 8);
        assert_eq!(stats.mean, 5.0);
        assert_eq!(stats.min, 2.0);
        assert_eq!(stats.max, 9.0);
        assert!((stats.std_dev - 2.138089935).abs() < 1e-6);
    }

    #[test]
    fn test_statistics_single_value_has_zero_spread() {
        let stats = SeriesStatistics::from_values(&[3.5]).unwrap();
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.min, stats.max);
    }

    #[test]
    fn test_statistics_near_f64_max_stay_finite() {
        let stats = SeriesStatistics::from_values(&[1e308, 1e308, 1e308]).unwrap();
        assert_eq!(stats.mean, 1e308);
        assert_eq!(stats.std_dev, 0.0);
        assert!(stats.is_finite());

        let stats = SeriesStatistics::from_values(&[f64::MAX, -f64::MAX]).unwrap();
        assert_eq!(stats.mean, 0.0);
        assert!(!stats.is_finite());
    }

    #[test]
    fn test_running_mean() {
        assert_eq!(running_mean([1.0, 2.0, 6.0]), Some((3.0, 3)));
        assert_eq!(running_mean([f64::MAX, f64::MAX]), Some((f64::MAX, 2)));
        assert_eq!(running_mean(std::iter::empty()), None);
    }

    #[test]
    fn test_statistics_empty_series() {
        assert_eq!(SeriesStatistics::from_values(&[]), None);
    }

    #[test]
    fn test_change_over_two_hours() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let series = vec![(t0, 20.0), (t0 + Duration::hours(1), 21.0), (t0 + Duration::hours(2), 25.0)];

        let change = SeriesChange::from_series(&series).unwrap();
        assert_eq!(change.change, 5.0);
        assert_eq!(change.percent_change, 25.0);
        assert_eq!(change.duration_hours, 2.0);
        assert_eq!(change.slope_per_hour, 2.5);
    }

    #[test]
    fn test_change_from_zero_has_no_percentage() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let change = SeriesChange::from_series(&[(t0, 0.0), (t0, 3.0)]).unwrap();
        assert_eq!(change.percent_change, 0.0);
        assert_eq!(change.slope_per_hour, 0.0);
    }

    #[test]
    fn test_change_overflow_is_not_finite() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        let change =
            SeriesChange::from_series(&[(t0, -f64::MAX), (t0 + Duration::hours(1), f64::MAX)])
                .unwrap();
        assert!(!change.is_finite());
    }

    #[test]
    fn test_change_needs_two_points() {
        let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap();
        assert_eq!(SeriesChange::from_series(&[(t0, 1.0)]), None);
    }
}
