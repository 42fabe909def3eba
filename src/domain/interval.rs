// Trend bucket interval ("30m", "1h", "1d", ...)
use chrono::Duration;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntervalError {
    #[error("interval is empty")]
    Empty,
    #[error("interval must start with a whole number")]
    MissingAmount,
    #[error("unknown unit '{0}', expected one of s, m, h, d, w")]
    UnknownUnit(String),
    #[error("interval must be positive")]
    NotPositive,
    #[error("interval is too large")]
    Overflow,
}

/// A positive bucket width, keeping the caller's spelling for echoing back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendInterval {
    label: String,
    duration: Duration,
}

impl TrendInterval {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl FromStr for TrendInterval {
    type Err = IntervalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        if label.is_empty() {
            return Err(IntervalError::Empty);
        }

        let split = label
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(label.len());
        let (amount, unit) = label.split_at(split);
        if amount.is_empty() {
            return Err(IntervalError::MissingAmount);
        }
        let amount: i64 = amount.parse().map_err(|_| IntervalError::Overflow)?;
        if amount == 0 {
            return Err(IntervalError::NotPositive);
        }

        let seconds_per_unit: i64 = match unit {
            "s" => 1,
            "m" => 60,
            "h" => 3_600,
            "d" => 86_400,
            "w" => 604_800,
            other => return Err(IntervalError::UnknownUnit(other.to_string())),
        };
        let seconds = amount
            .checked_mul(seconds_per_unit)
            .ok_or(IntervalError::Overflow)?;
        let duration = Duration::try_seconds(seconds).ok_or(IntervalError::Overflow)?;

        Ok(Self {
            label: label.to_string(),
            duration,
        })
    }
}

impl fmt::Display for TrendInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}
