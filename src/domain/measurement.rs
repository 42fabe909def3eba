// Raw sensor measurement domain model
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A raw field recorded by a controller's sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    Temperature,
    AirHumidity,
    SoilHumidity,
    LightIntensity,
}

impl Parameter {
    pub const ALL: [Parameter; 4] = [
        Parameter::Temperature,
        Parameter::AirHumidity,
        Parameter::SoilHumidity,
        Parameter::LightIntensity,
    ];

    /// Field name in the time-series store
    pub fn as_str(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::AirHumidity => "air_humidity",
            Parameter::SoilHumidity => "soil_humidity",
            Parameter::LightIntensity => "light_intensity",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Temperature => "°C",
            Parameter::AirHumidity => "%",
            Parameter::SoilHumidity => "m³/m³",
            Parameter::LightIntensity => "µmol/m²/s",
        }
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown parameter '{0}'")]
pub struct UnknownParameter(pub String);

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Parameter::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| UnknownParameter(s.to_string()))
    }
}

/// One timestamped reading of one parameter, as returned by the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawSample {
    pub controller_id: String,
    pub sensor_id: Option<String>,
    pub zone: Option<String>,
    pub parameter: Parameter,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl RawSample {
    pub fn new(
        controller_id: impl Into<String>,
        parameter: Parameter,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Self {
        Self {
            controller_id: controller_id.into(),
            sensor_id: None,
            zone: None,
            parameter,
            timestamp,
            value,
        }
    }

    pub fn with_sensor(mut self, sensor_id: impl Into<String>) -> Self {
        self.sensor_id = Some(sensor_id.into());
        self
    }

    pub fn with_zone(mut self, zone: impl Into<String>) -> Self {
        self.zone = Some(zone.into());
        self
    }
}

/// Half-open time window `[start, end)` used for every store lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}
