// Supported metrics catalog
use super::formulas::{UNIT_CELSIUS, UNIT_DLI, UNIT_GDD, UNIT_KPA, UNIT_PERCENT};
use super::measurement::Parameter;
use serde::Serialize;
use std::fmt;

/// Every metric the service can report on. Raw parameters are reported as their
/// window mean; the rest are derived through the formula library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Temperature,
    AirHumidity,
    SoilHumidity,
    LightIntensity,
    GrowingDegreeDays,
    DewPoint,
    WaterDeficitIndex,
    DailyLightIntegral,
    VaporPressureDeficit,
}

const CATALOG: [Metric; 9] = [
    Metric::Temperature,
    Metric::AirHumidity,
    Metric::SoilHumidity,
    Metric::LightIntensity,
    Metric::GrowingDegreeDays,
    Metric::DewPoint,
    Metric::WaterDeficitIndex,
    Metric::DailyLightIntegral,
    Metric::VaporPressureDeficit,
];

const CATALOG_NAMES: [&str; 9] = [
    "temperature",
    "air_humidity",
    "soil_humidity",
    "light_intensity",
    "growing_degree_days",
    "dew_point",
    "water_deficit_index",
    "daily_light_integral",
    "vapor_pressure_deficit",
];

impl Metric {
    pub fn all() -> &'static [Metric] {
        &CATALOG
    }

    /// Catalog names in catalog order.
    pub fn names() -> &'static [&'static str] {
        &CATALOG_NAMES
    }

    /// Case-insensitive exact lookup against the catalog.
    pub fn lookup(name: &str) -> Option<Metric> {
        let name = name.trim();
        CATALOG
            .iter()
            .zip(CATALOG_NAMES)
            .find(|(_, candidate)| candidate.eq_ignore_ascii_case(name))
            .map(|(metric, _)| *metric)
    }

    pub fn name(&self) -> &'static str {
        // Variants are declared in catalog order.
        CATALOG_NAMES[*self as usize]
    }

    /// Raw parameters that have to be fetched to evaluate this metric.
    pub fn inputs(&self) -> &'static [Parameter] {
        match self {
            Metric::Temperature | Metric::GrowingDegreeDays => &[Parameter::Temperature],
            Metric::AirHumidity => &[Parameter::AirHumidity],
            Metric::SoilHumidity | Metric::WaterDeficitIndex => &[Parameter::SoilHumidity],
            Metric::LightIntensity | Metric::DailyLightIntegral => &[Parameter::LightIntensity],
            Metric::DewPoint | Metric::VaporPressureDeficit => {
                &[Parameter::Temperature, Parameter::AirHumidity]
            }
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => Parameter::Temperature.unit(),
            Metric::AirHumidity => Parameter::AirHumidity.unit(),
            Metric::SoilHumidity => Parameter::SoilHumidity.unit(),
            Metric::LightIntensity => Parameter::LightIntensity.unit(),
            Metric::GrowingDegreeDays => UNIT_GDD,
            Metric::DewPoint => UNIT_CELSIUS,
            Metric::WaterDeficitIndex => UNIT_PERCENT,
            Metric::DailyLightIntegral => UNIT_DLI,
            Metric::VaporPressureDeficit => UNIT_KPA,
        }
    }

    pub fn description(&self) -> Option<&'static str> {
        match self {
            Metric::GrowingDegreeDays => Some("Accumulated heat units driving plant development"),
            Metric::DewPoint => Some("Temperature at which water vapor condenses"),
            Metric::WaterDeficitIndex => Some("Normalized soil moisture stress of the crop"),
            Metric::DailyLightIntegral => Some("Photosynthetic light delivered per day"),
            Metric::VaporPressureDeficit => Some("Atmospheric drive for plant transpiration"),
            _ => None,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
