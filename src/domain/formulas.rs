// Agronomic formula library - pure functions, no I/O
use thiserror::Error;

pub const UNIT_GDD: &str = "GDD";
pub const UNIT_CELSIUS: &str = "°C";
pub const UNIT_PERCENT: &str = "%";
pub const UNIT_DLI: &str = "mol/m²/d";
pub const UNIT_KPA: &str = "kPa";

const MAGNUS_A: f64 = 17.62;
const MAGNUS_B: f64 = 243.12;
const TETENS_A: f64 = 17.27;
const TETENS_B: f64 = 237.3;
const TETENS_SVP0: f64 = 0.6108;
const SECONDS_PER_DAY: f64 = 86_400.0;
const MICROMOL_PER_MOL: f64 = 1_000_000.0;

/// A formula received input outside the range it is defined on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("relative humidity {humidity}% is outside (0, 100]")]
    HumidityOutOfRange { humidity: f64 },

    #[error("temperature {temperature}°C is at or below the -237.3°C asymptote")]
    TemperatureBelowAsymptote { temperature: f64 },

    #[error("moisture range is empty (max {max}, min {min})")]
    DegenerateMoistureRange { max: f64, min: f64 },

    #[error("daily maximum {t_max}°C is below daily minimum {t_min}°C")]
    InvertedTemperaturePair { t_max: f64, t_min: f64 },

    #[error("light reading {reading} cannot be negative")]
    NegativeLight { reading: f64 },

    #[error("{formula} received a non-finite input")]
    NonFiniteInput { formula: &'static str },

    #[error("{formula} produced a non-finite result")]
    NonFiniteResult { formula: &'static str },
}

/// Derived value together with its unit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Derived {
    pub value: f64,
    pub unit: &'static str,
}

impl Derived {
    fn checked(formula: &'static str, value: f64, unit: &'static str) -> Result<Self, DomainError> {
        if value.is_finite() {
            Ok(Self { value, unit })
        } else {
            Err(DomainError::NonFiniteResult { formula })
        }
    }
}

fn require_finite(formula: &'static str, inputs: &[f64]) -> Result<(), DomainError> {
    if inputs.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(DomainError::NonFiniteInput { formula })
    }
}

/// Growing Degree Days for one day: `(T_max + T_min) / 2 - T_base`, never negative.
pub fn growing_degree_days(t_max: f64, t_min: f64, t_base: f64) -> Result<Derived, DomainError> {
    const NAME: &str = "growing degree days";
    require_finite(NAME, &[t_max, t_min, t_base])?;
    if t_max < t_min {
        return Err(DomainError::InvertedTemperaturePair { t_max, t_min });
    }

    let gdd = ((t_max + t_min) / 2.0 - t_base).max(0.0);
    Derived::checked(NAME, gdd, UNIT_GDD)
}

/// Dew point (Magnus-Tetens, Sonntag coefficients).
pub fn dew_point(temperature: f64, humidity: f64) -> Result<Derived, DomainError> {
    const NAME: &str = "dew point";
    require_finite(NAME, &[temperature, humidity])?;
    if humidity <= 0.0 || humidity > 100.0 {
        return Err(DomainError::HumidityOutOfRange { humidity });
    }

    let gamma = (humidity / 100.0).ln() + (MAGNUS_A * temperature) / (MAGNUS_B + temperature);
    let td = MAGNUS_B * gamma / (MAGNUS_A - gamma);
    Derived::checked(NAME, td, UNIT_CELSIUS)
}

/// Water Deficit Index in percent. The actual reading is clamped into `[min, max]`.
pub fn water_deficit_index(
    actual: f64,
    moisture_max: f64,
    moisture_min: f64,
) -> Result<Derived, DomainError> {
    const NAME: &str = "water deficit index";
    require_finite(NAME, &[actual, moisture_max, moisture_min])?;
    if moisture_max <= moisture_min {
        return Err(DomainError::DegenerateMoistureRange {
            max: moisture_max,
            min: moisture_min,
        });
    }

    let actual = actual.clamp(moisture_min, moisture_max);
    let wdi = (moisture_max - actual) / (moisture_max - moisture_min) * 100.0;
    Derived::checked(NAME, wdi, UNIT_PERCENT)
}

/// Daily Light Integral from an average PPFD reading (µmol/m²/s → mol/m²/d).
pub fn daily_light_integral(average_light: f64) -> Result<Derived, DomainError> {
    const NAME: &str = "daily light integral";
    require_finite(NAME, &[average_light])?;
    if average_light < 0.0 {
        return Err(DomainError::NegativeLight {
            reading: average_light,
        });
    }

    Derived::checked(NAME, average_light * SECONDS_PER_DAY / MICROMOL_PER_MOL, UNIT_DLI)
}

/// Saturated vapor pressure in kPa (Tetens).
pub fn saturated_vapor_pressure(temperature: f64) -> Result<f64, DomainError> {
    const NAME: &str = "saturated vapor pressure";
    require_finite(NAME, &[temperature])?;
    if temperature <= -TETENS_B {
        return Err(DomainError::TemperatureBelowAsymptote { temperature });
    }

    let svp = TETENS_SVP0 * ((TETENS_A * temperature) / (temperature + TETENS_B)).exp();
    Derived::checked(NAME, svp, UNIT_KPA).map(|d| d.value)
}

/// Vapor Pressure Deficit in kPa: `SVP - (RH / 100) * SVP`.
pub fn vapor_pressure_deficit(temperature: f64, humidity: f64) -> Result<Derived, DomainError> {
    const NAME: &str = "vapor pressure deficit";
    require_finite(NAME, &[temperature, humidity])?;
    if !(0.0..=100.0).contains(&humidity) {
        return Err(DomainError::HumidityOutOfRange { humidity });
    }

    let svp = saturated_vapor_pressure(temperature)?;
    let avp = humidity / 100.0 * svp;
    Derived::checked(NAME, svp - avp, UNIT_KPA)
}
