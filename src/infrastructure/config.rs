use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub influx: InfluxSettings,
    #[serde(default)]
    pub analytics: AnalyticsSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Upper bound for any HTTP request, multi-reports included
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            request_timeout_secs: 30,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

impl Settings {
    /// A multi-report pair must be able to time out before the request does.
    pub fn validate(&self) -> anyhow::Result<()> {
        let pair = self.analytics.pair_timeout();
        let request = self.server.request_timeout();
        if pair >= request {
            anyhow::bail!(
                "analytics.pair_timeout_ms ({} ms) must be below server.request_timeout_secs ({} s)",
                pair.as_millis(),
                request.as_secs()
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InfluxSettings {
    pub host: String,
    pub token: String,
    pub database: String,
    pub retention_policy: String,
    pub measurement: String,
    pub request_timeout_secs: u64,
}

impl Default for InfluxSettings {
    fn default() -> Self {
        Self {
            host: "http://localhost:8086".to_string(),
            token: String::new(),
            database: "agriculture".to_string(),
            retention_policy: "autogen".to_string(),
            measurement: "agricultural_sensors".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Calculation constants and engine policies.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalyticsSettings {
    /// Crop base temperature for growing degree days (°C)
    pub gdd_base_temperature: f64,
    /// Soil moisture at field capacity
    pub wdi_moisture_max: f64,
    /// Soil moisture at wilting point
    pub wdi_moisture_min: f64,
    pub default_lookback_days: i64,
    pub latest_max_age_minutes: i64,
    pub multi_report_concurrency: usize,
    pub pair_timeout_ms: u64,
    pub historical_default_limit: usize,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            gdd_base_temperature: 10.0,
            wdi_moisture_max: 1.0,
            wdi_moisture_min: 0.0,
            default_lookback_days: 30,
            latest_max_age_minutes: 10,
            multi_report_concurrency: 8,
            pair_timeout_ms: 5_000,
            historical_default_limit: 1_000,
        }
    }
}

impl AnalyticsSettings {
    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::days(self.default_lookback_days.max(1))
    }

    pub fn latest_max_age(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.latest_max_age_minutes.max(1))
    }

    pub fn pair_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.pair_timeout_ms.max(1))
    }
}

/// Load settings from `config/analytics.{toml,yaml,json}` (optional), then
/// `ANALYTICS__SECTION__KEY` environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/analytics").required(false))
        .add_source(
            config::Environment::with_prefix("ANALYTICS")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
