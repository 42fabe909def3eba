// Metric calculation service - Turns raw samples into metric results
use crate::application::error::AnalyticsError;
use crate::application::measurement_source::MeasurementSource;
use crate::domain::analytics::{AnalyticsFilter, MetricResult, ParameterSummary};
use crate::domain::formulas::{self, Derived, DomainError};
use crate::domain::measurement::{Parameter, RawSample, TimeRange};
use crate::domain::metric::Metric;
use crate::domain::statistics::{SeriesChange, SeriesStatistics, running_mean};
use crate::infrastructure::config::AnalyticsSettings;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// A day needs a distinct maximum and minimum reading to contribute degree-days.
const MIN_READINGS_PER_DAY: usize = 2;

/// A metric result plus the number of raw samples it was derived from.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: MetricResult,
    pub samples_consumed: usize,
}

/// Why a set of samples could not be reduced to a metric value.
#[derive(Debug)]
pub(crate) enum ReduceError {
    Insufficient(String),
    Domain { inputs: String, source: DomainError },
}

impl ReduceError {
    pub(crate) fn into_analytics(self, metric: Metric, controller_id: &str) -> AnalyticsError {
        match self {
            ReduceError::Insufficient(reason) => {
                AnalyticsError::insufficient(metric.name(), controller_id, reason)
            }
            ReduceError::Domain { inputs, source } => AnalyticsError::Calculation {
                metric: metric.name().to_string(),
                controller_id: controller_id.to_string(),
                inputs,
                source,
            },
        }
    }
}

fn domain_error(inputs: String) -> impl FnOnce(DomainError) -> ReduceError {
    move |source| ReduceError::Domain { inputs, source }
}

#[derive(Clone)]
pub struct MetricCalculationService {
    source: Arc<dyn MeasurementSource>,
    settings: AnalyticsSettings,
}

impl MetricCalculationService {
    pub fn new(source: Arc<dyn MeasurementSource>, settings: AnalyticsSettings) -> Self {
        Self { source, settings }
    }

    /// Catalog names, identical and identically ordered on every call.
    pub fn list_supported_metrics(&self) -> &'static [&'static str] {
        Metric::names()
    }

    pub fn resolve_metric(&self, metric_name: &str) -> Result<Metric, AnalyticsError> {
        Metric::lookup(metric_name).ok_or_else(|| AnalyticsError::InvalidMetric {
            name: metric_name.to_string(),
        })
    }

    /// Resolve `metric_name` (before any I/O) and evaluate it for one controller.
    pub async fn compute(
        &self,
        metric_name: &str,
        controller_id: &str,
        filter: &AnalyticsFilter,
    ) -> Result<Evaluation, AnalyticsError> {
        let metric = self.resolve_metric(metric_name)?;
        self.evaluate(metric, controller_id, filter).await
    }

    pub async fn evaluate(
        &self,
        metric: Metric,
        controller_id: &str,
        filter: &AnalyticsFilter,
    ) -> Result<Evaluation, AnalyticsError> {
        let range = filter.resolve_range(Utc::now(), self.settings.lookback())?;
        let samples = self
            .fetch_inputs(metric, controller_id, range, filter.limit())
            .await?;

        if samples.is_empty() {
            return Err(AnalyticsError::insufficient(
                metric.name(),
                controller_id,
                format!("no samples between {} and {}", range.start, range.end),
            ));
        }

        let derived = self
            .reduce(metric, &samples)
            .map_err(|e| e.into_analytics(metric, controller_id))?;

        tracing::debug!(
            metric = metric.name(),
            controller_id,
            samples = samples.len(),
            value = derived.value,
            "Metric evaluated"
        );

        Ok(Evaluation {
            result: MetricResult {
                metric_name: metric.name().to_string(),
                value: derived.value,
                unit: derived.unit.to_string(),
                calculated_at: Utc::now(),
                controller_id: controller_id.to_string(),
                description: metric.description().map(str::to_string),
            },
            samples_consumed: samples.len(),
        })
    }

    /// Descriptive statistics and change of one raw parameter.
    pub async fn summarize(
        &self,
        parameter: Parameter,
        controller_id: &str,
        filter: &AnalyticsFilter,
    ) -> Result<ParameterSummary, AnalyticsError> {
        let range = filter.resolve_range(Utc::now(), self.settings.lookback())?;
        let samples = self
            .source
            .fetch(controller_id, parameter, range, filter.limit())
            .await?;

        let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
        let statistics = SeriesStatistics::from_values(&values).ok_or_else(|| {
            AnalyticsError::insufficient(parameter.as_str(), controller_id, "no readings in range")
        })?;
        let series: Vec<(DateTime<Utc>, f64)> =
            samples.iter().map(|s| (s.timestamp, s.value)).collect();
        let change = SeriesChange::from_series(&series);
        if !statistics.is_finite() || change.is_some_and(|c| !c.is_finite()) {
            return Err(AnalyticsError::Calculation {
                metric: parameter.as_str().to_string(),
                controller_id: controller_id.to_string(),
                inputs: format!("{} {parameter} readings", values.len()),
                source: DomainError::NonFiniteResult { formula: "summary" },
            });
        }

        Ok(ParameterSummary {
            controller_id: controller_id.to_string(),
            parameter,
            unit: parameter.unit().to_string(),
            generated_at: Utc::now(),
            statistics,
            change,
        })
    }

    /// Fetch every raw parameter the metric needs, one store query per parameter.
    pub(crate) async fn fetch_inputs(
        &self,
        metric: Metric,
        controller_id: &str,
        range: TimeRange,
        limit: Option<usize>,
    ) -> Result<Vec<RawSample>, AnalyticsError> {
        let fetches = metric
            .inputs()
            .iter()
            .map(|parameter| self.source.fetch(controller_id, *parameter, range, limit));
        let batches = futures::future::try_join_all(fetches).await.map_err(|e| {
            tracing::error!(error = %e, metric = metric.name(), controller_id, "Failed to fetch samples");
            e
        })?;

        Ok(batches.into_iter().flatten().collect())
    }

    /// Reduce samples (of any parameters) into the metric's formula inputs and evaluate.
    pub(crate) fn reduce(&self, metric: Metric, samples: &[RawSample]) -> Result<Derived, ReduceError> {
        match metric {
            Metric::Temperature => mean_of(samples, Parameter::Temperature),
            Metric::AirHumidity => mean_of(samples, Parameter::AirHumidity),
            Metric::SoilHumidity => mean_of(samples, Parameter::SoilHumidity),
            Metric::LightIntensity => mean_of(samples, Parameter::LightIntensity),
            Metric::GrowingDegreeDays => self.accumulated_gdd(samples),
            Metric::DewPoint => {
                let (t, rh) = paired_means(samples)?;
                formulas::dew_point(t, rh)
                    .map_err(domain_error(format!("temperature={t:.2}, air_humidity={rh:.2}")))
            }
            Metric::VaporPressureDeficit => {
                let (t, rh) = paired_means(samples)?;
                formulas::vapor_pressure_deficit(t, rh)
                    .map_err(domain_error(format!("temperature={t:.2}, air_humidity={rh:.2}")))
            }
            Metric::WaterDeficitIndex => {
                let actual = mean_of(samples, Parameter::SoilHumidity)?.value;
                let (max, min) = (self.settings.wdi_moisture_max, self.settings.wdi_moisture_min);
                formulas::water_deficit_index(actual, max, min).map_err(domain_error(format!(
                    "soil_humidity={actual:.4}, moisture_max={max}, moisture_min={min}"
                )))
            }
            Metric::DailyLightIntegral => {
                let average = mean_of(samples, Parameter::LightIntensity)?.value;
                formulas::daily_light_integral(average)
                    .map_err(domain_error(format!("light_intensity={average:.2}")))
            }
        }
    }

    fn accumulated_gdd(&self, samples: &[RawSample]) -> Result<Derived, ReduceError> {
        let mut days: BTreeMap<NaiveDate, (f64, f64, usize)> = BTreeMap::new();
        for sample in samples.iter().filter(|s| s.parameter == Parameter::Temperature) {
            let day = days
                .entry(sample.timestamp.date_naive())
                .or_insert((f64::NEG_INFINITY, f64::INFINITY, 0));
            day.0 = day.0.max(sample.value);
            day.1 = day.1.min(sample.value);
            day.2 += 1;
        }

        let t_base = self.settings.gdd_base_temperature;
        let mut total = 0.0;
        let mut full_days = 0;
        for (day, (t_max, t_min, readings)) in days {
            if readings < MIN_READINGS_PER_DAY {
                continue;
            }
            let gdd = formulas::growing_degree_days(t_max, t_min, t_base).map_err(domain_error(
                format!("{day}: t_max={t_max:.2}, t_min={t_min:.2}, t_base={t_base}"),
            ))?;
            total += gdd.value;
            full_days += 1;
        }

        if full_days == 0 {
            return Err(ReduceError::Insufficient(format!(
                "growing degree days need at least {MIN_READINGS_PER_DAY} temperature readings within one day"
            )));
        }
        Ok(Derived {
            value: total,
            unit: formulas::UNIT_GDD,
        })
    }
}

fn mean_of(samples: &[RawSample], parameter: Parameter) -> Result<Derived, ReduceError> {
    let Some((mean, count)) = running_mean(
        samples
            .iter()
            .filter(|s| s.parameter == parameter)
            .map(|s| s.value),
    ) else {
        return Err(ReduceError::Insufficient(format!("no {parameter} readings")));
    };
    if !mean.is_finite() {
        return Err(ReduceError::Domain {
            inputs: format!("{count} {parameter} readings"),
            source: DomainError::NonFiniteResult { formula: "mean" },
        });
    }

    Ok(Derived {
        value: mean,
        unit: parameter.unit(),
    })
}

/// Mean temperature and humidity over the instants where both were recorded.
fn paired_means(samples: &[RawSample]) -> Result<(f64, f64), ReduceError> {
    let mut temperatures: HashMap<DateTime<Utc>, (f64, usize)> = HashMap::new();
    for sample in samples.iter().filter(|s| s.parameter == Parameter::Temperature) {
        let slot = temperatures.entry(sample.timestamp).or_insert((0.0, 0));
        slot.0 += sample.value;
        slot.1 += 1;
    }

    let (mut t_sum, mut rh_sum, mut pairs) = (0.0, 0.0, 0usize);
    for sample in samples.iter().filter(|s| s.parameter == Parameter::AirHumidity) {
        if let Some((sum, count)) = temperatures.get(&sample.timestamp) {
            t_sum += sum / *count as f64;
            rh_sum += sample.value;
            pairs += 1;
        }
    }

    if pairs == 0 {
        return Err(ReduceError::Insufficient(
            "no instant with both temperature and air_humidity readings".to_string(),
        ));
    }
    Ok((t_sum / pairs as f64, rh_sum / pairs as f64))
}
