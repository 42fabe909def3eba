// InfluxDB measurement source (InfluxQL over the v1-compatible HTTP API)
use crate::application::measurement_source::{MeasurementSource, SourceError};
use crate::domain::historical::AppliedFilters;
use crate::domain::measurement::{Parameter, RawSample, TimeRange};
use crate::infrastructure::config::InfluxSettings;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;

const TAG_CONTROLLER: &str = "controller_id";
const TAG_SENSOR: &str = "sensor_id";
const TAG_ZONE: &str = "zone";

#[derive(Debug, Clone)]
pub struct InfluxRepository {
    client: reqwest::Client,
    host: String,
    token: String,
    database: String,
    retention_policy: String,
    measurement: String,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResponse {
    #[serde(default)]
    results: Vec<InfluxQLResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLResult {
    #[serde(default)]
    series: Option<Vec<InfluxQLSeries>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InfluxQLSeries {
    columns: Vec<String>,
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    tags: Option<HashMap<String, String>>,
}

impl InfluxRepository {
    pub fn new(settings: &InfluxSettings) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            client,
            host: settings.host.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
            database: settings.database.clone(),
            retention_policy: settings.retention_policy.clone(),
            measurement: settings.measurement.clone(),
        })
    }

    fn build_query_url(&self, query: &str) -> String {
        format!(
            "{}/query?db={}&rp={}&epoch=ms&q={}",
            self.host,
            urlencoding::encode(&self.database),
            urlencoding::encode(&self.retention_policy),
            urlencoding::encode(query)
        )
    }

    async fn execute_query(&self, query: &str) -> Result<InfluxQLResponse, SourceError> {
        tracing::debug!(query, "Executing InfluxQL query");

        let response = self
            .client
            .get(self.build_query_url(query))
            .header("Authorization", format!("Token {}", self.token))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, %body, "InfluxDB query failed");
            return Err(SourceError::Rejected(format!("status {status}: {body}")));
        }

        let data = response
            .json::<InfluxQLResponse>()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        if let Some(error) = data
            .error
            .as_ref()
            .or_else(|| data.results.iter().find_map(|r| r.error.as_ref()))
        {
            return Err(SourceError::Rejected(error.clone()));
        }

        Ok(data)
    }

    fn select_clause(&self, fields: &[Parameter]) -> String {
        let columns: Vec<String> = fields
            .iter()
            .map(|p| quote_ident(p.as_str()))
            .chain([TAG_CONTROLLER, TAG_SENSOR, TAG_ZONE].map(quote_ident))
            .collect();
        format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_ident(&self.measurement)
        )
    }

    fn fetch_query(
        &self,
        controller_id: &str,
        parameter: Parameter,
        range: TimeRange,
        limit: Option<usize>,
    ) -> String {
        let mut query = format!(
            "{} WHERE {} = {} AND {} ORDER BY time ASC",
            self.select_clause(&[parameter]),
            quote_ident(TAG_CONTROLLER),
            quote_literal(controller_id),
            time_condition(range)
        );
        if let Some(limit) = limit {
            query.push_str(&format!(" LIMIT {limit}"));
        }
        query
    }

    fn latest_query(&self, controller_id: &str, max_age: Duration) -> String {
        format!(
            "{} WHERE {} = {} AND time >= now() - {}s ORDER BY time DESC LIMIT 1",
            self.select_clause(&Parameter::ALL),
            quote_ident(TAG_CONTROLLER),
            quote_literal(controller_id),
            max_age.num_seconds().max(1)
        )
    }

    fn scan_query(&self, filters: &AppliedFilters) -> String {
        let fields = match filters.parameter {
            Some(parameter) => vec![parameter],
            None => Parameter::ALL.to_vec(),
        };

        let mut conditions = Vec::new();
        for (tag, wanted) in [
            (TAG_CONTROLLER, &filters.controller_id),
            (TAG_SENSOR, &filters.sensor_id),
            (TAG_ZONE, &filters.zone),
        ] {
            if let Some(value) = wanted {
                conditions.push(format!("{} = {}", quote_ident(tag), quote_literal(value)));
            }
        }
        conditions.push(time_condition(filters.range()));

        format!(
            "{} WHERE {} ORDER BY time ASC LIMIT {}",
            self.select_clause(&fields),
            conditions.join(" AND "),
            filters.limit
        )
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn time_condition(range: TimeRange) -> String {
    format!(
        "time >= '{}' AND time < '{}'",
        range.start.to_rfc3339_opts(SecondsFormat::Millis, true),
        range.end.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(ms) => DateTime::from_timestamp_millis(ms.as_i64()?),
        serde_json::Value::String(text) => DateTime::parse_from_rfc3339(text)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

/// Explode every row into one sample per non-null parameter column, ascending by time.
fn samples_from_response(response: InfluxQLResponse) -> Result<Vec<RawSample>, SourceError> {
    let mut samples = Vec::new();

    for series in response.results.into_iter().flat_map(|r| r.series.unwrap_or_default()) {
        let column = |name: &str| series.columns.iter().position(|c| c == name);
        let time_idx = column("time")
            .ok_or_else(|| SourceError::Malformed("series without a time column".to_string()))?;
        let fields: Vec<(usize, Parameter)> = Parameter::ALL
            .iter()
            .filter_map(|p| column(p.as_str()).map(|idx| (idx, *p)))
            .collect();
        let (controller_idx, sensor_idx, zone_idx) =
            (column(TAG_CONTROLLER), column(TAG_SENSOR), column(TAG_ZONE));
        let group_tags = series.tags.clone().unwrap_or_default();

        let tag = |row: &[serde_json::Value], idx: Option<usize>, name: &str| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| group_tags.get(name).cloned())
        };

        for row in &series.values {
            let timestamp = row
                .get(time_idx)
                .and_then(parse_timestamp)
                .ok_or_else(|| SourceError::Malformed(format!("unreadable time in row {row:?}")))?;
            let Some(controller_id) = tag(row, controller_idx, TAG_CONTROLLER) else {
                tracing::warn!(%timestamp, "Skipping row without controller_id");
                continue;
            };
            let sensor_id = tag(row, sensor_idx, TAG_SENSOR);
            let zone = tag(row, zone_idx, TAG_ZONE);

            for (idx, parameter) in &fields {
                let Some(value) = row.get(*idx).and_then(|v| v.as_f64()) else {
                    continue;
                };
                let mut sample = RawSample::new(controller_id.as_str(), *parameter, timestamp, value);
                if let Some(sensor_id) = &sensor_id {
                    sample = sample.with_sensor(sensor_id.as_str());
                }
                if let Some(zone) = &zone {
                    sample = sample.with_zone(zone.as_str());
                }
                samples.push(sample);
            }
        }
    }

    samples.sort_by_key(|s| s.timestamp);
    Ok(samples)
}

#[async_trait]
impl MeasurementSource for InfluxRepository {
    async fn fetch(
        &self,
        controller_id: &str,
        parameter: Parameter,
        range: TimeRange,
        limit: Option<usize>,
    ) -> Result<Vec<RawSample>, SourceError> {
        let query = self.fetch_query(controller_id, parameter, range, limit);
        let samples = samples_from_response(self.execute_query(&query).await?)?;
        tracing::debug!(controller_id, %parameter, count = samples.len(), "Fetched samples");
        Ok(samples)
    }

    async fn fetch_latest(
        &self,
        controller_id: &str,
        max_age: Duration,
    ) -> Result<Option<RawSample>, SourceError> {
        let query = self.latest_query(controller_id, max_age);
        let samples = samples_from_response(self.execute_query(&query).await?)?;
        Ok(samples.into_iter().next())
    }

    async fn scan(&self, filters: &AppliedFilters) -> Result<Vec<RawSample>, SourceError> {
        let query = self.scan_query(filters);
        samples_from_response(self.execute_query(&query).await?)
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        let response = self
            .client
            .get(format!("{}/ping", self.host))
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SourceError::Rejected(format!("ping returned {}", response.status())))
        }
    }
}
