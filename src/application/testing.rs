// In-memory measurement source for service tests
use crate::application::measurement_source::{MeasurementSource, SourceError};
use crate::domain::historical::AppliedFilters;
use crate::domain::measurement::{Parameter, RawSample, TimeRange};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct InMemorySource {
    samples: Vec<RawSample>,
    unavailable: bool,
    delays: HashMap<String, std::time::Duration>,
    fetch_calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

/// Counts a call as in flight until dropped, including when a timeout cancels it.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl InMemorySource {
    pub fn with_samples(mut samples: Vec<RawSample>) -> Self {
        samples.sort_by_key(|s| s.timestamp);
        Self {
            samples,
            ..Self::default()
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Every fetch for `controller_id` sleeps before answering.
    pub fn delayed(mut self, controller_id: &str, delay: std::time::Duration) -> Self {
        self.delays.insert(controller_id.to_string(), delay);
        self
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Highest number of source calls observed running at the same time.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self, controller_id: Option<&str>) -> Result<(), SourceError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(running, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);
        if let Some(delay) = controller_id.and_then(|c| self.delays.get(c)) {
            tokio::time::sleep(*delay).await;
        }
        if self.unavailable {
            return Err(SourceError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl MeasurementSource for InMemorySource {
    async fn fetch(
        &self,
        controller_id: &str,
        parameter: Parameter,
        range: TimeRange,
        limit: Option<usize>,
    ) -> Result<Vec<RawSample>, SourceError> {
        self.enter(Some(controller_id)).await?;
        Ok(self
            .samples
            .iter()
            .filter(|s| {
                s.controller_id == controller_id
                    && s.parameter == parameter
                    && range.contains(s.timestamp)
            })
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn fetch_latest(
        &self,
        controller_id: &str,
        max_age: Duration,
    ) -> Result<Option<RawSample>, SourceError> {
        self.enter(Some(controller_id)).await?;
        let cutoff = Utc::now() - max_age;
        Ok(self
            .samples
            .iter()
            .rev()
            .find(|s| s.controller_id == controller_id && s.timestamp >= cutoff)
            .cloned())
    }

    async fn scan(&self, filters: &AppliedFilters) -> Result<Vec<RawSample>, SourceError> {
        self.enter(filters.controller_id.as_deref()).await?;
        Ok(self
            .samples
            .iter()
            .filter(|s| filters.matches(s))
            .take(filters.limit)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<(), SourceError> {
        if self.unavailable {
            return Err(SourceError::Unavailable("connection refused".to_string()));
        }
        Ok(())
    }
}

/// `count` hourly readings starting at `start`, valued by index.
pub fn hourly(
    controller_id: &str,
    parameter: Parameter,
    start: DateTime<Utc>,
    count: usize,
    value: impl Fn(usize) -> f64,
) -> Vec<RawSample> {
    (0..count)
        .map(|i| {
            RawSample::new(
                controller_id,
                parameter,
                start + Duration::hours(i as i64),
                value(i),
            )
        })
        .collect()
}
