// Port for raw measurement access - implemented by the storage adapter
use crate::domain::historical::AppliedFilters;
use crate::domain::measurement::{Parameter, RawSample, TimeRange};
use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// The store could not be reached (connection refused, timeout, DNS, ...)
    #[error("measurement source unavailable: {0}")]
    Unavailable(String),

    /// The store answered with an error status or error payload
    #[error("measurement source rejected the query: {0}")]
    Rejected(String),

    #[error("malformed response from measurement source: {0}")]
    Malformed(String),
}

/// Read-only access to stored sensor samples.
///
/// Every sequence is returned in ascending timestamp order; callers never re-sort.
/// A well-formed query that matches nothing yields an empty sequence, not an error.
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Readings of one parameter for one controller within `range`, capped at `limit`.
    async fn fetch(
        &self,
        controller_id: &str,
        parameter: Parameter,
        range: TimeRange,
        limit: Option<usize>,
    ) -> Result<Vec<RawSample>, SourceError>;

    /// Most recent reading of a controller no older than `max_age`.
    async fn fetch_latest(
        &self,
        controller_id: &str,
        max_age: Duration,
    ) -> Result<Option<RawSample>, SourceError>;

    /// Raw readings matching every filter, capped at `filters.limit`.
    async fn scan(&self, filters: &AppliedFilters) -> Result<Vec<RawSample>, SourceError>;

    /// Cheap connectivity check
    async fn health_check(&self) -> Result<(), SourceError>;
}
