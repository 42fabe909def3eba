// Application layer - Use cases over the measurement source port
pub mod error;
pub mod historical_service;
pub mod measurement_source;
pub mod metric_service;
pub mod report_service;
#[cfg(test)]
pub mod testing;
pub mod trend_service;
