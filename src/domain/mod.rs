// Domain layer - Pure types and agronomic formulas
pub mod analytics;
pub mod formulas;
pub mod historical;
pub mod interval;
pub mod measurement;
pub mod metric;
pub mod statistics;
