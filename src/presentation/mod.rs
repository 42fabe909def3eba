// Presentation layer - HTTP surface
pub mod app_state;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
