//! HTTP API handlers for breathe-rv

pub mod health;
pub mod reports;
pub mod uploads;

pub use health::health_routes;
pub use reports::report_routes;
pub use uploads::upload_routes;
