//! HTTP API handlers for vscore-report

pub mod dashboard;
pub mod health;
pub mod households;
pub mod vulnerability;

pub use dashboard::dashboard_routes;
pub use health::health_routes;
pub use households::household_routes;
pub use vulnerability::vulnerability_routes;
