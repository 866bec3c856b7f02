//! HTTP API handlers for vscore-pipeline

pub mod health;
pub mod refresh;
pub mod snapshot;

pub use health::health_routes;
pub use refresh::refresh_routes;
pub use snapshot::snapshot_routes;
