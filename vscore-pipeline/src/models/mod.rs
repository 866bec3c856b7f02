//! Data models for vscore-pipeline
//!
//! - [`refresh`]: the structured outcome of one refresh run
//! - [`snapshot`]: the immutable model artifact written by each run

pub mod refresh;
pub mod snapshot;

pub use refresh::{ClusterMetrics, Diagnostics, FailedBatch, RefreshResult, RefreshStatus};
pub use snapshot::{ClusterLabel, ModelSnapshot};
