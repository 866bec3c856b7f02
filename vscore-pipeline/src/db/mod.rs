//! Database access for vscore-pipeline
//!
//! Schema creation lives in `vscore_common::db`; this module holds the
//! pipeline's own queries.

pub mod results;
pub mod settings;
pub mod snapshots;
pub mod source;

pub use results::{discard_shadow, prepare_shadow, swap_shadow, write_shadow, ShadowWrite};
pub use settings::PipelineSettings;
pub use snapshots::{load_current_snapshot, prune_snapshots};
pub use source::load_households;
