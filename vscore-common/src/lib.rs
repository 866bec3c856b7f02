//! # vscore Common Library
//!
//! Shared code for the vscore services:
//! - Database initialization (upstream source tables, result table, settings, snapshots)
//! - Persisted row model for vulnerability records
//! - Severity labels and their base scores
//! - Configuration loading and root folder resolution
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod severity;

pub use error::{Error, Result};
pub use severity::Severity;
