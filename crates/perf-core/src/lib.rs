//! Shared types for the athlete performance insights workspace.
//!
//! Record models, the canonical column schema, error types, statistics
//! helpers and CLI settings used by the data and runtime crates.

pub mod error;
pub mod formatting;
pub mod models;
pub mod schema;
pub mod settings;
pub mod stats;
pub mod time_utils;

pub use error::{PerfError, Result};
