//! Runtime layer for the performance insights dashboard.
//!
//! Owns the load-once table cache and the render pass that turns dashboard
//! selections into chart-ready outputs.

pub mod data_manager;
pub mod pipeline;

pub use perf_core as core;
pub use perf_data as data;
