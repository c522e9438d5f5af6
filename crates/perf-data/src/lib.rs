//! Loading, filtering and aggregation of athlete performance tables.

pub mod aggregator;
pub mod analysis;
pub mod filter;
pub mod reader;
pub mod simulate;

pub use perf_core as core;
