//! Synthetic authorization graphs and the benchmarks that run against them.
//!
//! The crate generates a Zanzibar-style permission graph (users, resources,
//! groups and the edges between them), exports it as CSV or JSON, bulk-loads
//! it into a [`store::GraphStore`], measures load and query latency, and
//! compares results across runs.

#![warn(missing_docs)]

pub mod bench;
pub mod compare;
pub mod config;
pub mod error;
pub mod export;
pub mod generator;
pub mod logging;
pub mod stats;
pub mod store;

pub use error::{BenchError, Result};
