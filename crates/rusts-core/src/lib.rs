//! RusTs Core - Core types for the series expression engine
//!
//! This crate provides the data types shared by the expression crates:
//! - `NamedSeries`: A display name, evenly sampled values and their step
//! - `SeriesMap`: Metric name to the concrete series it resolved to
//! - `Step`: Sampling interval in seconds
//! - `ParallelConfig`: Controls when per-series work is spread over rayon

pub mod error;
pub mod parallel;
pub mod types;

pub use error::{CoreError, Result};
pub use parallel::ParallelConfig;
pub use types::*;
