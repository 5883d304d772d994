//! Parallel evaluation configuration.
//!
//! Per-series transforms have no cross-series dependency, so a function call
//! that resolved many input series can transform them on rayon. This module
//! decides when that is worth it and how many threads to use.

use serde::{Deserialize, Serialize};

/// Configuration for parallel series evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Minimum number of input series before a transform runs in parallel.
    /// Default: 4
    pub series_threshold: usize,

    /// Number of threads in a dedicated evaluation pool.
    /// Set to 0 to run on the global rayon pool.
    /// Default: 0
    pub thread_pool_size: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            series_threshold: 4,
            thread_pool_size: 0,
        }
    }
}

impl ParallelConfig {
    /// Creates a new ParallelConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if a transform over `series_count` series should run in parallel.
    pub fn should_parallelize_series(&self, series_count: usize) -> bool {
        series_count >= self.series_threshold
    }

    /// Returns true if a dedicated thread pool was requested.
    pub fn uses_dedicated_pool(&self) -> bool {
        self.thread_pool_size != 0
    }

    /// Creates a configuration that disables all parallelism.
    pub fn sequential() -> Self {
        Self {
            series_threshold: usize::MAX,
            thread_pool_size: 0,
        }
    }

    /// Builder method to set series threshold.
    pub fn with_series_threshold(mut self, threshold: usize) -> Self {
        self.series_threshold = threshold;
        self
    }

    /// Builder method to set thread pool size.
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = size;
        self
    }
}
