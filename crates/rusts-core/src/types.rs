//! Core data types for the RusTs expression engine

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Sampling interval between consecutive samples, in seconds
pub type Step = i32;

/// Metric name to the concrete series it resolved to.
///
/// A single name may expand to several series (e.g. after wildcard
/// expansion by the storage layer). Owned by the caller; evaluation only
/// reads it.
pub type SeriesMap = HashMap<String, Vec<NamedSeries>>;

/// A series of evenly spaced samples plus its display name and step.
///
/// `NaN` marks a missing sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedSeries {
    pub name: String,
    pub data: Vec<f64>,
    pub step: Step,
}

impl NamedSeries {
    /// Create a new named series
    pub fn new(name: impl Into<String>, data: Vec<f64>, step: Step) -> Self {
        Self {
            name: name.into(),
            data,
            step,
        }
    }

    /// Create a single-sample series with no step, as produced for constants
    pub fn scalar(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, vec![value], 0)
    }

    /// Number of samples, including missing ones
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the series has no samples
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the only sample if the series holds exactly one
    pub fn as_scalar(&self) -> Option<f64> {
        match self.data.as_slice() {
            [v] => Some(*v),
            _ => None,
        }
    }

    /// Validate the series
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(CoreError::EmptySeriesName);
        }
        if self.step < 0 {
            return Err(CoreError::InvalidStep {
                name: self.name.clone(),
                step: self.step,
            });
        }
        Ok(())
    }
}

/// Build a [`SeriesMap`] from `(metric, series)` pairs.
///
/// Series registered under the same metric keep their insertion order.
pub fn series_map<I, K>(entries: I) -> SeriesMap
where
    I: IntoIterator<Item = (K, NamedSeries)>,
    K: Into<String>,
{
    let mut map = SeriesMap::new();
    for (metric, series) in entries {
        map.entry(metric.into()).or_default().push(series);
    }
    map
}
