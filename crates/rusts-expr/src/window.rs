//! Fixed-size windowed running mean
//!
//! A circular buffer over the most recent `capacity` samples with an
//! incrementally maintained sum, so each push and each mean is O(1).

use crate::error::WindowError;

/// Running mean over the last `capacity` pushed samples.
#[derive(Debug, Clone)]
pub struct WindowedMean {
    data: Vec<f64>,
    head: usize,
    pushes: usize,
    sum: f64,
}

impl WindowedMean {
    /// Create an empty window holding up to `capacity` samples
    pub fn new(capacity: usize) -> Result<Self, WindowError> {
        if capacity == 0 {
            return Err(WindowError::ZeroCapacity);
        }
        Ok(Self {
            data: vec![0.0; capacity],
            head: 0,
            pushes: 0,
            sum: 0.0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Push a sample, evicting the oldest once the window is full
    pub fn push(&mut self, value: f64) {
        let evicted = std::mem::replace(&mut self.data[self.head], value);
        self.head = (self.head + 1) % self.data.len();
        self.sum += value - evicted;
        self.pushes = self.pushes.saturating_add(1);
    }

    /// Number of valid samples currently in the window
    pub fn len(&self) -> usize {
        // Unfilled slots are zero, so the sum stays correct during startup.
        self.pushes.min(self.data.len())
    }

    pub fn is_empty(&self) -> bool {
        self.pushes == 0
    }

    /// Mean of the samples currently in the window
    pub fn mean(&self) -> Result<f64, WindowError> {
        if self.is_empty() {
            return Err(WindowError::Empty);
        }
        Ok(self.sum / self.len() as f64)
    }
}
