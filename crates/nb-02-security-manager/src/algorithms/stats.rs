//! Rolling mean and standard deviation over the last N samples.

use std::collections::VecDeque;

/// Fixed-size sample window.
#[derive(Debug, Clone)]
pub struct RollingStats {
    capacity: usize,
    samples: VecDeque<f64>,
}

impl RollingStats {
    /// Window holding at most `capacity` samples.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            samples: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Add a sample, evicting the oldest when full.
    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether the window is empty.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean, zero when empty.
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    /// Population standard deviation.
    pub fn std_dev(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .samples
            .iter()
            .map(|x| (x - mean).powi(2))
            .sum::<f64>()
            / self.samples.len() as f64;
        var.sqrt()
    }

    /// `|value - mean| / std_dev`, or `None` when the window has no spread.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        let sd = self.std_dev();
        if sd <= f64::EPSILON {
            return None;
        }
        Some((value - self.mean()).abs() / sd)
    }
}
