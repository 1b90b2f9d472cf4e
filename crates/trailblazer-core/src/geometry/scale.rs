//! Linear scale sweeps for template search

use anyhow::ensure;
use serde::{Deserialize, Serialize};

/// `steps` scale factors evenly spaced over `[min, max]`, both ends included
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleRange {
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl ScaleRange {
    pub fn new(min: f64, max: f64, steps: usize) -> crate::Result<Self> {
        let range = Self { min, max, steps };
        range.validate()?;
        Ok(range)
    }

    /// A sweep containing only the native template size
    pub const fn unit() -> Self {
        Self {
            min: 1.0,
            max: 1.0,
            steps: 1,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        ensure!(
            self.min.is_finite() && self.max.is_finite() && self.min > 0.0,
            "scale bounds must be positive and finite, got ({}, {})",
            self.min,
            self.max
        );
        ensure!(
            self.min <= self.max,
            "scale min {} exceeds max {}",
            self.min,
            self.max
        );
        ensure!(self.steps >= 1, "scale sweep needs at least one step");
        Ok(())
    }

    /// Scale factor at step `i`
    pub fn at(&self, i: usize) -> f64 {
        if self.steps <= 1 {
            return self.min;
        }
        self.min + (self.max - self.min) * i as f64 / (self.steps - 1) as f64
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        (0..self.steps.max(1)).map(move |i| self.at(i))
    }

    pub fn to_vec(&self) -> Vec<f64> {
        self.iter().collect()
    }
}

impl Default for ScaleRange {
    fn default() -> Self {
        Self {
            min: 0.8,
            max: 1.2,
            steps: 7,
        }
    }
}
