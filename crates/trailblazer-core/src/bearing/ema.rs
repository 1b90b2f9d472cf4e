//! Exponential smoothing of a bearing across the 0°/360° seam

use super::circular::{normalize, wrap_signed};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingEma {
    alpha: f64,
    value: Option<f64>,
}

impl BearingEma {
    /// `alpha` is clamped to `(0, 1]`; 1 means no smoothing
    pub fn new(alpha: f64) -> Self {
        Self {
            alpha: alpha.clamp(f64::EPSILON, 1.0),
            value: None,
        }
    }

    /// Start from a known bearing instead of the first update
    pub fn seeded(alpha: f64, initial: f64) -> Self {
        Self {
            value: Some(normalize(initial)),
            ..Self::new(alpha)
        }
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Signed deviation of `sample` from the current value, in `(-180, 180]`
    pub fn deviation(&self, sample: f64) -> Option<f64> {
        self.value.map(|v| wrap_signed(sample - v))
    }

    /// `ema += alpha * wrap(sample - ema)`; the first update adopts the sample
    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            None => normalize(sample),
            Some(v) => normalize(v + self.alpha * wrap_signed(sample - v)),
        };
        self.value = Some(next);
        next
    }
}
