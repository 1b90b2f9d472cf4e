//! Circular statistics for bearing samples
//!
//! Each bearing is treated as a unit vector `(sin θ, cos θ)`. The mean is the
//! direction of the vector sum, the resultant length `R` is its magnitude over
//! the sample count, and the angular spread is `sqrt(-2 ln R)`.

use serde::{Deserialize, Serialize};

/// Vector sums at or below this magnitude (per sample) have no direction
const ZERO_RESULTANT_EPS: f64 = 1e-9;

/// Lower and upper clamp applied to `R` before taking the logarithm
const R_FLOOR: f64 = 1e-6;
const R_CEIL: f64 = 0.999_999;

/// Summary of a non-empty set of bearings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CircularSummary {
    /// Mean bearing in `[0, 360)`, `None` when the samples cancel out exactly
    pub mean: Option<f64>,
    /// Resultant length, 1 = identical samples, towards 0 = scattered
    pub resultant_length: f64,
    /// Angular standard deviation in degrees
    pub std_dev: f64,
    pub count: usize,
}

impl CircularSummary {
    /// True when a mean exists and the spread does not exceed `max_std`
    pub fn is_stable(&self, max_std: f64) -> bool {
        self.mean.is_some() && self.std_dev <= max_std
    }
}

/// Summarize bearings given in degrees; `None` for an empty set
pub fn summarize(samples: &[f64]) -> Option<CircularSummary> {
    let mut acc = CircularAccumulator::default();
    for &deg in samples {
        acc.push(deg);
    }
    acc.summary()
}

/// Running vector sum, so callers can ask for the spread after every sample
#[derive(Debug, Clone, Copy, Default)]
pub struct CircularAccumulator {
    sum_x: f64,
    sum_y: f64,
    count: usize,
}

impl CircularAccumulator {
    pub fn push(&mut self, degrees: f64) {
        let rad = degrees.to_radians();
        self.sum_x += rad.sin();
        self.sum_y += rad.cos();
        self.count += 1;
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn summary(&self) -> Option<CircularSummary> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let magnitude = self.sum_x.hypot(self.sum_y);

        let mean = if magnitude <= ZERO_RESULTANT_EPS * n {
            None
        } else {
            Some(normalize(self.sum_x.atan2(self.sum_y).to_degrees()))
        };

        let r = (magnitude / n).clamp(R_FLOOR, 1.0);
        let std_dev = (-2.0 * r.min(R_CEIL).ln()).sqrt().to_degrees();

        Some(CircularSummary {
            mean,
            resultant_length: r,
            std_dev,
            count: self.count,
        })
    }
}

/// Map any angle into `[0, 360)`
pub fn normalize(degrees: f64) -> f64 {
    let d = degrees.rem_euclid(360.0);
    // rem_euclid of a tiny negative value rounds up to exactly 360.0
    if d >= 360.0 { 0.0 } else { d }
}

/// Map a signed difference into `(-180, 180]`
pub fn wrap_signed(degrees: f64) -> f64 {
    let d = normalize(degrees);
    if d > 180.0 { d - 360.0 } else { d }
}

/// Smallest absolute angle between two bearings, in `[0, 180]`
pub fn angular_distance(a: f64, b: f64) -> f64 {
    wrap_signed(a - b).abs()
}
