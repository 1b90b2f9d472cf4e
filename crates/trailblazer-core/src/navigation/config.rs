//! Navigation tuning parameters
//!
//! Durations are stored as seconds so configuration files stay readable;
//! the accessors hand out `Duration`s.

use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters of the navigation session loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// Length of the bearing sampling window taken every cycle
    pub sample_window_secs: f64,
    /// Pause between beacon polls inside a sampling window
    pub sample_poll_secs: f64,
    /// Pause between control cycles
    pub cycle_pause_secs: f64,
    /// EMA smoothing factor
    pub ema_alpha: f64,
    /// Spread at or below which a bearing counts as highly stable
    pub stable_std_deg: f64,
    /// Spread above which the cycle is skipped and the bearing re-sampled
    pub relock_std_deg: f64,
    /// Deviation from the smoothed bearing that ends the session
    pub abort_angle_deg: f64,
    /// Consecutive empty cycles tolerated before the session is abandoned
    pub miss_tolerance: u32,
    /// Hard ceiling on the whole session
    pub session_ceiling_secs: f64,
    /// Distance in pixels between the press point and the drag target
    pub drag_distance: f64,
    pub min_hold_secs: f64,
    pub max_hold_secs: f64,
    /// Cap applied to fixed-duration drags
    pub fixed_hold_cap_secs: f64,
    pub feedback: FeedbackConfig,
}

/// Parameters of the dynamic feedback drag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub enabled: bool,
    pub max_hold_secs: f64,
    pub interval_secs: f64,
    /// Continuous absence tolerated before a held drag is released
    pub miss_tolerance_secs: f64,
    pub angle_tolerance_deg: f64,
    /// Consecutive out-of-tolerance samples needed to confirm a direction change
    pub confirm_samples: u32,
    /// Smallest in-tolerance shift worth a micro-correction
    pub correction_min_deg: f64,
    pub max_corrections: u32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            sample_window_secs: 0.25,
            sample_poll_secs: 0.05,
            cycle_pause_secs: 0.05,
            ema_alpha: 0.35,
            stable_std_deg: 10.0,
            relock_std_deg: 25.0,
            abort_angle_deg: 60.0,
            miss_tolerance: 4,
            session_ceiling_secs: 6.0,
            drag_distance: 180.0,
            min_hold_secs: 0.12,
            max_hold_secs: 0.6,
            fixed_hold_cap_secs: 0.35,
            feedback: FeedbackConfig::default(),
        }
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_hold_secs: 1.5,
            interval_secs: 0.1,
            miss_tolerance_secs: 0.35,
            angle_tolerance_deg: 30.0,
            confirm_samples: 3,
            correction_min_deg: 8.0,
            max_corrections: 2,
        }
    }
}

impl NavigationConfig {
    /// Conservative profile: fixed drags only
    pub fn fixed_only() -> Self {
        Self {
            feedback: FeedbackConfig {
                enabled: false,
                ..FeedbackConfig::default()
            },
            ..Default::default()
        }
    }

    pub fn sample_window(&self) -> Duration {
        secs(self.sample_window_secs)
    }

    pub fn sample_poll(&self) -> Duration {
        secs(self.sample_poll_secs)
    }

    pub fn cycle_pause(&self) -> Duration {
        secs(self.cycle_pause_secs)
    }

    pub fn session_ceiling(&self) -> Duration {
        secs(self.session_ceiling_secs)
    }

    pub fn min_hold(&self) -> Duration {
        secs(self.min_hold_secs)
    }

    pub fn max_hold(&self) -> Duration {
        secs(self.max_hold_secs)
    }

    pub fn fixed_hold_cap(&self) -> Duration {
        secs(self.fixed_hold_cap_secs)
    }

    pub fn validate(&self) -> crate::Result<()> {
        ensure!(
            self.ema_alpha > 0.0 && self.ema_alpha <= 1.0,
            "ema_alpha must be in (0, 1], got {}",
            self.ema_alpha
        );
        ensure!(
            self.stable_std_deg < self.relock_std_deg,
            "stable_std_deg ({}) must be below relock_std_deg ({})",
            self.stable_std_deg,
            self.relock_std_deg
        );
        ensure!(
            self.min_hold_secs <= self.max_hold_secs,
            "min_hold_secs exceeds max_hold_secs"
        );
        ensure!(self.drag_distance > 0.0, "drag_distance must be positive");
        for (name, value) in [
            ("sample_window_secs", self.sample_window_secs),
            ("sample_poll_secs", self.sample_poll_secs),
            ("cycle_pause_secs", self.cycle_pause_secs),
            ("session_ceiling_secs", self.session_ceiling_secs),
            ("min_hold_secs", self.min_hold_secs),
            ("fixed_hold_cap_secs", self.fixed_hold_cap_secs),
        ] {
            ensure!(value.is_finite() && value >= 0.0, "{name} must be a non-negative number");
        }
        self.feedback.validate()
    }
}

impl FeedbackConfig {
    pub fn max_hold(&self) -> Duration {
        secs(self.max_hold_secs)
    }

    pub fn interval(&self) -> Duration {
        secs(self.interval_secs)
    }

    pub fn miss_tolerance(&self) -> Duration {
        secs(self.miss_tolerance_secs)
    }

    pub fn validate(&self) -> crate::Result<()> {
        ensure!(self.interval_secs > 0.0, "feedback interval must be positive");
        ensure!(self.confirm_samples >= 1, "feedback confirm_samples must be at least 1");
        ensure!(
            self.correction_min_deg <= self.angle_tolerance_deg,
            "correction_min_deg must not exceed angle_tolerance_deg"
        );
        Ok(())
    }
}

/// Seconds to `Duration`, treating negative or non-finite input as zero
pub fn secs(value: f64) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::from_secs_f64(value)
    } else {
        Duration::ZERO
    }
}
