//! Decision rules for a drag that is re-sampled while the button is held

use super::config::FeedbackConfig;
use crate::bearing::wrap_signed;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a held drag was released
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReleaseReason {
    /// The planned hold time ran out
    HoldElapsed,
    /// A direction change was confirmed by consecutive samples
    DirectionChanged { bearing: f64 },
    /// The beacon stayed undetected past the miss tolerance
    BeaconLost,
    /// Stop was requested while holding
    Cancelled,
}

/// What the drag executor should do after a feedback sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeedbackAction {
    Hold,
    /// Keep holding but move the drag target onto this bearing
    Retarget(f64),
    Release(ReleaseReason),
}

/// Tracks a held drag.
///
/// Single-frame disagreements are ignored: the beacon blinks while it
/// "breathes", and one bad contour should not end a good drag.
#[derive(Debug, Clone)]
pub struct FeedbackTracker {
    reference: f64,
    pressed_at: Duration,
    last_seen: Duration,
    max_hold: Duration,
    streak: u32,
    corrections: u32,
    cfg: FeedbackConfig,
}

impl FeedbackTracker {
    pub fn new(reference: f64, pressed_at: Duration, max_hold: Duration, cfg: &FeedbackConfig) -> Self {
        Self {
            reference,
            pressed_at,
            last_seen: pressed_at,
            max_hold,
            streak: 0,
            corrections: 0,
            cfg: cfg.clone(),
        }
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    pub fn corrections(&self) -> u32 {
        self.corrections
    }

    /// Feed one sample (or its absence) taken at `now`
    pub fn observe(&mut self, sample: Option<f64>, now: Duration) -> FeedbackAction {
        if now.saturating_sub(self.pressed_at) >= self.max_hold {
            return FeedbackAction::Release(ReleaseReason::HoldElapsed);
        }

        let Some(bearing) = sample else {
            if now.saturating_sub(self.last_seen) > self.cfg.miss_tolerance() {
                return FeedbackAction::Release(ReleaseReason::BeaconLost);
            }
            return FeedbackAction::Hold;
        };
        self.last_seen = now;

        let shift = wrap_signed(bearing - self.reference).abs();
        if shift > self.cfg.angle_tolerance_deg {
            self.streak += 1;
            if self.streak >= self.cfg.confirm_samples {
                return FeedbackAction::Release(ReleaseReason::DirectionChanged { bearing });
            }
            return FeedbackAction::Hold;
        }

        self.streak = 0;
        if shift >= self.cfg.correction_min_deg && self.corrections < self.cfg.max_corrections {
            self.corrections += 1;
            self.reference = bearing;
            return FeedbackAction::Retarget(bearing);
        }
        FeedbackAction::Hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn tracker() -> FeedbackTracker {
        let cfg = FeedbackConfig {
            miss_tolerance_secs: 0.3,
            angle_tolerance_deg: 30.0,
            confirm_samples: 3,
            correction_min_deg: 8.0,
            max_corrections: 2,
            ..Default::default()
        };
        FeedbackTracker::new(90.0, ms(0), ms(1500), &cfg)
    }

    #[test]
    fn test_single_outlier_ignored() {
        let mut t = tracker();
        assert_eq!(t.observe(Some(200.0), ms(100)), FeedbackAction::Hold);
        assert_eq!(t.observe(Some(91.0), ms(200)), FeedbackAction::Hold);
        assert_eq!(t.observe(Some(200.0), ms(300)), FeedbackAction::Hold);
        assert_eq!(t.observe(Some(200.0), ms(400)), FeedbackAction::Hold);
    }

    #[test]
    fn test_confirmed_direction_change_releases() {
        let mut t = tracker();
        assert_eq!(t.observe(Some(180.0), ms(100)), FeedbackAction::Hold);
        assert_eq!(t.observe(Some(182.0), ms(200)), FeedbackAction::Hold);
        assert_eq!(
            t.observe(Some(181.0), ms(300)),
            FeedbackAction::Release(ReleaseReason::DirectionChanged { bearing: 181.0 })
        );
    }

    #[test]
    fn test_blinking_beacon_tolerated() {
        let mut t = tracker();
        assert_eq!(t.observe(None, ms(100)), FeedbackAction::Hold);
        assert_eq!(t.observe(None, ms(250)), FeedbackAction::Hold);
        assert_eq!(t.observe(Some(90.0), ms(300)), FeedbackAction::Hold);
        assert_eq!(t.observe(None, ms(500)), FeedbackAction::Hold);
        assert_eq!(
            t.observe(None, ms(700)),
            FeedbackAction::Release(ReleaseReason::BeaconLost)
        );
    }

    #[test]
    fn test_at_most_two_corrections() {
        let mut t = tracker();
        assert_eq!(t.observe(Some(100.0), ms(100)), FeedbackAction::Retarget(100.0));
        assert_eq!(t.reference(), 100.0);
        assert_eq!(t.observe(Some(112.0), ms(200)), FeedbackAction::Retarget(112.0));
        assert_eq!(t.observe(Some(124.0), ms(300)), FeedbackAction::Hold);
        assert_eq!(t.corrections(), 2);
        assert_eq!(t.reference(), 112.0);
    }

    #[test]
    fn test_hold_elapsed() {
        let mut t = tracker();
        assert_eq!(
            t.observe(Some(90.0), ms(1500)),
            FeedbackAction::Release(ReleaseReason::HoldElapsed)
        );
    }
}
