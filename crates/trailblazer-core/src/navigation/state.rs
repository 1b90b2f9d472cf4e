//! Navigation session state machine
//!
//! `NavigationState` holds no clocks and performs no I/O. The controller feeds
//! it one `Observation` per control cycle and executes the returned `Decision`.

use super::config::NavigationConfig;
use super::feedback::ReleaseReason;
use super::hold::hold_for_spread;
use crate::bearing::{BearingEma, CircularSummary};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EndReason {
    /// Miss tolerance exhausted: the beacon (or avatar) is gone
    BeaconGone,
    /// The observed bearing jumped away from the smoothed one
    BearingJump { smoothed: f64, observed: f64 },
    /// Session ceiling reached
    TimeBudget,
    /// Stop requested by the host
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum NavigationPhase {
    /// No avatar fix this cycle
    Searching,
    /// A usable smoothed bearing exists
    Locked,
    /// A drag is in flight
    Dragging,
    /// The last sample was empty or too noisy to act on
    Relocking,
    Aborted(EndReason),
    Completed(EndReason),
}

impl NavigationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NavigationPhase::Aborted(_) | NavigationPhase::Completed(_))
    }
}

/// Evidence gathered in one control cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    AvatarLost,
    NoBeacon,
    Beacon(CircularSummary),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragStrategy {
    /// Press, move, hold for a computed time, release
    Fixed,
    /// Press and keep re-sampling the beacon while holding
    Feedback,
}

/// A drag the controller should perform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragPlan {
    pub bearing: f64,
    pub hold: Duration,
    pub strategy: DragStrategy,
    /// Spread of the sample window that produced this plan
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    /// Skip acting this cycle and sample again
    Resample,
    Drag(DragPlan),
    End(EndReason),
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    phase: NavigationPhase,
    ema: BearingEma,
    misses: u32,
    started_at: Duration,
    cycles: u32,
    drags: u32,
}

impl NavigationState {
    /// Begin a session from an already stable bearing
    pub fn begin(initial_bearing: f64, started_at: Duration, cfg: &NavigationConfig) -> Self {
        Self {
            phase: NavigationPhase::Locked,
            ema: BearingEma::seeded(cfg.ema_alpha, initial_bearing),
            misses: 0,
            started_at,
            cycles: 0,
            drags: 0,
        }
    }

    pub fn phase(&self) -> NavigationPhase {
        self.phase
    }

    pub fn smoothed(&self) -> Option<f64> {
        self.ema.value()
    }

    pub fn misses(&self) -> u32 {
        self.misses
    }

    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn drags(&self) -> u32 {
        self.drags
    }

    pub fn started_at(&self) -> Duration {
        self.started_at
    }

    pub fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    pub fn is_finished(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn end_reason(&self) -> Option<EndReason> {
        match self.phase {
            NavigationPhase::Aborted(r) | NavigationPhase::Completed(r) => Some(r),
            _ => None,
        }
    }

    /// Consume one cycle of evidence observed at `now`
    pub fn observe(&mut self, obs: Observation, now: Duration, cfg: &NavigationConfig) -> Decision {
        if let Some(reason) = self.end_reason() {
            return Decision::End(reason);
        }
        self.cycles += 1;

        let remaining = cfg.session_ceiling().saturating_sub(self.elapsed(now));
        if remaining.is_zero() {
            return self.finish(EndReason::TimeBudget);
        }

        let summary = match obs {
            Observation::AvatarLost | Observation::NoBeacon => {
                self.misses += 1;
                if self.misses > cfg.miss_tolerance {
                    return self.finish(EndReason::BeaconGone);
                }
                self.phase = if obs == Observation::AvatarLost {
                    NavigationPhase::Searching
                } else {
                    NavigationPhase::Relocking
                };
                return Decision::Resample;
            }
            Observation::Beacon(summary) => summary,
        };

        // The beacon is visible, even if the window was noisy
        self.misses = 0;
        let Some(mean) = summary.mean else {
            self.phase = NavigationPhase::Relocking;
            return Decision::Resample;
        };
        if summary.std_dev > cfg.relock_std_deg {
            self.phase = NavigationPhase::Relocking;
            return Decision::Resample;
        }

        if let Some(deviation) = self.ema.deviation(mean) {
            if deviation.abs() > cfg.abort_angle_deg {
                let smoothed = self.ema.value().unwrap_or(mean);
                return self.finish(EndReason::BearingJump {
                    smoothed,
                    observed: mean,
                });
            }
        }
        let bearing = self.ema.update(mean);

        let feedback = cfg.feedback.enabled && summary.std_dev <= cfg.stable_std_deg;
        let plan = if feedback {
            DragPlan {
                bearing,
                hold: cfg.feedback.max_hold().min(remaining),
                strategy: DragStrategy::Feedback,
                spread: summary.std_dev,
            }
        } else {
            DragPlan {
                bearing,
                hold: hold_for_spread(summary.std_dev, cfg)
                    .min(cfg.fixed_hold_cap())
                    .min(remaining),
                strategy: DragStrategy::Fixed,
                spread: summary.std_dev,
            }
        };

        self.phase = NavigationPhase::Dragging;
        self.drags += 1;
        Decision::Drag(plan)
    }

    /// End the session once the ceiling is reached, without waiting for another observation
    pub fn expire(&mut self, now: Duration, cfg: &NavigationConfig) -> Option<EndReason> {
        if self.is_finished() || self.elapsed(now) < cfg.session_ceiling() {
            return None;
        }
        self.finish(EndReason::TimeBudget);
        Some(EndReason::TimeBudget)
    }

    /// Record how the last drag ended
    pub fn drag_finished(&mut self, reason: ReleaseReason) {
        if self.is_finished() {
            return;
        }
        self.phase = match reason {
            ReleaseReason::HoldElapsed => NavigationPhase::Locked,
            ReleaseReason::DirectionChanged { .. } => NavigationPhase::Relocking,
            ReleaseReason::BeaconLost => {
                self.misses += 1;
                NavigationPhase::Relocking
            }
            ReleaseReason::Cancelled => NavigationPhase::Aborted(EndReason::Cancelled),
        };
    }

    /// End the session because the host asked to stop
    pub fn cancel(&mut self) -> Decision {
        self.finish(EndReason::Cancelled)
    }

    fn finish(&mut self, reason: EndReason) -> Decision {
        self.phase = match reason {
            EndReason::BeaconGone | EndReason::TimeBudget => NavigationPhase::Completed(reason),
            EndReason::BearingJump { .. } | EndReason::Cancelled => NavigationPhase::Aborted(reason),
        };
        Decision::End(reason)
    }
}
