//! Closed-loop navigation session

use super::drag::DragExecutor;
use crate::config::EngineConfig;
use crate::perception::Perception;
use crate::providers::{Clock, InputDriver};
use crate::sampler::{sample_window, BearingLock};
use crate::session::SessionControls;
use crate::status::StatusSink;
use crate::Result;
use serde::Serialize;
use std::time::Duration;
use trailblazer_core::navigation::{Decision, DragStrategy, EndReason, Observation};
use trailblazer_core::{Compass, NavigationState, ScreenPoint};

/// Summary of one navigation session
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SessionReport {
    pub end_reason: EndReason,
    pub drags: u32,
    pub cycles: u32,
    /// Smoothed bearing when the session ended
    pub final_bearing: Option<f64>,
    pub elapsed: Duration,
}

/// Turns noisy bearing samples into drags until the session ends
pub struct NavigationController<'a> {
    perception: &'a dyn Perception,
    input: &'a dyn InputDriver,
    clock: &'a dyn Clock,
    controls: &'a SessionControls,
    status: &'a StatusSink,
    config: &'a EngineConfig,
}

impl<'a> NavigationController<'a> {
    pub fn new(
        perception: &'a dyn Perception,
        input: &'a dyn InputDriver,
        clock: &'a dyn Clock,
        controls: &'a SessionControls,
        status: &'a StatusSink,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            perception,
            input,
            clock,
            controls,
            status,
            config,
        }
    }

    /// Observe one cycle's evidence around the avatar, updating `center`
    fn observe(&self, center: &mut ScreenPoint) -> Observation {
        let nav = &self.config.navigation;
        match self.perception.locate_avatar() {
            Ok(Some(fix)) => {
                *center = fix.center;
                match sample_window(
                    self.perception,
                    self.clock,
                    self.controls,
                    fix.center,
                    nav.sample_window(),
                    nav.sample_poll(),
                ) {
                    Some(summary) => Observation::Beacon(summary),
                    None => Observation::NoBeacon,
                }
            }
            Ok(None) => Observation::AvatarLost,
            Err(e) => {
                tracing::debug!("avatar lookup failed: {e:#}");
                Observation::AvatarLost
            }
        }
    }

    /// Run a session starting from `lock`, with the avatar at `avatar`.
    ///
    /// Errors only come from the input driver; the button is released
    /// before they propagate.
    pub fn run(&self, lock: &BearingLock, avatar: ScreenPoint) -> Result<SessionReport> {
        let nav = &self.config.navigation;
        let mut state = NavigationState::begin(lock.mean, self.clock.now(), nav);
        let mut center = avatar;
        let drag = DragExecutor {
            input: self.input,
            clock: self.clock,
            controls: self.controls,
            screen: self.perception.screen_size(),
            button: self.config.input.drag_button,
            distance: nav.drag_distance,
        };

        let end_reason = loop {
            if self.controls.is_stopped() {
                state.cancel();
                break EndReason::Cancelled;
            }
            if let Some(reason) = state.expire(self.clock.now(), nav) {
                break reason;
            }

            let obs = self.observe(&mut center);
            match state.observe(obs, self.clock.now(), nav) {
                Decision::Resample => {
                    tracing::debug!(phase = ?state.phase(), misses = state.misses(), "resampling");
                }
                Decision::End(reason) => break reason,
                Decision::Drag(plan) => {
                    tracing::debug!(
                        bearing = plan.bearing,
                        spread = plan.spread,
                        hold_ms = plan.hold.as_millis() as u64,
                        strategy = ?plan.strategy,
                        "drag"
                    );
                    let released = match plan.strategy {
                        DragStrategy::Fixed => drag.fixed(center, plan.bearing, plan.hold)?,
                        DragStrategy::Feedback => drag.with_feedback(
                            self.perception,
                            center,
                            plan.bearing,
                            plan.hold,
                            &nav.feedback,
                        )?,
                    };
                    state.drag_finished(released);
                    if let Some(reason) = state.end_reason() {
                        break reason;
                    }
                }
            }
            self.clock.sleep(nav.cycle_pause());
        };

        let report = SessionReport {
            end_reason,
            drags: state.drags(),
            cycles: state.cycles(),
            final_bearing: state.smoothed(),
            elapsed: state.elapsed(self.clock.now()),
        };
        match report.final_bearing {
            Some(b) => self.status.log(format!(
                "Navigation ended ({:?}) after {} drags, heading {b:.1}° ({})",
                report.end_reason,
                report.drags,
                Compass::from_bearing(b)
            )),
            None => self.status.log(format!(
                "Navigation ended ({:?}) after {} drags",
                report.end_reason, report.drags
            )),
        }
        Ok(report)
    }
}
