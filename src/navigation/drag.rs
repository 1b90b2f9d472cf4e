//! Pointer drags along a bearing

use crate::perception::Perception;
use crate::providers::{Clock, InputDriver, MouseButton};
use crate::session::SessionControls;
use crate::Result;
use std::time::Duration;
use trailblazer_core::bearing::offset_along;
use trailblazer_core::navigation::{FeedbackAction, FeedbackConfig, FeedbackTracker, ReleaseReason};
use trailblazer_core::{ScreenPoint, ScreenSize};

/// Longest uninterrupted sleep while a fixed drag is held
const HOLD_SLICE: Duration = Duration::from_millis(50);

/// Pressed mouse button, released when dropped
pub struct PressedButton<'a> {
    input: &'a dyn InputDriver,
    button: MouseButton,
    held: bool,
}

impl<'a> PressedButton<'a> {
    pub fn press(input: &'a dyn InputDriver, button: MouseButton) -> Result<Self> {
        input.press(button)?;
        Ok(Self {
            input,
            button,
            held: true,
        })
    }

    pub fn release(mut self) -> Result<()> {
        self.held = false;
        self.input.release(self.button)
    }
}

impl Drop for PressedButton<'_> {
    fn drop(&mut self) {
        if self.held {
            if let Err(e) = self.input.release(self.button) {
                tracing::warn!("failed to release {:?}: {e:#}", self.button);
            }
        }
    }
}

/// Executes drag plans against the input driver
pub struct DragExecutor<'a> {
    pub input: &'a dyn InputDriver,
    pub clock: &'a dyn Clock,
    pub controls: &'a SessionControls,
    pub screen: ScreenSize,
    pub button: MouseButton,
    /// Pixels between the press point and the drag target
    pub distance: f64,
}

impl<'a> DragExecutor<'a> {
    /// Drag target for `bearing`, clamped to the screen
    pub fn target(&self, origin: ScreenPoint, bearing: f64) -> ScreenPoint {
        let (dx, dy) = offset_along(bearing, self.distance);
        self.screen.clamp_point(origin.translate(dx, dy))
    }

    fn press_towards(&self, origin: ScreenPoint, bearing: f64) -> Result<PressedButton<'a>> {
        self.input.move_to(origin.round())?;
        let pressed = PressedButton::press(self.input, self.button)?;
        self.input.move_to(self.target(origin, bearing).round())?;
        Ok(pressed)
    }

    /// Press, move onto the bearing, hold for `hold`, release
    pub fn fixed(&self, origin: ScreenPoint, bearing: f64, hold: Duration) -> Result<ReleaseReason> {
        let pressed = self.press_towards(origin, bearing)?;

        let start = self.clock.now();
        let reason = loop {
            if self.controls.is_stopped() {
                break ReleaseReason::Cancelled;
            }
            let held = self.clock.now().saturating_sub(start);
            if held >= hold {
                break ReleaseReason::HoldElapsed;
            }
            self.clock.sleep((hold - held).min(HOLD_SLICE));
        };

        pressed.release()?;
        Ok(reason)
    }

    /// Press and keep re-sampling the beacon while holding.
    ///
    /// The tracker decides when to retarget and when to let go.
    pub fn with_feedback(
        &self,
        perception: &dyn Perception,
        origin: ScreenPoint,
        bearing: f64,
        max_hold: Duration,
        cfg: &FeedbackConfig,
    ) -> Result<ReleaseReason> {
        let pressed = self.press_towards(origin, bearing)?;
        let pressed_at = self.clock.now();
        let mut tracker = FeedbackTracker::new(bearing, pressed_at, max_hold, cfg);

        let reason = loop {
            if self.controls.is_stopped() {
                break ReleaseReason::Cancelled;
            }
            let held = self.clock.now().saturating_sub(pressed_at);
            self.clock.sleep(cfg.interval().min(max_hold.saturating_sub(held)));

            let sample = match perception.detect_beacon(origin) {
                Ok(sample) => sample.map(|s| s.degrees),
                Err(e) => {
                    tracing::debug!("beacon poll failed during drag: {e:#}");
                    None
                }
            };
            match tracker.observe(sample, self.clock.now()) {
                FeedbackAction::Hold => {}
                FeedbackAction::Retarget(b) => {
                    tracing::debug!(bearing = b, "drag retargeted");
                    self.input.move_to(self.target(origin, b).round())?;
                }
                FeedbackAction::Release(reason) => break reason,
            }
        };

        pressed.release()?;
        Ok(reason)
    }
}
