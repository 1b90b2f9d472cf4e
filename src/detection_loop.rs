//! Top-level icon / avatar / beacon state machine

use crate::config::EngineConfig;
use crate::navigation::NavigationController;
use crate::perception::Perception;
use crate::providers::Providers;
use crate::sampler::wait_for_stable_bearing;
use crate::session::SessionControls;
use crate::status::{SessionOutcome, StatusSink};
use crate::Result;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use trailblazer_core::{Compass, ScreenPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoopState {
    SearchingIcon,
    /// The icon was seen; `attempt` tracking attempts are already spent
    IconFound { attempt: u32 },
    TrackingAttempt { icon: ScreenPoint, attempt: u32 },
}

/// Last icon status reported, so repeated cycles stay quiet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IconStatus {
    Found,
    Searching,
}

pub struct DetectionLoop {
    config: Arc<EngineConfig>,
    perception: Box<dyn Perception>,
    providers: Providers,
    controls: Arc<SessionControls>,
    status: StatusSink,
    rng: StdRng,
    state: LoopState,
    icon_status: Option<IconStatus>,
    search_since: Duration,
}

impl DetectionLoop {
    pub fn new(
        config: Arc<EngineConfig>,
        perception: Box<dyn Perception>,
        providers: Providers,
        controls: Arc<SessionControls>,
        status: StatusSink,
    ) -> Self {
        Self {
            config,
            perception,
            providers,
            controls,
            status,
            rng: StdRng::from_entropy(),
            state: LoopState::SearchingIcon,
            icon_status: None,
            search_since: Duration::ZERO,
        }
    }

    /// Deterministic click jitter
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// Perform one transition and return the new state
    pub fn step(&mut self) -> Result<LoopState> {
        let next = match self.state {
            LoopState::SearchingIcon => self.search_icon()?,
            LoopState::IconFound { attempt } => self.verify_icon(attempt)?,
            LoopState::TrackingAttempt { icon, attempt } => self.track(icon, attempt)?,
        };
        self.state = next;
        Ok(next)
    }

    /// Apply the per-cycle error policy to the outcome of [`step`](Self::step).
    ///
    /// A failure is reported as a warning and treated like an empty
    /// observation for the current state.
    pub fn absorb(&mut self, result: Result<LoopState>) {
        let Err(e) = result else {
            return;
        };
        self.status.warn(format!("Cycle failed: {e:#}"));

        let timing = &self.config.timing;
        self.state = match self.state {
            LoopState::SearchingIcon => {
                self.providers.clock.sleep(timing.main_search_interval());
                LoopState::SearchingIcon
            }
            LoopState::IconFound { .. } => {
                self.icon_status = None;
                LoopState::SearchingIcon
            }
            LoopState::TrackingAttempt { attempt, .. } => {
                self.providers.clock.sleep(timing.arrow_search_interval());
                LoopState::IconFound { attempt: attempt + 1 }
            }
        };
    }

    /// Step until stop is requested, honoring pause and refocus requests
    pub fn run(&mut self) -> SessionOutcome {
        self.status.log("=== Detection started ===");
        while !self.controls.is_stopped() {
            if self.controls.take_refocus() {
                self.arrange_window();
            }
            if self.controls.is_paused() {
                self.providers.clock.sleep(self.config.timing.pause_poll());
                continue;
            }
            let result = self.step();
            self.absorb(result);
        }
        self.status.log("=== Detection stopped ===");
        SessionOutcome::Stopped
    }

    /// Bring the configured window to the front at its configured placement.
    ///
    /// Returns false when no window manager is available or no window matched.
    pub fn arrange_window(&self) -> bool {
        let Some(wm) = &self.providers.window else {
            return false;
        };
        let cfg = &self.config.window;
        let arranged = wm.find_window(&cfg.title_keyword).and_then(|found| match found {
            Some(id) => {
                wm.activate(id)?;
                wm.move_resize(id, cfg.placement)?;
                Ok(true)
            }
            None => Ok(false),
        });
        match arranged {
            Ok(true) => {
                self.status.log(format!("Window \"{}\" moved to {}", cfg.title_keyword, cfg.placement));
                true
            }
            Ok(false) => {
                self.status.warn(format!("No window title contains \"{}\"", cfg.title_keyword));
                false
            }
            Err(e) => {
                self.status.warn(format!("Window arrangement failed: {e:#}"));
                false
            }
        }
    }

    fn search_icon(&mut self) -> Result<LoopState> {
        let now = self.providers.clock.now();
        if let Some(fix) = self.perception.locate_icon()? {
            if let Some(notifier) = &self.providers.notifier {
                notifier.update(now);
            }
            if self.icon_status != Some(IconStatus::Found) {
                self.status.log(format!(
                    "Icon found at ({:.0}, {:.0}), score {:.2}",
                    fix.center.x, fix.center.y, fix.score
                ));
                self.icon_status = Some(IconStatus::Found);
            }
            return Ok(LoopState::IconFound { attempt: 0 });
        }

        if let Some(notifier) = &self.providers.notifier {
            notifier.check_and_notify(now);
        }
        let timing = &self.config.timing;
        if self.icon_status != Some(IconStatus::Searching) {
            self.status.log("Searching for the icon...");
            self.icon_status = Some(IconStatus::Searching);
            self.search_since = now;
        } else if now.saturating_sub(self.search_since) > timing.search_progress_interval() {
            self.status.log(format!(
                "Still searching (> {:.0}s)",
                timing.search_progress_interval().as_secs_f64()
            ));
            self.search_since = now;
        }
        self.providers.clock.sleep(timing.main_search_interval());
        Ok(LoopState::SearchingIcon)
    }

    fn verify_icon(&mut self, attempt: u32) -> Result<LoopState> {
        let max = self.config.timing.max_arrow_attempts;
        if attempt >= max {
            self.status.log(format!("All {max} attempts used, searching for the icon again"));
            return Ok(LoopState::SearchingIcon);
        }

        match self.perception.locate_icon()? {
            Some(fix) => {
                if let Some(notifier) = &self.providers.notifier {
                    notifier.update(self.providers.clock.now());
                }
                Ok(LoopState::TrackingAttempt {
                    icon: fix.center,
                    attempt,
                })
            }
            None => {
                self.status.log("Icon vanished, back to searching");
                self.icon_status = None;
                Ok(LoopState::SearchingIcon)
            }
        }
    }

    fn track(&mut self, icon: ScreenPoint, attempt: u32) -> Result<LoopState> {
        let config = self.config.clone();
        let timing = &config.timing;
        let clock = self.providers.clock.clone();

        self.status.log(format!("[attempt {}] preventive click on the icon", attempt + 1));
        self.click_icon(icon)?;
        clock.sleep(timing.preventive_click_delay());
        let spent = LoopState::IconFound { attempt: attempt + 1 };
        if self.controls.is_stopped() {
            return Ok(spent);
        }

        match self.perception.locate_avatar()? {
            None => self.status.log("Avatar not found"),
            Some(avatar) => {
                self.status.log(format!(
                    "Avatar at ({:.1}, {:.1}), sampling the beacon...",
                    avatar.center.x, avatar.center.y
                ));
                let lock = wait_for_stable_bearing(
                    self.perception.as_ref(),
                    clock.as_ref(),
                    &self.controls,
                    avatar.center,
                    &config.sampler,
                );
                if self.controls.is_stopped() {
                    return Ok(spent);
                }
                match lock {
                    None => self.status.log("No stable beacon bearing"),
                    Some(lock) if lock.std_dev > self.config.navigation.relock_std_deg => {
                        self.status.log(format!(
                            "Bearing too scattered ({:.1}° spread over {} hits), skipping",
                            lock.std_dev, lock.hits
                        ));
                    }
                    Some(lock) => {
                        self.status.log(format!(
                            "{} hits -> bearing {:.1}° ({}), spread {:.1}° -> navigating",
                            lock.hits,
                            lock.mean,
                            Compass::from_bearing(lock.mean),
                            lock.std_dev
                        ));
                        NavigationController::new(
                            self.perception.as_ref(),
                            self.providers.input.as_ref(),
                            clock.as_ref(),
                            &self.controls,
                            &self.status,
                            &config,
                        )
                        .run(&lock, avatar.center)?;
                        if self.controls.is_stopped() {
                            return Ok(spent);
                        }

                        clock.sleep(timing.post_move_delay());
                        self.status.log("Clicking the icon again after moving");
                        self.click_icon(icon)?;
                        clock.sleep(timing.final_check_delay());
                    }
                }
            }
        }

        clock.sleep(timing.arrow_search_interval());
        Ok(spent)
    }

    /// Click near the icon center, jittered and clamped to the screen
    fn click_icon(&mut self, icon: ScreenPoint) -> Result<()> {
        let jitter = self.config.input.click_jitter_px;
        let dx = self.rng.gen_range(-jitter..=jitter);
        let dy = self.rng.gen_range(-jitter..=jitter);
        let point = self
            .perception
            .screen_size()
            .clamp_point(icon.translate(dx as f64, dy as f64))
            .round();
        self.providers.input.click_at(point, self.config.input.click_button)
    }
}
