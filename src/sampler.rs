//! Bearing sampling around the avatar

use crate::config::SamplerConfig;
use crate::perception::Perception;
use crate::providers::Clock;
use crate::session::SessionControls;
use std::time::Duration;
use trailblazer_core::bearing::CircularAccumulator;
use trailblazer_core::{CircularSummary, PixelPoint, ScreenPoint};

/// A bearing stable enough to start navigating on
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BearingLock {
    /// Last beacon tip seen
    pub location: PixelPoint,
    pub mean: f64,
    pub hits: usize,
    pub std_dev: f64,
}

/// Collected samples of one polling run
#[derive(Debug, Default)]
struct Samples {
    acc: CircularAccumulator,
    last: Option<PixelPoint>,
}

impl Samples {
    fn poll(&mut self, perception: &dyn Perception, center: ScreenPoint) {
        match perception.detect_beacon(center) {
            Ok(Some(sample)) => {
                self.acc.push(sample.degrees);
                self.last = Some(sample.location);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("beacon poll failed: {e:#}"),
        }
    }

    fn lock(&self, min_hits: usize, max_std: f64) -> Option<BearingLock> {
        if self.acc.len() < min_hits {
            return None;
        }
        let summary = self.acc.summary()?;
        let mean = summary.mean?;
        if summary.std_dev > max_std {
            return None;
        }
        Some(BearingLock {
            location: self.last?,
            mean,
            hits: summary.count,
            std_dev: summary.std_dev,
        })
    }
}

/// Poll the beacon until the bearing settles or `cfg.timeout()` runs out.
///
/// Returns early once `min_hits` samples agree within `early_stop_std_deg`.
/// At the timeout the whole window is used, whatever its spread; callers
/// judge the returned `std_dev`. `None` when too few samples arrived or stop
/// was requested.
pub fn wait_for_stable_bearing(
    perception: &dyn Perception,
    clock: &dyn Clock,
    controls: &SessionControls,
    center: ScreenPoint,
    cfg: &SamplerConfig,
) -> Option<BearingLock> {
    let started = clock.now();
    let mut samples = Samples::default();

    while clock.now().saturating_sub(started) < cfg.timeout() {
        if controls.is_stopped() {
            return None;
        }
        samples.poll(perception, center);
        if let Some(lock) = samples.lock(cfg.min_hits, cfg.early_stop_std_deg) {
            tracing::debug!(hits = lock.hits, std = lock.std_dev, "bearing settled early");
            return Some(lock);
        }
        clock.sleep(cfg.poll());
    }

    samples.lock(cfg.min_hits, f64::INFINITY)
}

/// Sample the beacon for `window`, polling every `poll`.
///
/// `None` when nothing was seen (or stop was requested before any sample).
pub fn sample_window(
    perception: &dyn Perception,
    clock: &dyn Clock,
    controls: &SessionControls,
    center: ScreenPoint,
    window: Duration,
    poll: Duration,
) -> Option<CircularSummary> {
    let started = clock.now();
    let mut samples = Samples::default();

    loop {
        if controls.is_stopped() {
            break;
        }
        samples.poll(perception, center);
        if clock.now().saturating_sub(started) + poll > window {
            break;
        }
        clock.sleep(poll);
    }

    samples.acc.summary()
}
