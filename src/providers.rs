//! Device seams consumed by the engine
//!
//! Implementations live outside this crate (OS capture, input injection,
//! window control). All methods take `&self` so one provider can be shared
//! between the worker and the host through an `Arc`.

use crate::Result;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use trailblazer_core::{PixelPoint, Region, ScreenSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

pub trait ScreenCapture: Send + Sync {
    fn screen_size(&self) -> ScreenSize;

    /// Grab `region` (already clamped to the screen). A failure only skips the current cycle.
    fn capture(&self, region: Region) -> Result<RgbaImage>;
}

pub trait InputDriver: Send + Sync {
    fn move_to(&self, point: PixelPoint) -> Result<()>;
    fn press(&self, button: MouseButton) -> Result<()>;
    fn release(&self, button: MouseButton) -> Result<()>;
    fn click_at(&self, point: PixelPoint, button: MouseButton) -> Result<()>;
}

/// Opaque handle of a top-level window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(pub u64);

pub trait WindowManager: Send + Sync {
    /// First window whose title contains `keyword`
    fn find_window(&self, keyword: &str) -> Result<Option<WindowId>>;
    fn activate(&self, window: WindowId) -> Result<()>;
    fn move_resize(&self, window: WindowId, placement: Region) -> Result<()>;
}

/// Receives "icon seen" heartbeats and alerts on silence
pub trait LivenessNotifier: Send + Sync {
    fn update(&self, at: Duration);
    fn check_and_notify(&self, now: Duration);
}

/// Monotonic time source; all engine pacing goes through `sleep`
pub trait Clock: Send + Sync {
    /// Time since an arbitrary fixed origin
    fn now(&self) -> Duration;
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `Instant` and `thread::sleep`
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// Everything the worker needs from the host
#[derive(Clone)]
pub struct Providers {
    pub capture: Arc<dyn ScreenCapture>,
    pub input: Arc<dyn InputDriver>,
    pub clock: Arc<dyn Clock>,
    pub window: Option<Arc<dyn WindowManager>>,
    pub notifier: Option<Arc<dyn LivenessNotifier>>,
}

impl Providers {
    pub fn new(capture: Arc<dyn ScreenCapture>, input: Arc<dyn InputDriver>, clock: Arc<dyn Clock>) -> Self {
        Self {
            capture,
            input,
            clock,
            window: None,
            notifier: None,
        }
    }

    pub fn with_window_manager(mut self, window: Arc<dyn WindowManager>) -> Self {
        self.window = Some(window);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn LivenessNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        clock.sleep(Duration::from_millis(2));
        assert!(clock.now() >= a + Duration::from_millis(2));
    }
}
