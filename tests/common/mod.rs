// tests/common/mod.rs
//
// Scripted stand-ins for the screen, the pointer and the clock.
#![allow(dead_code)]

use image::RgbaImage;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use trailblazer::capture::StillFrameCapture;
use trailblazer::providers::WindowId;
use trailblazer::{Clock, InputDriver, MouseButton, Perception, Providers, Result, ScreenFix, WindowManager};
use trailblazer_core::bearing::offset_along;
use trailblazer_core::{BearingSample, PixelPoint, Region, ScreenPoint, ScreenSize};

pub const SCREEN: ScreenSize = ScreenSize {
    width: 800,
    height: 600,
};

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

/// Clock that only moves when someone sleeps on it
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sleep(&self, duration: Duration) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) += duration;
        // Let a host thread observe progress when a session runs on a worker
        std::thread::yield_now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Move(PixelPoint),
    Press(MouseButton),
    Release(MouseButton),
    Click(PixelPoint, MouseButton),
}

/// Input driver that records every call
#[derive(Clone, Default)]
pub struct RecordingInput {
    events: Arc<Mutex<Vec<InputEvent>>>,
}

impl RecordingInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<InputEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn clicks(&self) -> Vec<PixelPoint> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                InputEvent::Click(p, _) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn presses(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, InputEvent::Press(_))).count()
    }

    pub fn releases(&self) -> usize {
        self.events().iter().filter(|e| matches!(e, InputEvent::Release(_))).count()
    }

    pub fn moves(&self) -> Vec<PixelPoint> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                InputEvent::Move(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// True while a press has not been matched by a release
    pub fn is_held(&self) -> bool {
        self.presses() > self.releases()
    }

    fn record(&self, event: InputEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }
}

impl InputDriver for RecordingInput {
    fn move_to(&self, point: PixelPoint) -> Result<()> {
        self.record(InputEvent::Move(point));
        Ok(())
    }

    fn press(&self, button: MouseButton) -> Result<()> {
        self.record(InputEvent::Press(button));
        Ok(())
    }

    fn release(&self, button: MouseButton) -> Result<()> {
        self.record(InputEvent::Release(button));
        Ok(())
    }

    fn click_at(&self, point: PixelPoint, button: MouseButton) -> Result<()> {
        self.record(InputEvent::Click(point, button));
        Ok(())
    }
}

/// Window manager with a single window titled "Chrome"
#[derive(Clone, Default)]
pub struct RecordingWindows {
    calls: Arc<Mutex<Vec<String>>>,
}

impl RecordingWindows {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(call);
    }
}

impl WindowManager for RecordingWindows {
    fn find_window(&self, keyword: &str) -> Result<Option<WindowId>> {
        self.record(format!("find {keyword}"));
        Ok("Google Chrome".contains(keyword).then_some(WindowId(7)))
    }

    fn activate(&self, window: WindowId) -> Result<()> {
        self.record(format!("activate {}", window.0));
        Ok(())
    }

    fn move_resize(&self, window: WindowId, placement: Region) -> Result<()> {
        self.record(format!(
            "move {} to {},{} {}x{}",
            window.0, placement.x, placement.y, placement.width, placement.height
        ));
        Ok(())
    }
}

type BeaconFn = Box<dyn Fn(Duration) -> Option<f64> + Send>;

struct Scene {
    icon: VecDeque<Option<ScreenPoint>>,
    icon_after: Option<ScreenPoint>,
    avatar: VecDeque<Option<ScreenPoint>>,
    avatar_after: Option<ScreenPoint>,
    avatar_fails: bool,
    beacon: BeaconFn,
    icon_calls: u32,
    avatar_calls: u32,
    beacon_calls: u32,
}

/// Perception that replays scripted icon/avatar fixes.
///
/// Icon and avatar answers are consumed per call, then the `*_after` value
/// repeats. The beacon bearing is a function of the clock time.
#[derive(Clone)]
pub struct ScriptedPerception {
    clock: ManualClock,
    scene: Arc<Mutex<Scene>>,
}

impl ScriptedPerception {
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            scene: Arc::new(Mutex::new(Scene {
                icon: VecDeque::new(),
                icon_after: None,
                avatar: VecDeque::new(),
                avatar_after: None,
                avatar_fails: false,
                beacon: Box::new(|_| None),
                icon_calls: 0,
                avatar_calls: 0,
                beacon_calls: 0,
            })),
        }
    }

    fn scene(&self) -> std::sync::MutexGuard<'_, Scene> {
        self.scene.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_icon(self, script: Vec<Option<ScreenPoint>>, after: Option<ScreenPoint>) -> Self {
        {
            let mut scene = self.scene();
            scene.icon = script.into();
            scene.icon_after = after;
        }
        self
    }

    pub fn with_avatar(self, script: Vec<Option<ScreenPoint>>, after: Option<ScreenPoint>) -> Self {
        {
            let mut scene = self.scene();
            scene.avatar = script.into();
            scene.avatar_after = after;
        }
        self
    }

    pub fn with_failing_avatar(self) -> Self {
        self.scene().avatar_fails = true;
        self
    }

    pub fn with_beacon(self, beacon: impl Fn(Duration) -> Option<f64> + Send + 'static) -> Self {
        self.scene().beacon = Box::new(beacon);
        self
    }

    pub fn icon_calls(&self) -> u32 {
        self.scene().icon_calls
    }

    pub fn avatar_calls(&self) -> u32 {
        self.scene().avatar_calls
    }

    pub fn beacon_calls(&self) -> u32 {
        self.scene().beacon_calls
    }
}

fn fix(center: ScreenPoint) -> ScreenFix {
    ScreenFix { center, score: 0.95 }
}

impl Perception for ScriptedPerception {
    fn screen_size(&self) -> ScreenSize {
        SCREEN
    }

    fn locate_icon(&self) -> Result<Option<ScreenFix>> {
        let mut scene = self.scene();
        scene.icon_calls += 1;
        let next = scene.icon.pop_front().unwrap_or(scene.icon_after);
        Ok(next.map(fix))
    }

    fn locate_avatar(&self) -> Result<Option<ScreenFix>> {
        let mut scene = self.scene();
        scene.avatar_calls += 1;
        if scene.avatar_fails {
            anyhow::bail!("capture device unavailable");
        }
        let next = scene.avatar.pop_front().unwrap_or(scene.avatar_after);
        Ok(next.map(fix))
    }

    fn detect_beacon(&self, center: ScreenPoint) -> Result<Option<BearingSample>> {
        let now = self.clock.now();
        let mut scene = self.scene();
        scene.beacon_calls += 1;
        Ok((scene.beacon)(now).map(|degrees| {
            let (dx, dy) = offset_along(degrees, 40.0);
            BearingSample::between(center, center.translate(dx, dy).round())
        }))
    }
}

/// Providers over a blank screen, the recording input and the manual clock
pub fn providers(input: &RecordingInput, clock: &ManualClock) -> Providers {
    let capture = StillFrameCapture::new(RgbaImage::new(SCREEN.width as u32, SCREEN.height as u32));
    Providers::new(Arc::new(capture), Arc::new(input.clone()), Arc::new(clock.clone()))
}
