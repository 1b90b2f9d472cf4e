//! Trailblazer engine
//!
//! Finds an on-screen icon, finds the avatar, reads the direction of the
//! beacon drawn around it and drags the avatar along that direction until
//! the icon is gone or the attempt budget runs out.
//!
//! Devices (screen capture, pointer input, windows, the clock) are consumed
//! through the traits in [`providers`]; perception goes through the
//! [`perception::Perception`] seam so the control logic can run against
//! scripted scenes.

pub mod capture;
pub mod config;
pub mod detection_loop;
pub mod error;
pub mod logging;
pub mod navigation;
pub mod notify;
pub mod perception;
pub mod providers;
pub mod sampler;
pub mod session;
pub mod status;

pub use config::EngineConfig;
pub use detection_loop::{DetectionLoop, LoopState};
pub use error::EngineError;
pub use navigation::{NavigationController, SessionReport};
pub use perception::{Perception, ScreenFix, ScreenPerception};
pub use providers::{Clock, InputDriver, LivenessNotifier, MouseButton, Providers, ScreenCapture, SystemClock, WindowManager};
pub use sampler::BearingLock;
pub use session::{start_session, start_session_with, SessionControls, SessionHandle};
pub use status::{SessionOutcome, StatusEvent, StatusSink};

pub type Result<T> = anyhow::Result<T>;
