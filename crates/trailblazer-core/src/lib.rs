//! Trailblazer core
//!
//! Geometry, circular bearing statistics and the navigation control laws.
//! Nothing in here touches pixels or devices, so every rule can be tested
//! in isolation.

pub mod bearing;
pub mod geometry;
pub mod navigation;

pub use bearing::{BearingEma, BearingSample, CircularSummary, Compass};
pub use geometry::{PixelPoint, Region, ScaleRange, ScreenPoint, ScreenSize};
pub use navigation::{NavigationConfig, NavigationPhase, NavigationState};

pub type Result<T> = anyhow::Result<T>;
