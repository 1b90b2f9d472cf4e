//! High-level detection module

pub mod config;
pub mod detector;

pub use config::{AvatarConfig, DetectionConfig, TargetConfig, VisualizationConfig};
pub use detector::{AvatarFix, AvatarSource, SceneDetector, SceneReport};
