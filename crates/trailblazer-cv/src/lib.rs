//! Trailblazer Computer Vision Library
//!
//! OpenCV detectors for the icon, the avatar (template or ring marker) and
//! the directional beacon. Detectors work on BGR `Mat`s in image-local
//! coordinates; mapping to screen space is the caller's job.

pub mod bbox;
pub mod beacon;
pub mod detection;
pub mod error;
pub mod ring;
pub mod template;
pub mod utils;

// Re-export commonly used types
pub use bbox::{BBox, BBoxCollection};
pub use beacon::{BeaconConfig, BeaconDetector};
pub use detection::{AvatarFix, AvatarSource, DetectionConfig, SceneDetector, SceneReport};
pub use error::CvError;
pub use ring::{RingConfig, RingFix, RingLocator};
pub use template::{Detection, Template, TemplateConfig, TemplateLoader, TemplateLocator};

// Re-export opencv-match for convenience
pub use opencv_match::prelude::*;

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Core traits for the CV system
pub mod traits {
    use super::*;
    use opencv::core::Mat;

    /// Something that can find a template inside an image
    pub trait TemplateSearch {
        fn search(
            &self,
            image: &Mat,
            template: &Template,
            scales: &trailblazer_core::ScaleRange,
            threshold: f64,
        ) -> Result<Option<Detection>>;
    }
}
