//! What the engine can see, in screen coordinates

use crate::error::EngineError;
use crate::providers::ScreenCapture;
use crate::Result;
use anyhow::Context;
use opencv::core::Mat;
use serde::Serialize;
use std::sync::Arc;
use trailblazer_core::{BearingSample, Region, ScreenPoint, ScreenSize};
use trailblazer_cv::utils::ImageUtils;
use trailblazer_cv::{AvatarFix, DetectionConfig, SceneDetector, TemplateLoader};

/// A located target in screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScreenFix {
    pub center: ScreenPoint,
    pub score: f64,
}

/// Perception seam between the control logic and the detectors
pub trait Perception: Send {
    fn screen_size(&self) -> ScreenSize;
    fn locate_icon(&self) -> Result<Option<ScreenFix>>;
    fn locate_avatar(&self) -> Result<Option<ScreenFix>>;
    /// Beacon bearing as seen from `center`
    fn detect_beacon(&self, center: ScreenPoint) -> Result<Option<BearingSample>>;
}

/// Captures screen regions and runs the OpenCV detectors on them
pub struct ScreenPerception {
    capture: Arc<dyn ScreenCapture>,
    detector: SceneDetector,
}

impl ScreenPerception {
    /// Decode both templates and build the detectors
    pub fn new(config: DetectionConfig, capture: Arc<dyn ScreenCapture>) -> Result<Self> {
        let mut loader = TemplateLoader::new();
        for dir in &config.template_dirs {
            loader = loader.add_template_dir(dir);
        }
        let icon = loader.resolve(&config.icon.template_path).context(EngineError::TemplateDecode {
            path: config.icon.template_path.clone(),
        })?;
        let avatar = loader
            .resolve(&config.avatar.target.template_path)
            .context(EngineError::TemplateDecode {
                path: config.avatar.target.template_path.clone(),
            })?;

        Ok(Self::from_detector(SceneDetector::from_templates(config, icon, avatar), capture))
    }

    pub fn from_detector(detector: SceneDetector, capture: Arc<dyn ScreenCapture>) -> Self {
        Self { capture, detector }
    }

    pub fn detector(&self) -> &SceneDetector {
        &self.detector
    }

    fn grab(&self, region: Region) -> Result<(Mat, Region)> {
        let region = region.clamp_to(self.capture.screen_size());
        let frame = self
            .capture
            .capture(region)
            .with_context(|| format!("Failed to capture {region}"))?;
        Ok((ImageUtils::rgba_to_bgr(&frame)?, region))
    }
}

impl Perception for ScreenPerception {
    fn screen_size(&self) -> ScreenSize {
        self.capture.screen_size()
    }

    fn locate_icon(&self) -> Result<Option<ScreenFix>> {
        let (image, region) = self.grab(self.detector.config().icon.region)?;
        Ok(self.detector.find_icon(&image)?.map(|d| {
            let c = d.center();
            ScreenFix {
                center: ScreenPoint::new(c.x + region.x as f64, c.y + region.y as f64),
                score: d.score,
            }
        }))
    }

    fn locate_avatar(&self) -> Result<Option<ScreenFix>> {
        let (image, region) = self.grab(self.detector.config().avatar.target.region)?;
        Ok(self.detector.find_avatar(&image)?.map(|fix: AvatarFix| ScreenFix {
            center: ScreenPoint::new(fix.center.x + region.x as f64, fix.center.y + region.y as f64),
            score: fix.score,
        }))
    }

    fn detect_beacon(&self, center: ScreenPoint) -> Result<Option<BearingSample>> {
        let radius = self.detector.config().beacon.search_radius;
        let (image, region) = self.grab(Region::square_around(center, radius))?;
        let local = region.to_local(center);

        Ok(self
            .detector
            .find_beacon(&image, local)?
            .map(|s| BearingSample::between(center, region.to_screen(s.location))))
    }
}
