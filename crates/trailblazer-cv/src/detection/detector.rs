//! High-level scene detector: icon, avatar and beacon over one frame

use super::config::DetectionConfig;
use crate::beacon::BeaconDetector;
use crate::ring::RingLocator;
use crate::template::{Detection, Template, TemplateLoader, TemplateLocator};
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{Mat, Point, Rect, Scalar},
    imgproc::{self, FONT_HERSHEY_SIMPLEX, LINE_8},
    prelude::*,
};
use serde::Serialize;
use std::path::Path;
use trailblazer_core::{bearing::offset_along, BearingSample, ScreenPoint};

/// How the avatar was found
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum AvatarSource {
    Ring { radius: f64, verified: bool },
    Template { detection: Detection },
}

/// Avatar position in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AvatarFix {
    pub center: ScreenPoint,
    pub score: f64,
    pub source: AvatarSource,
}

/// Everything found in one frame
#[derive(Debug, Clone, Serialize)]
pub struct SceneReport {
    pub icon: Option<Detection>,
    pub avatar: Option<AvatarFix>,
    pub beacon: Option<BearingSample>,
    pub processing_time_ms: u64,
}

/// Scene detector owning the decoded templates
pub struct SceneDetector {
    config: DetectionConfig,
    icon_template: Template,
    avatar_template: Template,
    icon_locator: TemplateLocator,
    avatar_locator: TemplateLocator,
    ring_locator: RingLocator,
    beacon_detector: BeaconDetector,
}

impl SceneDetector {
    /// Create a detector, decoding both templates. Decode failure is fatal.
    pub fn new(config: DetectionConfig) -> Result<Self> {
        let mut loader = TemplateLoader::new();
        for dir in &config.template_dirs {
            loader = loader.add_template_dir(dir);
        }

        let icon = loader
            .resolve(&config.icon.template_path)
            .context("Failed to load icon template")?;
        let avatar = loader
            .resolve(&config.avatar.target.template_path)
            .context("Failed to load avatar template")?;

        Ok(Self::from_templates(config, icon, avatar))
    }

    /// Create a detector from already decoded templates
    pub fn from_templates(config: DetectionConfig, icon: Template, avatar: Template) -> Self {
        Self {
            icon_locator: TemplateLocator::new(config.icon.matcher.clone()),
            avatar_locator: TemplateLocator::new(config.avatar.target.matcher.clone()),
            ring_locator: RingLocator::new(config.avatar.ring.clone()),
            beacon_detector: BeaconDetector::new(config.beacon.clone()),
            icon_template: icon,
            avatar_template: avatar,
            config,
        }
    }

    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    pub fn find_icon(&self, image: &Mat) -> Result<Option<Detection>> {
        let cfg = &self.config.icon;
        self.icon_locator
            .locate(image, &self.icon_template, &cfg.scales, cfg.confidence)
    }

    /// Ring marker first when enabled, template search otherwise or as fallback
    pub fn find_avatar(&self, image: &Mat) -> Result<Option<AvatarFix>> {
        let cfg = &self.config.avatar;

        if cfg.use_ring {
            match self
                .ring_locator
                .locate(image, Some(&self.avatar_template), &self.avatar_locator)
            {
                Ok(Some(fix)) => {
                    return Ok(Some(AvatarFix {
                        center: fix.center,
                        score: fix.score,
                        source: AvatarSource::Ring {
                            radius: fix.radius,
                            verified: fix.verified,
                        },
                    }));
                }
                Ok(None) => tracing::debug!("no ring marker, falling back to avatar template"),
                Err(e) => tracing::debug!("ring search failed, falling back to avatar template: {e:#}"),
            }
        }

        let found = self.avatar_locator.locate(
            image,
            &self.avatar_template,
            &cfg.target.scales,
            cfg.target.confidence,
        )?;
        Ok(found.map(|detection| AvatarFix {
            center: detection.center(),
            score: detection.score,
            source: AvatarSource::Template { detection },
        }))
    }

    /// Beacon bearing around `center` with the configured radius and area
    pub fn find_beacon(&self, image: &Mat, center: ScreenPoint) -> Result<Option<BearingSample>> {
        self.beacon_detector.detect_default(image, center)
    }

    /// Run every detector over a full frame
    pub fn inspect(&self, image: &Mat) -> Result<SceneReport> {
        let start_time = std::time::Instant::now();

        let icon = self.find_icon(image)?;
        let avatar = self.find_avatar(image)?;
        let beacon = match &avatar {
            Some(fix) => self.find_beacon(image, fix.center)?,
            None => None,
        };

        Ok(SceneReport {
            icon,
            avatar,
            beacon,
            processing_time_ms: start_time.elapsed().as_millis() as u64,
        })
    }

    /// Draw the report on a copy of `image` and save it
    pub fn save_overlay(&self, image: &Mat, report: &SceneReport, output_path: &Path) -> Result<()> {
        let vis = &self.config.visualization;
        let mut output = image.try_clone()?;
        let green = Scalar::new(0.0, 255.0, 0.0, 0.0);
        let yellow = Scalar::new(0.0, 255.0, 255.0, 0.0);

        if let Some(icon) = &report.icon {
            let rect = Rect::new(icon.top_left.x, icon.top_left.y, icon.width, icon.height);
            if vis.draw_boxes {
                imgproc::rectangle(&mut output, rect, green, 2, LINE_8, 0)?;
            }
            if vis.draw_labels {
                let label = format!("icon ({:.2})", icon.score);
                imgproc::put_text(
                    &mut output,
                    &label,
                    Point::new(rect.x, (rect.y - 6).max(12)),
                    FONT_HERSHEY_SIMPLEX,
                    0.5,
                    green,
                    1,
                    LINE_8,
                    false,
                )?;
            }
        }

        if let Some(avatar) = &report.avatar {
            let c = avatar.center.round();
            let center = Point::new(c.x, c.y);
            if vis.draw_boxes {
                imgproc::circle(&mut output, center, 6, yellow, 2, LINE_8, 0)?;
            }
            if let (Some(beacon), true) = (&report.beacon, vis.draw_bearing) {
                let (dx, dy) = offset_along(beacon.degrees, 60.0);
                let end = avatar.center.translate(dx, dy).round();
                imgproc::arrowed_line(&mut output, center, Point::new(end.x, end.y), yellow, 2, LINE_8, 0, 0.2)?;
            }
        }

        ImageUtils::save_image(&output, output_path)?;
        tracing::info!(path = ?output_path, "overlay saved");
        Ok(())
    }

    /// Export a scene report in JSON format
    pub fn export_json(&self, report: &SceneReport, output_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(report).context("Failed to serialize scene report")?;

        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write JSON to: {:?}", output_path))?;

        Ok(())
    }
}
