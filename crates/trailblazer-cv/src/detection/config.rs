//! Detection configuration

use crate::beacon::BeaconConfig;
use crate::ring::RingConfig;
use crate::template::TemplateConfig;
use crate::Result;
use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trailblazer_core::{Region, ScaleRange};

/// Main detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Directories searched when a template path is a bare name
    pub template_dirs: Vec<PathBuf>,
    pub icon: TargetConfig,
    pub avatar: AvatarConfig,
    pub beacon: BeaconConfig,
    pub visualization: VisualizationConfig,
}

/// One template-located target and where to look for it
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    pub template_path: PathBuf,
    /// Screen region captured for the search
    pub region: Region,
    pub confidence: f64,
    pub scales: ScaleRange,
    pub matcher: TemplateConfig,
}

/// Avatar detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub target: TargetConfig,
    /// Try the ring marker first and fall back to the template
    pub use_ring: bool,
    pub ring: RingConfig,
}

/// Visualization configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualizationConfig {
    pub draw_boxes: bool,
    pub draw_labels: bool,
    pub draw_bearing: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            template_path: "target.png".into(),
            region: Region::new(0, 0, 800, 600),
            confidence: 0.8,
            scales: ScaleRange::default(),
            matcher: TemplateConfig::default(),
        }
    }
}

impl Default for AvatarConfig {
    fn default() -> Self {
        Self {
            target: TargetConfig {
                template_path: "character.png".into(),
                ..Default::default()
            },
            use_ring: true,
            ring: RingConfig::default(),
        }
    }
}

impl Default for VisualizationConfig {
    fn default() -> Self {
        Self {
            draw_boxes: true,
            draw_labels: true,
            draw_bearing: true,
        }
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            template_dirs: vec!["assets".into()],
            icon: TargetConfig::default(),
            avatar: AvatarConfig::default(),
            beacon: BeaconConfig::default(),
            visualization: VisualizationConfig::default(),
        }
    }
}

impl TargetConfig {
    pub fn validate(&self, label: &str) -> Result<()> {
        self.scales.validate()?;
        ensure!(
            (0.0..=1.0).contains(&self.confidence),
            "{label} confidence {} is outside [0, 1]",
            self.confidence
        );
        ensure!(
            self.region.width > 0 && self.region.height > 0,
            "{label} search region {} is empty",
            self.region
        );
        Ok(())
    }
}

impl DetectionConfig {
    /// Enhanced (mask + edge) matching for the icon
    pub fn with_enhanced_icon(mut self) -> Self {
        self.icon.matcher = TemplateConfig::enhanced();
        self
    }

    /// Avatar localization by template only, skipping the ring marker
    pub fn with_template_avatar(mut self) -> Self {
        self.avatar.use_ring = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.icon.validate("icon")?;
        self.avatar.target.validate("avatar")?;
        self.avatar.ring.verify_scales.validate()?;

        let (rmin, rmax) = self.avatar.ring.radius_range;
        ensure!(rmin > 0 && rmin <= rmax, "ring radius range ({rmin}, {rmax}) is invalid");
        ensure!(self.beacon.search_radius > 0.0, "beacon search radius must be positive");
        ensure!(self.beacon.min_area >= 0.0, "beacon min area must not be negative");
        Ok(())
    }
}
