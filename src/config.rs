//! Engine configuration
//!
//! Every field has a default, so a partial JSON file only overrides what it
//! names. The worker receives an immutable `Arc<EngineConfig>` snapshot.

use crate::error::EngineError;
use crate::providers::MouseButton;
use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use trailblazer_core::navigation::config::secs;
use trailblazer_core::{NavigationConfig, Region};
use trailblazer_cv::DetectionConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub detection: DetectionConfig,
    pub navigation: NavigationConfig,
    pub sampler: SamplerConfig,
    pub timing: TimingConfig,
    pub input: InputConfig,
    pub window: WindowConfig,
}

/// Stable-bearing wait before a navigation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub timeout_secs: f64,
    pub poll_secs: f64,
    pub min_hits: usize,
    /// Running spread at which the wait returns early
    pub early_stop_std_deg: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 3.0,
            poll_secs: 0.08,
            min_hits: 5,
            early_stop_std_deg: 14.0,
        }
    }
}

impl SamplerConfig {
    pub fn timeout(&self) -> Duration {
        secs(self.timeout_secs)
    }

    pub fn poll(&self) -> Duration {
        secs(self.poll_secs)
    }
}

/// Pacing of the detection loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub max_arrow_attempts: u32,
    pub main_search_interval_secs: f64,
    pub preventive_click_delay_secs: f64,
    pub post_move_delay_secs: f64,
    pub final_check_delay_secs: f64,
    pub arrow_search_interval_secs: f64,
    /// Period of the "still searching" status line
    pub search_progress_interval_secs: f64,
    pub pause_poll_secs: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            max_arrow_attempts: 6,
            main_search_interval_secs: 0.6,
            preventive_click_delay_secs: 0.2,
            post_move_delay_secs: 0.25,
            final_check_delay_secs: 0.2,
            arrow_search_interval_secs: 0.2,
            search_progress_interval_secs: 30.0,
            pause_poll_secs: 0.1,
        }
    }
}

impl TimingConfig {
    pub fn main_search_interval(&self) -> Duration {
        secs(self.main_search_interval_secs)
    }

    pub fn preventive_click_delay(&self) -> Duration {
        secs(self.preventive_click_delay_secs)
    }

    pub fn post_move_delay(&self) -> Duration {
        secs(self.post_move_delay_secs)
    }

    pub fn final_check_delay(&self) -> Duration {
        secs(self.final_check_delay_secs)
    }

    pub fn arrow_search_interval(&self) -> Duration {
        secs(self.arrow_search_interval_secs)
    }

    pub fn search_progress_interval(&self) -> Duration {
        secs(self.search_progress_interval_secs)
    }

    pub fn pause_poll(&self) -> Duration {
        secs(self.pause_poll_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub drag_button: MouseButton,
    pub click_button: MouseButton,
    /// Icon clicks land within this many pixels of the icon center
    pub click_jitter_px: i32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            drag_button: MouseButton::Left,
            click_button: MouseButton::Left,
            click_jitter_px: 10,
        }
    }
}

/// Target window placement, applied at start and on refocus requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub title_keyword: String,
    pub placement: Region,
    pub arrange_on_start: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title_keyword: "Chrome".to_string(),
            placement: Region::new(0, 0, 1280, 720),
            arrange_on_start: true,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse engine configuration")
    }

    /// Load a configuration file; missing fields take their defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        Self::from_json_str(&text).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, json).with_context(|| format!("Failed to write config: {:?}", path))?;
        Ok(())
    }

    /// Enhanced (mask + edge) icon matching
    pub fn with_enhanced_icon(mut self) -> Self {
        self.detection = self.detection.with_enhanced_icon();
        self
    }

    pub fn validate(&self) -> Result<()> {
        let checks = || -> Result<()> {
            self.detection.validate()?;
            self.navigation.validate()?;
            anyhow::ensure!(self.sampler.min_hits >= 1, "sampler min_hits must be at least 1");
            anyhow::ensure!(self.sampler.poll_secs > 0.0, "sampler poll interval must be positive");
            anyhow::ensure!(self.input.click_jitter_px >= 0, "click jitter must not be negative");
            Ok(())
        };
        checks().map_err(|e| EngineError::InvalidConfig(format!("{e:#}")).into())
    }
}
