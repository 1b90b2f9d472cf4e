//! Template matching module

pub mod loader;
pub mod locator;
pub mod mask;

pub use loader::TemplateLoader;
pub use locator::TemplateLocator;

use crate::utils::ImageUtils;
use crate::Result;
use opencv::{core::Mat, prelude::*};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use trailblazer_core::{PixelPoint, ScreenPoint};

/// A decoded template, kept in both BGR and grayscale
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    /// Grayscale image used for plain correlation
    pub image: Mat,
    /// BGR image used for color masks
    pub color: Mat,
    pub path: Option<PathBuf>,
}

impl Template {
    pub fn from_bgr(name: impl Into<String>, color: Mat) -> Result<Self> {
        let image = ImageUtils::bgr_to_gray(&color)?;
        Ok(Self {
            name: name.into(),
            image,
            color,
            path: None,
        })
    }

    pub fn with_path(mut self, path: PathBuf) -> Self {
        self.path = Some(path);
        self
    }

    pub fn width(&self) -> i32 {
        self.image.cols()
    }

    pub fn height(&self) -> i32 {
        self.image.rows()
    }

    pub fn max_side(&self) -> i32 {
        self.width().max(self.height())
    }
}

/// Template matching method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchingMethod {
    /// Normalized cross-correlation
    CCorrNormed,
    /// Correlation coefficient (robust to linear lighting changes, default)
    CCoeffNormed,
    /// Squared difference (inverted: lower is better)
    SqDiffNormed,
}

impl MatchingMethod {
    pub fn to_opencv(&self) -> i32 {
        use opencv::imgproc::*;
        match self {
            MatchingMethod::CCorrNormed => TM_CCORR_NORMED,
            MatchingMethod::CCoeffNormed => TM_CCOEFF_NORMED,
            MatchingMethod::SqDiffNormed => TM_SQDIFF_NORMED,
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!(self, MatchingMethod::SqDiffNormed)
    }
}

/// Preprocessing applied to both image and template before a plain scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreprocessingMethod {
    None,
    /// Histogram equalization (normalize brightness)
    HistogramEqualization,
    /// Laplacian gradient (edge-based matching, robust to lighting)
    Laplacian,
    /// Canny edges (binary edge matching)
    Canny,
}

/// Parameters for preprocessing methods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingParams {
    pub canny_low: f64,
    pub canny_high: f64,
    /// Laplacian kernel size (must be odd: 1, 3, 5, 7, etc.)
    pub laplacian_ksize: i32,
}

impl Default for PreprocessingParams {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            laplacian_ksize: 3,
        }
    }
}

/// Hue/saturation/value box in OpenCV's 8-bit HSV ranges (H in 0..180)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HueBand {
    pub hue_min: f64,
    pub hue_max: f64,
    pub sat_min: f64,
    pub sat_max: f64,
    pub val_min: f64,
    pub val_max: f64,
}

impl HueBand {
    pub fn new(hue_min: f64, hue_max: f64, sat_min: f64, val_min: f64) -> Self {
        Self {
            hue_min,
            hue_max,
            sat_min,
            sat_max: 255.0,
            val_min,
            val_max: 255.0,
        }
    }
}

/// Settings of the mask + edge fusion search
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancedMatchConfig {
    /// Weight of the edge score in the blend
    pub edge_weight: f64,
    /// Best score must beat the runner-up by this factor
    pub min_ratio: f64,
    pub pale_value_floor: f64,
    pub pale_saturation_ceiling: f64,
    /// Accent colors that belong to the template
    pub keep_hues: Vec<HueBand>,
    /// Colors that never belong to the template (the beacon, mostly)
    pub distractor_hues: Vec<HueBand>,
    pub min_mask_fraction: f64,
    pub nms_iou: f64,
    pub canny_low: f64,
    pub canny_high: f64,
}

impl Default for EnhancedMatchConfig {
    fn default() -> Self {
        Self {
            edge_weight: 0.35,
            min_ratio: 1.08,
            pale_value_floor: 170.0,
            pale_saturation_ceiling: 60.0,
            keep_hues: vec![
                // yellow / gold accents
                HueBand::new(15.0, 40.0, 80.0, 90.0),
                // cyan / blue accents
                HueBand::new(85.0, 130.0, 80.0, 60.0),
            ],
            distractor_hues: vec![
                HueBand::new(0.0, 10.0, 80.0, 80.0),
                HueBand::new(170.0, 180.0, 80.0, 80.0),
            ],
            min_mask_fraction: 0.05,
            nms_iou: 0.3,
            canny_low: 50.0,
            canny_high: 150.0,
        }
    }
}

/// Template matching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    pub matching_method: MatchingMethod,
    pub preprocessing: PreprocessingMethod,
    pub preprocessing_params: PreprocessingParams,
    /// Present = mask + edge fusion with ambiguity rejection
    pub enhanced: Option<EnhancedMatchConfig>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            matching_method: MatchingMethod::CCoeffNormed,
            preprocessing: PreprocessingMethod::None,
            preprocessing_params: PreprocessingParams::default(),
            enhanced: None,
        }
    }
}

impl TemplateConfig {
    /// Configuration for gradient-based matching (robust to lighting)
    pub fn gradient_matching() -> Self {
        Self {
            preprocessing: PreprocessingMethod::Laplacian,
            ..Default::default()
        }
    }

    /// Mask + edge fusion with the default color bands
    pub fn enhanced() -> Self {
        Self {
            enhanced: Some(EnhancedMatchConfig::default()),
            ..Default::default()
        }
    }
}

/// A template placement found in an image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub top_left: PixelPoint,
    /// Template size at the chosen scale
    pub width: i32,
    pub height: i32,
    pub scale: f64,
    /// Higher is better, inverted methods already normalized
    pub score: f64,
}

impl Detection {
    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            self.top_left.x as f64 + self.width as f64 / 2.0,
            self.top_left.y as f64 + self.height as f64 / 2.0,
        )
    }

    /// Same detection expressed relative to a parent image
    pub fn offset(mut self, dx: i32, dy: i32) -> Self {
        self.top_left = self.top_left.offset(dx, dy);
        self
    }
}
