//! Directional beacon detection
//!
//! The beacon is a red arrow drawn around the avatar. It fades in and out,
//! so the color mask combines an HSV red test with a Lab chroma test that
//! still fires when the arrow is half transparent.

pub mod shape;

use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size, Vector},
    imgproc,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use shape::ShapeMetrics;
use trailblazer_core::{BearingSample, ScreenPoint};

/// Beacon detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Half side of the square window searched around the avatar
    pub search_radius: f64,
    pub min_area: f64,
    /// Red hue bands in OpenCV's 0..180 hue range
    pub red_hue_bands: Vec<(f64, f64)>,
    pub saturation_floor: f64,
    pub value_floor: f64,
    pub luminance_floor: f64,
    /// Lab `a` channel floor (128 is neutral)
    pub chroma_floor: f64,
    pub extent_range: (f64, f64),
    pub min_solidity: f64,
    /// Blobs at least this round are rejected
    pub max_circularity: f64,
    pub max_tip_angle_deg: f64,
    /// `approxPolyDP` epsilon as a fraction of the perimeter
    pub approx_epsilon_ratio: f64,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            search_radius: 140.0,
            min_area: 80.0,
            red_hue_bands: vec![(0.0, 10.0), (170.0, 180.0)],
            saturation_floor: 80.0,
            value_floor: 80.0,
            luminance_floor: 60.0,
            chroma_floor: 165.0,
            extent_range: (0.30, 0.92),
            min_solidity: 0.70,
            max_circularity: 0.85,
            max_tip_angle_deg: 70.0,
            approx_epsilon_ratio: 0.02,
        }
    }
}

/// Color + shape beacon detector
pub struct BeaconDetector {
    config: BeaconConfig,
}

impl BeaconDetector {
    pub fn new(config: BeaconConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    /// Bearing of the beacon around `center` using the configured radius and area
    pub fn detect_default(&self, image: &Mat, center: ScreenPoint) -> Result<Option<BearingSample>> {
        self.detect(image, center, self.config.search_radius, self.config.min_area)
    }

    /// Bearing from `center` to the beacon tip, both in image coordinates.
    ///
    /// Only a square of side `2 * search_radius` around `center`
    /// (clamped to the image) is examined.
    pub fn detect(
        &self,
        image: &Mat,
        center: ScreenPoint,
        search_radius: f64,
        min_area: f64,
    ) -> Result<Option<BearingSample>> {
        let r = search_radius.round().max(1.0) as i32;
        let window = Rect::new(center.x.round() as i32 - r, center.y.round() as i32 - r, 2 * r, 2 * r);
        let Some((crop, origin)) = ImageUtils::crop(image, window)? else {
            return Ok(None);
        };

        let mask = self.beacon_mask(&crop)?;
        let mut contours = Vector::<Vector<Point>>::new();
        imgproc::find_contours(
            &mask,
            &mut contours,
            imgproc::RETR_EXTERNAL,
            imgproc::CHAIN_APPROX_SIMPLE,
            Point::new(0, 0),
        )
        .context("Contour extraction failed")?;

        let mut best: Option<(Vector<Point>, ShapeMetrics)> = None;
        for contour in contours.iter() {
            let Some(metrics) = ShapeMetrics::measure(&contour)? else {
                continue;
            };
            if !self.accepts(&metrics, min_area) {
                continue;
            }
            if best.as_ref().is_none_or(|(_, b)| metrics.score() > b.score()) {
                best = Some((contour, metrics));
            }
        }

        let Some((contour, metrics)) = best else {
            return Ok(None);
        };

        let mut polygon = Vector::<Point>::new();
        imgproc::approx_poly_dp(
            &contour,
            &mut polygon,
            self.config.approx_epsilon_ratio * metrics.perimeter,
            true,
        )?;

        let local_center = ScreenPoint::new(center.x - origin.x as f64, center.y - origin.y as f64);
        let Some(tip) = shape::select_tip(
            &shape::to_pixels(&polygon),
            &shape::to_pixels(&contour),
            local_center,
            self.config.max_tip_angle_deg,
        ) else {
            return Ok(None);
        };

        let sample = BearingSample::between(center, tip.offset(origin.x, origin.y));
        tracing::debug!(
            bearing = sample.degrees,
            area = metrics.area,
            extent = metrics.extent,
            solidity = metrics.solidity,
            "beacon detected"
        );
        Ok(Some(sample))
    }

    fn accepts(&self, m: &ShapeMetrics, min_area: f64) -> bool {
        let cfg = &self.config;
        m.area >= min_area
            && (cfg.extent_range.0..=cfg.extent_range.1).contains(&m.extent)
            && m.solidity >= cfg.min_solidity
            && m.circularity < cfg.max_circularity
    }

    /// Binary mask of beacon-colored pixels, denoised
    pub fn beacon_mask(&self, bgr: &Mat) -> Result<Mat> {
        let cfg = &self.config;
        let hsv = ImageUtils::bgr_to_hsv(bgr)?;

        let mut mask = Mat::new_rows_cols_with_default(bgr.rows(), bgr.cols(), core::CV_8UC1, Scalar::all(0.0))?;
        for &(lo, hi) in &cfg.red_hue_bands {
            let mut band = Mat::default();
            core::in_range(
                &hsv,
                &Scalar::new(lo, cfg.saturation_floor, cfg.value_floor, 0.0),
                &Scalar::new(hi, 255.0, 255.0, 0.0),
                &mut band,
            )?;
            let mut merged = Mat::default();
            core::bitwise_or(&mask, &band, &mut merged, &core::no_array())?;
            mask = merged;
        }

        let lab = ImageUtils::bgr_to_lab(bgr)?;
        let mut chroma = Mat::default();
        core::in_range(
            &lab,
            &Scalar::new(cfg.luminance_floor, cfg.chroma_floor, 0.0, 0.0),
            &Scalar::new(255.0, 255.0, 255.0, 0.0),
            &mut chroma,
        )?;
        let mut merged = Mat::default();
        core::bitwise_or(&mask, &chroma, &mut merged, &core::no_array())?;

        let mut denoised = Mat::default();
        imgproc::median_blur(&merged, &mut denoised, 3)?;

        let kernel = imgproc::get_structuring_element(
            imgproc::MORPH_ELLIPSE,
            Size::new(5, 5),
            Point::new(-1, -1),
        )?;
        let mut closed = Mat::default();
        imgproc::morphology_ex(
            &denoised,
            &mut closed,
            imgproc::MORPH_CLOSE,
            &kernel,
            Point::new(-1, -1),
            1,
            core::BORDER_CONSTANT,
            imgproc::morphology_default_border_value()?,
        )?;
        Ok(closed)
    }
}

impl Default for BeaconDetector {
    fn default() -> Self {
        Self::new(BeaconConfig::default())
    }
}
