//! Avatar localization by its bright ring marker
//!
//! Circles come from a Hough transform over a "bright and colorless" mask.
//! A candidate is kept when most of its circumference lies on the mask;
//! filled discs are penalized through interior sampling so that a white
//! blob does not outrank a real ring. An optional template pass in a small
//! window around the winner confirms it.

use crate::template::Template;
use crate::traits::TemplateSearch;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat, Rect, Scalar, Size, Vec3f, Vector},
    imgproc,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use trailblazer_core::{ScaleRange, ScreenPoint};

/// Ring detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// (min_radius, max_radius) in pixels
    pub radius_range: (i32, i32),
    pub white_brightness_floor: f64,
    pub white_saturation_ceiling: f64,
    /// Minimum fraction of circumference samples on the mask
    pub ring_consistency_threshold: f64,
    /// Slack in pixels when testing a circumference sample
    pub ring_tolerance_px: i32,
    pub template_confidence: f64,
    pub hough_dp: f64,
    pub hough_min_dist: f64,
    pub hough_param1: f64,
    pub hough_param2: f64,
    pub interior_bright_limit: f64,
    pub interior_penalty: f64,
    /// Verification window side as a multiple of the template's larger side
    pub verify_window_scale: f64,
    pub verify_scales: ScaleRange,
    /// Offset from the ring center to the avatar center
    pub center_offset: (f64, f64),
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            radius_range: (10, 60),
            white_brightness_floor: 200.0,
            white_saturation_ceiling: 40.0,
            ring_consistency_threshold: 0.6,
            ring_tolerance_px: 2,
            template_confidence: 0.45,
            hough_dp: 1.2,
            hough_min_dist: 20.0,
            hough_param1: 100.0,
            hough_param2: 18.0,
            interior_bright_limit: 0.5,
            interior_penalty: 0.5,
            verify_window_scale: 2.5,
            verify_scales: ScaleRange {
                min: 0.9,
                max: 1.1,
                steps: 3,
            },
            center_offset: (0.0, 0.0),
        }
    }
}

/// A ring accepted as the avatar marker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingFix {
    /// Avatar center (ring center plus the configured offset), image coordinates
    pub center: ScreenPoint,
    pub radius: f64,
    pub score: f64,
    /// A template pass confirmed the ring
    pub verified: bool,
}

pub struct RingLocator {
    config: RingConfig,
}

impl RingLocator {
    pub fn new(config: RingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RingConfig {
        &self.config
    }

    /// Find the best ring in a BGR image
    pub fn locate(
        &self,
        image: &Mat,
        avatar_template: Option<&Template>,
        matcher: &impl TemplateSearch,
    ) -> Result<Option<RingFix>> {
        let mask = self.bright_mask(image)?;

        let mut blurred = Mat::default();
        imgproc::gaussian_blur_def(&mask, &mut blurred, Size::new(5, 5), 1.5)?;

        let cfg = &self.config;
        let mut circles = Vector::<Vec3f>::new();
        imgproc::hough_circles(
            &blurred,
            &mut circles,
            imgproc::HOUGH_GRADIENT,
            cfg.hough_dp,
            cfg.hough_min_dist,
            cfg.hough_param1,
            cfg.hough_param2,
            cfg.radius_range.0,
            cfg.radius_range.1,
        )
        .context("Hough circle transform failed")?;

        let mut best: Option<(f64, f64, f64, f64)> = None;
        for circle in circles.iter() {
            let (cx, cy, r) = (circle[0] as f64, circle[1] as f64, circle[2] as f64);
            let Some(score) = self.score_circle(&mask, cx, cy, r)? else {
                continue;
            };
            if best.is_none_or(|(_, _, _, s)| score > s) {
                best = Some((cx, cy, r, score));
            }
        }

        let Some((cx, cy, radius, ring_score)) = best else {
            tracing::debug!(candidates = circles.len(), "no ring passed consistency");
            return Ok(None);
        };

        let mut fix = RingFix {
            center: ScreenPoint::new(cx + cfg.center_offset.0, cy + cfg.center_offset.1),
            radius,
            score: ring_score,
            verified: false,
        };

        if let Some(template) = avatar_template {
            if let Some(template_score) = self.verify(image, cx, cy, template, matcher)? {
                fix.verified = true;
                fix.score = (ring_score + template_score) / 2.0;
            }
        }

        tracing::debug!(
            x = fix.center.x,
            y = fix.center.y,
            radius,
            score = fix.score,
            verified = fix.verified,
            "ring located"
        );
        Ok(Some(fix))
    }

    fn bright_mask(&self, image: &Mat) -> Result<Mat> {
        let hsv = ImageUtils::bgr_to_hsv(image)?;
        let mut mask = Mat::default();
        core::in_range(
            &hsv,
            &Scalar::new(0.0, 0.0, self.config.white_brightness_floor, 0.0),
            &Scalar::new(180.0, self.config.white_saturation_ceiling, 255.0, 0.0),
            &mut mask,
        )?;
        Ok(mask)
    }

    /// Ring score, or `None` when the circumference is not consistent enough
    fn score_circle(&self, mask: &Mat, cx: f64, cy: f64, r: f64) -> Result<Option<f64>> {
        let cfg = &self.config;
        let samples = ((TAU * r / 3.0).round() as usize).clamp(24, 180);

        let mut hits = 0usize;
        for i in 0..samples {
            let theta = TAU * i as f64 / samples as f64;
            if self.on_circumference(mask, cx, cy, r, theta)? {
                hits += 1;
            }
        }
        let consistency = hits as f64 / samples as f64;
        if consistency < cfg.ring_consistency_threshold {
            return Ok(None);
        }

        let interior = interior_bright_fraction(mask, cx, cy, r)?;
        let score = if interior > cfg.interior_bright_limit {
            consistency * (1.0 - cfg.interior_penalty * interior)
        } else {
            consistency
        };
        Ok(Some(score.max(0.0)))
    }

    fn on_circumference(&self, mask: &Mat, cx: f64, cy: f64, r: f64, theta: f64) -> Result<bool> {
        let tol = self.config.ring_tolerance_px.max(0);
        for dr in -tol..=tol {
            let rr = r + dr as f64;
            let x = (cx + rr * theta.cos()).round() as i32;
            let y = (cy + rr * theta.sin()).round() as i32;
            if ImageUtils::mask_at(mask, x, y)? > 0 {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Template confirmation in a window around the ring center
    fn verify(
        &self,
        image: &Mat,
        cx: f64,
        cy: f64,
        template: &Template,
        matcher: &impl TemplateSearch,
    ) -> Result<Option<f64>> {
        let side = (self.config.verify_window_scale * template.max_side() as f64).round() as i32;
        let window = Rect::new(
            (cx - side as f64 / 2.0).round() as i32,
            (cy - side as f64 / 2.0).round() as i32,
            side.max(1),
            side.max(1),
        );
        let Some((crop, _)) = ImageUtils::crop(image, window)? else {
            return Ok(None);
        };

        let found = matcher.search(
            &crop,
            template,
            &self.config.verify_scales,
            self.config.template_confidence,
        )?;
        Ok(found.map(|d| d.score))
    }
}

impl Default for RingLocator {
    fn default() -> Self {
        Self::new(RingConfig::default())
    }
}

/// Fraction of bright samples at 0.25r, 0.5r and the center
fn interior_bright_fraction(mask: &Mat, cx: f64, cy: f64, r: f64) -> Result<f64> {
    const PER_RADIUS: usize = 12;
    let mut total = 1usize;
    let mut bright = usize::from(ImageUtils::mask_at(mask, cx.round() as i32, cy.round() as i32)? > 0);

    for factor in [0.25, 0.5] {
        let rr = r * factor;
        for i in 0..PER_RADIUS {
            let theta = TAU * i as f64 / PER_RADIUS as f64;
            let x = (cx + rr * theta.cos()).round() as i32;
            let y = (cy + rr * theta.sin()).round() as i32;
            total += 1;
            if ImageUtils::mask_at(mask, x, y)? > 0 {
                bright += 1;
            }
        }
    }
    Ok(bright as f64 / total as f64)
}
