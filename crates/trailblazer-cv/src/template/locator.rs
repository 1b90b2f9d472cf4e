//! Multi-scale template search, plain and mask + edge fusion

use super::{mask, Detection, EnhancedMatchConfig, PreprocessingMethod, Template, TemplateConfig};
use crate::bbox::{BBox, BBoxCollection};
use crate::error::CvError;
use crate::traits::TemplateSearch;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat, Point, Rect, Scalar, Size, CV_64F},
    imgproc,
    prelude::*,
};
use trailblazer_core::{PixelPoint, ScaleRange};

/// OpenCV-based template locator
pub struct TemplateLocator {
    config: TemplateConfig,
}

impl TemplateLocator {
    /// Create new template locator
    pub fn new(config: TemplateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TemplateConfig {
        &self.config
    }

    /// Best placement of `template` in `image` over `scales`, or `None` below `threshold`.
    ///
    /// `image` may be BGR or already grayscale. In enhanced mode any
    /// processing failure falls back to the plain scan.
    pub fn locate(
        &self,
        image: &Mat,
        template: &Template,
        scales: &ScaleRange,
        threshold: f64,
    ) -> Result<Option<Detection>> {
        if image.empty() || template.image.empty() {
            return Err(CvError::EmptyImage.into());
        }

        if let Some(enhanced) = &self.config.enhanced {
            match self.locate_enhanced(image, template, scales, threshold, enhanced) {
                Ok(found) => return Ok(found),
                Err(e) => tracing::debug!(
                    template = %template.name,
                    error = %e,
                    "enhanced match failed, using plain scan"
                ),
            }
        }

        self.locate_plain(image, template, scales, threshold)
    }

    fn locate_plain(
        &self,
        image: &Mat,
        template: &Template,
        scales: &ScaleRange,
        threshold: f64,
    ) -> Result<Option<Detection>> {
        let processed_image = self.preprocess(&to_gray(image)?)?;
        let processed_template = self.preprocess(&template.image)?;

        #[cfg(feature = "parallel")]
        let per_scale: Vec<Option<Detection>> = {
            use rayon::prelude::*;
            scales
                .to_vec()
                .par_iter()
                .map(|&scale| self.match_at_scale(&processed_image, &processed_template, scale))
                .collect::<Result<Vec<_>>>()?
        };

        #[cfg(not(feature = "parallel"))]
        let per_scale: Vec<Option<Detection>> = scales
            .iter()
            .map(|scale| self.match_at_scale(&processed_image, &processed_template, scale))
            .collect::<Result<Vec<_>>>()?;

        let best = per_scale
            .into_iter()
            .flatten()
            .max_by(|a, b| a.score.total_cmp(&b.score));

        match best {
            Some(found) if found.score >= threshold => {
                tracing::debug!(
                    template = %template.name,
                    score = found.score,
                    scale = found.scale,
                    x = found.top_left.x,
                    y = found.top_left.y,
                    "template located"
                );
                Ok(Some(found))
            }
            Some(found) => {
                tracing::debug!(template = %template.name, score = found.score, threshold, "below threshold");
                Ok(None)
            }
            None => {
                let size = image.size()?;
                tracing::debug!(
                    "{}",
                    CvError::TemplateTooLarge {
                        template_w: template.width(),
                        template_h: template.height(),
                        image_w: size.width,
                        image_h: size.height,
                    }
                );
                Ok(None)
            }
        }
    }

    /// Best placement at one scale; `None` when the scaled template does not fit
    fn match_at_scale(&self, image: &Mat, template: &Mat, scale: f64) -> Result<Option<Detection>> {
        let scaled = scale_template(template, scale, imgproc::INTER_LINEAR)?;
        if !fits(image, &scaled) {
            return Ok(None);
        }

        let method = self.config.matching_method;
        let mut result = Mat::default();
        imgproc::match_template(image, &scaled, &mut result, method.to_opencv(), &core::no_array())
            .context("Template matching failed")?;

        let (min_val, min_loc, max_val, max_loc) = extremes(&result)?;
        let (score, loc) = if method.is_inverted() {
            // For SQDIFF methods, lower is better
            (1.0 - min_val, min_loc)
        } else {
            (max_val, max_loc)
        };
        if !score.is_finite() {
            return Ok(None);
        }

        Ok(Some(Detection {
            top_left: PixelPoint::new(loc.x, loc.y),
            width: scaled.cols(),
            height: scaled.rows(),
            scale,
            score,
        }))
    }

    fn locate_enhanced(
        &self,
        image: &Mat,
        template: &Template,
        scales: &ScaleRange,
        threshold: f64,
        cfg: &EnhancedMatchConfig,
    ) -> Result<Option<Detection>> {
        let keep = mask::build_keep_mask(template, cfg)?;
        let gray = to_gray(image)?;
        let image_edges = edges(&gray, cfg.canny_low, cfg.canny_high)?;

        let mut candidates = BBoxCollection::new();
        for scale in scales.iter() {
            let t_gray = scale_template(&template.image, scale, imgproc::INTER_LINEAR)?;
            if !fits(&gray, &t_gray) {
                continue;
            }
            let t_mask = scale_template(&keep, scale, imgproc::INTER_NEAREST)?;
            if core::count_non_zero(&t_mask)? == 0 {
                continue;
            }
            let t_edges = edges(&t_gray, cfg.canny_low, cfg.canny_high)?;

            let mut masked = Mat::default();
            imgproc::match_template(&gray, &t_gray, &mut masked, imgproc::TM_CCORR_NORMED, &t_mask)
                .context("Masked template matching failed")?;
            let mut edge = Mat::default();
            imgproc::match_template(
                &image_edges,
                &t_edges,
                &mut edge,
                imgproc::TM_CCOEFF_NORMED,
                &core::no_array(),
            )
            .context("Edge template matching failed")?;

            let masked = sanitize(masked)?;
            let edge = sanitize(edge)?;
            let mut blended = Mat::default();
            core::add_weighted(
                &masked,
                1.0 - cfg.edge_weight,
                &edge,
                cfg.edge_weight,
                0.0,
                &mut blended,
                -1,
            )?;

            let (tw, th) = (t_gray.cols(), t_gray.rows());
            let (_, _, best_val, best_loc) = extremes(&blended)?;
            candidates.push(BBox::new(best_loc.x, best_loc.y, tw, th, best_val).with_scale(scale));

            // Runner-up: best placement that does not overlap the winner
            let footprint = Rect::new(best_loc.x - tw + 1, best_loc.y - th + 1, 2 * tw - 1, 2 * th - 1);
            imgproc::rectangle(&mut blended, footprint, Scalar::all(-1.0), imgproc::FILLED, imgproc::LINE_8, 0)?;
            let (_, _, second_val, second_loc) = extremes(&blended)?;
            if second_val > -1.0 {
                candidates.push(BBox::new(second_loc.x, second_loc.y, tw, th, second_val).with_scale(scale));
            }
        }

        let (best, second) = candidates.best_and_runner_up(cfg.nms_iou);
        let Some(best) = best else {
            return Ok(None);
        };
        let second_score = second.as_ref().map_or(0.0, |b| b.confidence);
        let ratio = if second_score > 0.0 {
            best.confidence / second_score
        } else {
            f64::INFINITY
        };

        tracing::debug!(
            template = %template.name,
            score = best.confidence,
            runner_up = second_score,
            ratio,
            scale = best.scale,
            "enhanced match"
        );

        if best.confidence < threshold || ratio < cfg.min_ratio {
            return Ok(None);
        }

        Ok(Some(Detection {
            top_left: PixelPoint::new(best.x, best.y),
            width: best.width,
            height: best.height,
            scale: best.scale,
            score: best.confidence,
        }))
    }

    /// Preprocess image based on configuration
    fn preprocess(&self, image: &Mat) -> Result<Mat> {
        use PreprocessingMethod::*;

        let processed = match self.config.preprocessing {
            None => image.clone(),
            HistogramEqualization => self.apply_histogram_equalization(image)?,
            Laplacian => self.apply_laplacian(image)?,
            Canny => {
                let params = &self.config.preprocessing_params;
                let mut out = Mat::default();
                imgproc::canny(image, &mut out, params.canny_low, params.canny_high, 3, false)?;
                out
            }
        };

        Ok(processed)
    }

    fn apply_histogram_equalization(&self, image: &Mat) -> Result<Mat> {
        let mut equalized = Mat::default();
        imgproc::equalize_hist(image, &mut equalized).context("Histogram equalization failed")?;
        Ok(equalized)
    }

    /// Apply Laplacian gradient (robust to illumination)
    fn apply_laplacian(&self, image: &Mat) -> Result<Mat> {
        let mut laplacian = Mat::default();

        imgproc::laplacian(
            image,
            &mut laplacian,
            CV_64F,
            self.config.preprocessing_params.laplacian_ksize,
            1.0,
            0.0,
            core::BORDER_DEFAULT,
        )
        .context("Laplacian failed")?;

        let mut abs_laplacian = Mat::default();
        core::convert_scale_abs(&laplacian, &mut abs_laplacian, 1.0, 0.0)?;

        Ok(abs_laplacian)
    }
}

impl TemplateSearch for TemplateLocator {
    fn search(
        &self,
        image: &Mat,
        template: &Template,
        scales: &ScaleRange,
        threshold: f64,
    ) -> Result<Option<Detection>> {
        self.locate(image, template, scales, threshold)
    }
}

impl Default for TemplateLocator {
    fn default() -> Self {
        Self::new(TemplateConfig::default())
    }
}

fn to_gray(image: &Mat) -> Result<Mat> {
    if image.channels() == 1 {
        Ok(image.clone())
    } else {
        ImageUtils::bgr_to_gray(image)
    }
}

fn fits(image: &Mat, template: &Mat) -> bool {
    template.cols() <= image.cols() && template.rows() <= image.rows()
}

/// Resize to `max(1, round(side * scale))` on both axes
fn scale_template(template: &Mat, scale: f64, interpolation: i32) -> Result<Mat> {
    if (scale - 1.0).abs() < f64::EPSILON {
        return Ok(template.clone());
    }
    let width = ((template.cols() as f64 * scale).round() as i32).max(1);
    let height = ((template.rows() as f64 * scale).round() as i32).max(1);

    let mut scaled = Mat::default();
    imgproc::resize(template, &mut scaled, Size::new(width, height), 0.0, 0.0, interpolation)
        .context("Template resize failed")?;
    Ok(scaled)
}

fn edges(gray: &Mat, low: f64, high: f64) -> Result<Mat> {
    let mut blurred = Mat::default();
    imgproc::gaussian_blur_def(gray, &mut blurred, Size::new(3, 3), 0.0)?;
    let mut out = Mat::default();
    imgproc::canny(&blurred, &mut out, low, high, 3, false)?;
    Ok(out)
}

/// NaN/Inf scores (flat windows) become 0, the rest is clamped to [-1, 1]
fn sanitize(mut scores: Mat) -> Result<Mat> {
    core::patch_na_ns(&mut scores, 0.0)?;
    let mut upper = Mat::default();
    core::min(&scores, &Scalar::all(1.0), &mut upper)?;
    let mut clamped = Mat::default();
    core::max(&upper, &Scalar::all(-1.0), &mut clamped)?;
    Ok(clamped)
}

fn extremes(result: &Mat) -> Result<(f64, Point, f64, Point)> {
    let (mut min_val, mut max_val) = (0.0, 0.0);
    let (mut min_loc, mut max_loc) = (Point::default(), Point::default());
    core::min_max_loc(
        result,
        Some(&mut min_val),
        Some(&mut max_val),
        Some(&mut min_loc),
        Some(&mut max_loc),
        &core::no_array(),
    )?;
    Ok((min_val, min_loc, max_val, max_loc))
}
