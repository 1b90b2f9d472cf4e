//! Semantic keep-mask built from a template's own colors

use super::{EnhancedMatchConfig, HueBand, Template};
use crate::error::CvError;
use crate::utils::ImageUtils;
use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat, Scalar},
    prelude::*,
};

fn band_mask(hsv: &Mat, band: &HueBand) -> Result<Mat> {
    let mut out = Mat::default();
    core::in_range(
        hsv,
        &Scalar::new(band.hue_min, band.sat_min, band.val_min, 0.0),
        &Scalar::new(band.hue_max, band.sat_max, band.val_max, 0.0),
        &mut out,
    )
    .context("HSV band threshold failed")?;
    Ok(out)
}

fn union(acc: Mat, other: &Mat) -> Result<Mat> {
    let mut out = Mat::default();
    core::bitwise_or(&acc, other, &mut out, &core::no_array())?;
    Ok(out)
}

/// Pixels of `template` that take part in masked correlation.
///
/// Pale pixels and accent bands are kept, distractor bands are removed.
/// Fails with [`CvError::DegenerateMask`] when too little survives.
pub fn build_keep_mask(template: &Template, cfg: &EnhancedMatchConfig) -> Result<Mat> {
    let hsv = ImageUtils::bgr_to_hsv(&template.color)?;

    let pale = HueBand {
        hue_min: 0.0,
        hue_max: 180.0,
        sat_min: 0.0,
        sat_max: cfg.pale_saturation_ceiling,
        val_min: cfg.pale_value_floor,
        val_max: 255.0,
    };
    let mut keep = band_mask(&hsv, &pale)?;
    for band in &cfg.keep_hues {
        keep = union(keep, &band_mask(&hsv, band)?)?;
    }

    if !cfg.distractor_hues.is_empty() {
        let mut distractors = Mat::new_rows_cols_with_default(
            hsv.rows(),
            hsv.cols(),
            core::CV_8UC1,
            Scalar::all(0.0),
        )?;
        for band in &cfg.distractor_hues {
            distractors = union(distractors, &band_mask(&hsv, band)?)?;
        }
        let mut allowed = Mat::default();
        core::bitwise_not(&distractors, &mut allowed, &core::no_array())?;
        let mut filtered = Mat::default();
        core::bitwise_and(&keep, &allowed, &mut filtered, &core::no_array())?;
        keep = filtered;
    }

    let total = (keep.rows() * keep.cols()).max(1) as f64;
    let fraction = core::count_non_zero(&keep)? as f64 / total;
    if fraction < cfg.min_mask_fraction {
        return Err(CvError::DegenerateMask {
            name: template.name.clone(),
            percent: fraction * 100.0,
        }
        .into());
    }

    tracing::debug!(
        template = %template.name,
        kept = format!("{:.1}%", fraction * 100.0),
        "keep-mask built"
    );
    Ok(keep)
}
