//! Image conversions between the `image` crate and OpenCV

use crate::Result;
use anyhow::Context;
use opencv::{
    core::{self, Mat, Rect},
    imgcodecs, imgproc,
    prelude::*,
};
use opencv_match::prelude::*;
use std::path::Path;

/// Image utility functions leveraging opencv-match conversions
pub struct ImageUtils;

impl ImageUtils {
    /// Load an image file as a BGR Mat
    pub fn load_bgr<P: AsRef<Path>>(path: P) -> Result<Mat> {
        let img = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgba8();

        Self::rgba_to_bgr(&img)
    }

    /// Save Mat as image
    pub fn save_image<P: AsRef<Path>>(mat: &Mat, path: P) -> Result<()> {
        let path_str = path.as_ref().to_string_lossy();

        imgcodecs::imwrite(&path_str, mat, &core::Vector::new())
            .with_context(|| format!("Failed to save image: {}", path_str))?;

        Ok(())
    }

    /// Convert image::RgbaImage to OpenCV Mat using opencv-match
    pub fn rgba_to_mat(rgba_image: &image::RgbaImage) -> Result<Mat> {
        rgba_image
            .try_into_cv()
            .context("Failed to convert RGBA image to OpenCV Mat")
    }

    /// Convert a captured RGBA frame to the BGR layout every detector expects
    pub fn rgba_to_bgr(rgba_image: &image::RgbaImage) -> Result<Mat> {
        let rgba = Self::rgba_to_mat(rgba_image)?;
        let mut bgr = Mat::default();
        imgproc::cvt_color_def(&rgba, &mut bgr, imgproc::COLOR_RGBA2BGR)
            .context("RGBA to BGR conversion failed")?;
        Ok(bgr)
    }

    pub fn bgr_to_gray(bgr: &Mat) -> Result<Mat> {
        Self::convert(bgr, imgproc::COLOR_BGR2GRAY, "gray")
    }

    pub fn bgr_to_hsv(bgr: &Mat) -> Result<Mat> {
        Self::convert(bgr, imgproc::COLOR_BGR2HSV, "HSV")
    }

    pub fn bgr_to_lab(bgr: &Mat) -> Result<Mat> {
        Self::convert(bgr, imgproc::COLOR_BGR2Lab, "Lab")
    }

    fn convert(src: &Mat, code: i32, label: &str) -> Result<Mat> {
        let mut dst = Mat::default();
        imgproc::cvt_color_def(src, &mut dst, code)
            .with_context(|| format!("BGR to {label} conversion failed"))?;
        Ok(dst)
    }

    /// Copy out `rect` intersected with the image bounds.
    ///
    /// Returns `None` when nothing of the rectangle lies inside the image.
    pub fn crop(image: &Mat, rect: Rect) -> Result<Option<(Mat, Rect)>> {
        let bounds = Rect::new(0, 0, image.cols(), image.rows());
        let clipped = rect & bounds;
        if clipped.width <= 0 || clipped.height <= 0 {
            return Ok(None);
        }
        let roi = Mat::roi(image, clipped).context("Failed to take image ROI")?;
        let owned = roi.try_clone().context("Failed to copy image ROI")?;
        Ok(Some((owned, clipped)))
    }

    /// Read one pixel of a single-channel 8-bit mask, out-of-bounds reads as zero
    pub fn mask_at(mask: &Mat, x: i32, y: i32) -> Result<u8> {
        if x < 0 || y < 0 || x >= mask.cols() || y >= mask.rows() {
            return Ok(0);
        }
        Ok(*mask.at_2d::<u8>(y, x)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Scalar, Vec3b, CV_8UC1, CV_8UC3};

    #[test]
    fn test_rgba_frame_conversion() -> Result<()> {
        let mut rgba = image::RgbaImage::new(40, 30);
        rgba.put_pixel(5, 7, image::Rgba([255, 0, 0, 255]));

        let bgr = ImageUtils::rgba_to_bgr(&rgba)?;
        assert_eq!((bgr.cols(), bgr.rows()), (40, 30));
        assert_eq!(bgr.channels(), 3);

        // Red in RGBA is the last channel in BGR
        let px = *bgr.at_2d::<Vec3b>(7, 5)?;
        assert_eq!((px[0], px[1], px[2]), (0, 0, 255));
        Ok(())
    }

    #[test]
    fn test_crop_clips_to_bounds() -> Result<()> {
        let image = Mat::new_rows_cols_with_default(50, 80, CV_8UC3, Scalar::all(0.0))?;

        let (crop, rect) = ImageUtils::crop(&image, Rect::new(-10, 40, 30, 30))?.unwrap();
        assert_eq!(rect, Rect::new(0, 40, 20, 10));
        assert_eq!((crop.cols(), crop.rows()), (20, 10));

        assert!(ImageUtils::crop(&image, Rect::new(100, 100, 5, 5))?.is_none());
        Ok(())
    }

    #[test]
    fn test_mask_out_of_bounds_is_zero() -> Result<()> {
        let mask = Mat::new_rows_cols_with_default(4, 4, CV_8UC1, Scalar::all(255.0))?;
        assert_eq!(ImageUtils::mask_at(&mask, 1, 1)?, 255);
        assert_eq!(ImageUtils::mask_at(&mask, -1, 1)?, 0);
        assert_eq!(ImageUtils::mask_at(&mask, 4, 0)?, 0);
        Ok(())
    }
}
