//! Screen capture over a still screenshot

use crate::error::EngineError;
use crate::providers::ScreenCapture;
use crate::Result;
use anyhow::Context;
use image::RgbaImage;
use std::path::Path;
use trailblazer_core::{Region, ScreenSize};

/// Replays one screenshot as if it were the screen
pub struct StillFrameCapture {
    frame: RgbaImage,
}

impl StillFrameCapture {
    pub fn new(frame: RgbaImage) -> Self {
        Self { frame }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let frame = image::open(path)
            .with_context(|| format!("Failed to open screenshot: {:?}", path))?
            .to_rgba8();
        Ok(Self::new(frame))
    }

    pub fn frame(&self) -> &RgbaImage {
        &self.frame
    }
}

impl ScreenCapture for StillFrameCapture {
    fn screen_size(&self) -> ScreenSize {
        ScreenSize::new(self.frame.width() as i32, self.frame.height() as i32)
    }

    fn capture(&self, region: Region) -> Result<RgbaImage> {
        let r = region.clamp_to(self.screen_size());
        if r.width <= 0 || r.height <= 0 {
            return Err(EngineError::Capture(format!("empty region {region}")).into());
        }
        let view = image::imageops::crop_imm(&self.frame, r.x as u32, r.y as u32, r.width as u32, r.height as u32);
        Ok(view.to_image())
    }
}
