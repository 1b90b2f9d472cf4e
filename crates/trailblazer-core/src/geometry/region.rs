//! Axis-aligned capture regions and screen clamping

use super::point::{PixelPoint, ScreenPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical screen dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    /// Create a screen size; degenerate dimensions are raised to one pixel
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }

    /// Clamp a sub-pixel point onto the screen
    pub fn clamp_point(&self, point: ScreenPoint) -> ScreenPoint {
        ScreenPoint::new(
            point.x.clamp(0.0, (self.width - 1) as f64),
            point.y.clamp(0.0, (self.height - 1) as f64),
        )
    }
}

/// Rectangle in screen pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Square window of side `2 * radius` centered on `center`, not yet clamped
    pub fn square_around(center: ScreenPoint, radius: f64) -> Self {
        let side = (radius * 2.0).round() as i32;
        Self::new(
            (center.x - radius).round() as i32,
            (center.y - radius).round() as i32,
            side,
            side,
        )
    }

    /// Clamp into the screen.
    ///
    /// The origin is pulled inside the screen first, then the size is cut to
    /// what remains; width and height never drop below one pixel.
    pub fn clamp_to(&self, screen: ScreenSize) -> Region {
        let x = self.x.clamp(0, screen.width - 1);
        let y = self.y.clamp(0, screen.height - 1);
        let width = self.width.clamp(1, screen.width - x);
        let height = self.height.clamp(1, screen.height - y);
        Region::new(x, y, width, height)
    }

    pub fn origin(&self) -> PixelPoint {
        PixelPoint::new(self.x, self.y)
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    pub fn area(&self) -> i64 {
        self.width as i64 * self.height as i64
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }

    pub fn contains(&self, p: PixelPoint) -> bool {
        p.x >= self.x && p.y >= self.y && p.x < self.right() && p.y < self.bottom()
    }

    /// Translate a point expressed relative to this region into screen space
    pub fn to_screen(&self, local: PixelPoint) -> PixelPoint {
        local + self.origin()
    }

    /// Translate a screen point into this region's local frame
    pub fn to_local(&self, p: ScreenPoint) -> ScreenPoint {
        p.translate(-self.x as f64, -self.y as f64)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}x{}", self.x, self.y, self.width, self.height)
    }
}
