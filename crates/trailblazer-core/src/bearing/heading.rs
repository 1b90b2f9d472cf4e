//! Bearing math in screen space
//!
//! Screen y grows downwards, so "up" is `-y`. A bearing of 0° points up and
//! 90° points right.

use super::circular::normalize;
use crate::geometry::{PixelPoint, ScreenPoint};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearing of the vector `(dx, dy)` in screen coordinates
pub fn bearing_from_offset(dx: f64, dy: f64) -> f64 {
    normalize(dx.atan2(-dy).to_degrees())
}

/// Screen offset of length `distance` along `bearing`
pub fn offset_along(bearing: f64, distance: f64) -> (f64, f64) {
    let rad = bearing.to_radians();
    (distance * rad.sin(), -distance * rad.cos())
}

/// One bearing observation of the beacon
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BearingSample {
    /// Degrees in `[0, 360)`
    pub degrees: f64,
    /// Screen pixel the bearing was derived from (the beacon tip)
    pub location: PixelPoint,
}

impl BearingSample {
    pub fn new(degrees: f64, location: PixelPoint) -> Self {
        Self {
            degrees: normalize(degrees),
            location,
        }
    }

    /// Bearing from `origin` towards `target`
    pub fn between(origin: ScreenPoint, target: PixelPoint) -> Self {
        let degrees = bearing_from_offset(target.x as f64 - origin.x, target.y as f64 - origin.y);
        Self::new(degrees, target)
    }
}

/// Eight-way compass label, used for human-readable status lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Compass {
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
    Left,
    UpLeft,
}

impl Compass {
    pub fn from_bearing(degrees: f64) -> Self {
        let d = normalize(degrees);
        // Sectors are 45° wide and centered on the label direction
        match ((d + 22.5) / 45.0).floor() as u32 % 8 {
            0 => Compass::Up,
            1 => Compass::UpRight,
            2 => Compass::Right,
            3 => Compass::DownRight,
            4 => Compass::Down,
            5 => Compass::DownLeft,
            6 => Compass::Left,
            _ => Compass::UpLeft,
        }
    }
}

impl fmt::Display for Compass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Compass::Up => "up",
            Compass::UpRight => "up-right",
            Compass::Right => "right",
            Compass::DownRight => "down-right",
            Compass::Down => "down",
            Compass::DownLeft => "down-left",
            Compass::Left => "left",
            Compass::UpLeft => "up-left",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinal_bearings() {
        assert!((bearing_from_offset(0.0, -10.0) - 0.0).abs() < 1e-9);
        assert!((bearing_from_offset(10.0, 0.0) - 90.0).abs() < 1e-9);
        assert!((bearing_from_offset(0.0, 10.0) - 180.0).abs() < 1e-9);
        assert!((bearing_from_offset(-10.0, 0.0) - 270.0).abs() < 1e-9);
    }

    #[test]
    fn test_offset_along_inverts_bearing() {
        for bearing in [0.0, 33.0, 135.0, 250.0, 359.0] {
            let (dx, dy) = offset_along(bearing, 100.0);
            assert!((bearing_from_offset(dx, dy) - bearing).abs() < 1e-6);
            assert!((dx.hypot(dy) - 100.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_compass_sectors() {
        assert_eq!(Compass::from_bearing(350.0), Compass::Up);
        assert_eq!(Compass::from_bearing(22.4), Compass::Up);
        assert_eq!(Compass::from_bearing(45.0), Compass::UpRight);
        assert_eq!(Compass::from_bearing(180.0), Compass::Down);
        assert_eq!(Compass::from_bearing(290.0), Compass::Left);
        assert_eq!(Compass::from_bearing(300.0), Compass::UpLeft);
    }
}
