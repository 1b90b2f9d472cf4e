//! Screen geometry primitives

pub mod point;
pub mod region;
pub mod scale;

pub use point::{PixelPoint, ScreenPoint};
pub use region::{Region, ScreenSize};
pub use scale::ScaleRange;
