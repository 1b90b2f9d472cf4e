//! Bearings: 0° points up, angles grow clockwise

pub mod circular;
pub mod ema;
pub mod heading;

pub use circular::{angular_distance, normalize, summarize, wrap_signed, CircularAccumulator, CircularSummary};
pub use ema::BearingEma;
pub use heading::{bearing_from_offset, offset_along, BearingSample, Compass};
