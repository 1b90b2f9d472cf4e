//! Navigation effects: sessions and drags
//!
//! The decisions come from `trailblazer_core::navigation`; this module
//! performs them with the input driver and the clock.

pub mod controller;
pub mod drag;

pub use controller::{NavigationController, SessionReport};
pub use drag::{DragExecutor, PressedButton};
