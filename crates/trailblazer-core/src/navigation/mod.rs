//! Closed-loop navigation: configuration, control laws and the session state machine

pub mod config;
pub mod feedback;
pub mod hold;
pub mod state;

pub use config::{FeedbackConfig, NavigationConfig};
pub use feedback::{FeedbackAction, FeedbackTracker, ReleaseReason};
pub use hold::hold_for_spread;
pub use state::{Decision, DragPlan, DragStrategy, EndReason, NavigationPhase, NavigationState, Observation};
