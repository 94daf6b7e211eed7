//! Autonomous two-obstacle fastest run.

pub mod maneuver;
pub mod sequencer;
pub mod state;

pub use maneuver::{Course, DistanceRule, Step, mirror};
pub use sequencer::NavigationSequencer;
pub use state::{Branch, NavigationState};
