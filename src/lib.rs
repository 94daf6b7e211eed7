//! Sarathi - onboard coordinator for a course-running ground robot
//!
//! Bridges an operator console (newline-delimited JSON over TCP) and a motion
//! controller (ASCII tokens over serial), one movement command in flight at a
//! time. Also hosts the sensor loops, the image-recognition and path-planning
//! service clients, and the autonomous two-obstacle fastest run.

pub mod config;
pub mod context;
pub mod error;
pub mod mode;
pub mod navigation;
pub mod protocol;
pub mod sensors;
pub mod services;
pub mod shared;
pub mod threads;
pub mod transport;

// Re-export commonly used types
pub use config::Config;
pub use context::Context;
pub use error::{Error, Result};
