//! Sensor sources and the polling loops that debounce them into shared flags.
//!
//! The hardware side is read through the kernel's sysfs interfaces:
//!
//! | Sensor | Source | Unit |
//! |--------|--------|------|
//! | Front distance | IIO `in_distance_raw` | mm |
//! | Left/right proximity | GPIO `value` | `1` = clear |

mod debounce;
mod monitor;

pub use debounce::Debouncer;
pub use monitor::{FrontMonitor, ProximityMonitor, SensorHandles, spawn_monitors};

use crate::error::{Error, Result};
use std::fs;
use std::path::PathBuf;

/// Forward-facing range sensor.
pub trait DistanceSensor: Send {
    /// Current distance in centimetres.
    fn read_cm(&mut self) -> Result<f32>;
}

/// Side-facing digital obstacle sensor.
pub trait ProximitySensor: Send {
    /// `true` when nothing is beside the robot.
    fn read_clear(&mut self) -> Result<bool>;
}

/// Distance from a Linux IIO device attribute.
pub struct IioDistance {
    path: PathBuf,
}

impl IioDistance {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DistanceSensor for IioDistance {
    fn read_cm(&mut self) -> Result<f32> {
        let raw = fs::read_to_string(&self.path)?;
        let mm: f32 = raw
            .trim()
            .parse()
            .map_err(|_| Error::Sensor(format!("bad distance reading '{}'", raw.trim())))?;
        Ok(mm / 10.0)
    }
}

/// Proximity from a sysfs GPIO value file.
pub struct GpioProximity {
    path: PathBuf,
}

impl GpioProximity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProximitySensor for GpioProximity {
    fn read_clear(&mut self) -> Result<bool> {
        let raw = fs::read_to_string(&self.path)?;
        match raw.trim() {
            "0" => Ok(false),
            "" => Err(Error::Sensor(format!("empty read from {}", self.path.display()))),
            _ => Ok(true),
        }
    }
}
