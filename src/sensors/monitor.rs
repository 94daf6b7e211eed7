//! Sensor polling loops.
//!
//! One thread per sensor, each sampling at the configured interval:
//! - Front: distance into the short- and long-range flags, plus last reading
//! - Left/right: proximity into the matching side flag, no debounce
//!
//! A failed read is logged and skipped; the flag keeps its previous value.

use super::{Debouncer, DistanceSensor, ProximitySensor};
use crate::config::SensorConfig;
use crate::error::Result;
use crate::shared::{SharedState, Side};
use log::{debug, info, warn};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Front distance loop state.
pub struct FrontMonitor {
    sensor: Box<dyn DistanceSensor>,
    shared_state: Arc<SharedState>,
    short: Debouncer,
    long: Debouncer,
    interval: Duration,
}

impl FrontMonitor {
    pub fn new(
        sensor: Box<dyn DistanceSensor>,
        shared_state: Arc<SharedState>,
        config: &SensorConfig,
    ) -> Self {
        Self {
            sensor,
            shared_state,
            short: Debouncer::new(config.short_threshold_cm, config.debounce_samples),
            long: Debouncer::new(config.long_threshold_cm, config.debounce_samples),
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Take one sample and publish it.
    pub fn step(&mut self) {
        let cm = match self.sensor.read_cm() {
            Ok(cm) => cm,
            Err(e) => {
                warn!("Front distance read failed: {}", e);
                return;
            }
        };

        self.shared_state.set_last_distance(cm);
        let short_clear = self.short.update(cm);
        let long_clear = self.long.update(cm);

        if self.shared_state.front_clear.set(short_clear) != short_clear {
            debug!(
                "Front {} at {:.1} cm",
                if short_clear { "clear" } else { "blocked" },
                cm
            );
        }
        self.shared_state.long_clear.set(long_clear);
    }

    pub fn run(&mut self) {
        info!("Front sensor loop started");
        while !self.shared_state.should_shutdown() {
            self.step();
            thread::sleep(self.interval);
        }
        info!("Front sensor loop stopped");
    }
}

/// Side proximity loop state.
pub struct ProximityMonitor {
    side: Side,
    sensor: Box<dyn ProximitySensor>,
    shared_state: Arc<SharedState>,
    interval: Duration,
}

impl ProximityMonitor {
    pub fn new(
        side: Side,
        sensor: Box<dyn ProximitySensor>,
        shared_state: Arc<SharedState>,
        config: &SensorConfig,
    ) -> Self {
        Self {
            side,
            sensor,
            shared_state,
            interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    pub fn step(&mut self) {
        match self.sensor.read_clear() {
            Ok(clear) => {
                if self.shared_state.proximity(self.side).set(clear) != clear {
                    debug!("{:?} proximity {}", self.side, if clear { "clear" } else { "blocked" });
                }
            }
            Err(e) => warn!("{:?} proximity read failed: {}", self.side, e),
        }
    }

    pub fn run(&mut self) {
        info!("{:?} proximity loop started", self.side);
        while !self.shared_state.should_shutdown() {
            self.step();
            thread::sleep(self.interval);
        }
    }
}

/// Join handles of the sensor threads.
pub struct SensorHandles {
    pub front: JoinHandle<()>,
    pub left: JoinHandle<()>,
    pub right: JoinHandle<()>,
}

/// Spawn the three sensor loops.
pub fn spawn_monitors(
    front: Box<dyn DistanceSensor>,
    left: Box<dyn ProximitySensor>,
    right: Box<dyn ProximitySensor>,
    shared_state: Arc<SharedState>,
    config: &SensorConfig,
) -> Result<SensorHandles> {
    let mut front_monitor = FrontMonitor::new(front, Arc::clone(&shared_state), config);
    let mut left_monitor = ProximityMonitor::new(Side::Left, left, Arc::clone(&shared_state), config);
    let mut right_monitor = ProximityMonitor::new(Side::Right, right, shared_state, config);

    let front = thread::Builder::new()
        .name("sensor-front".into())
        .spawn(move || front_monitor.run())?;
    let left = thread::Builder::new()
        .name("sensor-left".into())
        .spawn(move || left_monitor.run())?;
    let right = thread::Builder::new()
        .name("sensor-right".into())
        .spawn(move || right_monitor.run())?;

    Ok(SensorHandles { front, left, right })
}
