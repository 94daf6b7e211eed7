//! Sensor loops feeding the shared flags.

use sarathi::config::SensorConfig;
use sarathi::error::{Error, Result};
use sarathi::sensors::{DistanceSensor, FrontMonitor, GpioProximity, ProximityMonitor};
use sarathi::shared::{SharedState, Side};
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;

struct Scripted(VecDeque<f32>);

impl DistanceSensor for Scripted {
    fn read_cm(&mut self) -> Result<f32> {
        self.0
            .pop_front()
            .ok_or_else(|| Error::Sensor("no more samples".into()))
    }
}

#[test]
fn test_front_flag_hysteresis() {
    let shared = Arc::new(SharedState::new());
    let samples = [20.0, 40.0, 20.0, 20.0, 25.0, 30.0];
    let mut monitor = FrontMonitor::new(
        Box::new(Scripted(samples.into_iter().collect())),
        Arc::clone(&shared),
        &SensorConfig::default(),
    );

    let mut observed = Vec::new();
    for _ in 0..samples.len() {
        monitor.step();
        observed.push(shared.front_clear.get());
    }
    assert_eq!(observed, vec![true, true, true, false, false, true]);
    assert_eq!(shared.last_distance(), 30.0);
    // Everything under 50 cm after two samples also blocks the long-range flag.
    assert!(!shared.long_clear.get());

    // A failed read leaves the flags alone.
    monitor.step();
    assert!(shared.front_clear.get());
}

#[test]
fn test_gpio_proximity_drives_side_flag() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "0").unwrap();

    let shared = Arc::new(SharedState::new());
    let mut monitor = ProximityMonitor::new(
        Side::Right,
        Box::new(GpioProximity::new(file.path())),
        Arc::clone(&shared),
        &SensorConfig::default(),
    );

    monitor.step();
    assert!(!shared.right_clear.get());
    assert!(shared.left_clear.get());

    std::fs::write(file.path(), "1\n").unwrap();
    monitor.step();
    assert!(shared.right_clear.get());
}
