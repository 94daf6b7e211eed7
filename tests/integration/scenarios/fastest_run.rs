//! Fastest run branching and measurements.

use crate::harness::TestHarness;
use sarathi::config::NavigationConfig;
use sarathi::navigation::{Branch, Course, NavigationSequencer};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

fn first_obstacle(h: &TestHarness, image_id: &str) -> Vec<String> {
    h.vision.answer(image_id);
    // Already at the obstacle: the approach only stops.
    h.ctx.shared.front_clear.lower();

    let mut sequencer = NavigationSequencer::new(h.ctx.clone());
    sequencer.approach().unwrap();
    let branch = sequencer.classify(1);
    sequencer
        .run_maneuver(&Course::default().obstacle_one, &branch)
        .unwrap();
    h.queued()
}

#[test]
fn test_right_arrow_goes_right() {
    let h = TestHarness::new();
    assert_eq!(first_obstacle(&h, "38"), vec!["FR30", "FL30", "FL30", "FR30"]);
}

#[test]
fn test_left_arrow_is_mirrored() {
    let h = TestHarness::new();
    assert_eq!(first_obstacle(&h, "39"), vec!["FL30", "FR30", "FR30", "FL30"]);
}

#[test]
fn test_other_image_takes_right_route() {
    let h = TestHarness::new();
    assert_eq!(first_obstacle(&h, "12"), vec!["FR30", "FL30", "FL30", "FR30"]);
}

#[test]
fn test_gap_keeps_largest_plausible_sample() {
    let h = TestHarness::new();
    let sequencer = NavigationSequencer::new(h.ctx.clone());
    let mut samples = [10.0, 160.0, 30.0, 200.0, 40.0].into_iter();
    assert_eq!(sequencer.sample_gap(|| samples.next().unwrap_or(0.0)), 110);
}

#[test]
fn test_full_run_with_sensors_blocked_ahead() {
    let h = TestHarness::new();
    h.vision.answer("39");
    h.vision.answer("38");
    h.ctx.shared.front_clear.lower();

    let mut sequencer = NavigationSequencer::new(h.ctx.clone());
    sequencer.run().unwrap();

    let state = sequencer.state();
    assert_eq!(state.first, Some(Branch::Left));
    assert_eq!(state.second, Some(Branch::Right));
    // No distance reading yet: fallback plus offset.
    assert_eq!(state.gap_cm, 170);
    // Only the trailing step beside the second obstacle.
    assert_eq!(state.lateral_cm, 10);

    assert_eq!(h.queued(), vec!["STOP", "ZZ02"]);
    let uploads = h.vision.uploads();
    assert_eq!(uploads.len(), 2);
    assert!(uploads[0].ends_with("_1_C.jpg"));
    assert!(uploads[1].ends_with("_2_C.jpg"));
}

#[test]
fn test_full_run_distances_follow_the_pass() {
    const BLOCKED_STEPS: usize = 3;
    // Short but nonzero pauses so the drain below keeps up with every clear.
    let h = TestHarness::with_navigation(NavigationConfig {
        time_scale: 0.01,
        ..NavigationConfig::default()
    });
    h.vision.answer("39");
    h.vision.answer("38");
    h.ctx.shared.front_clear.lower();
    h.ctx.shared.left_clear.lower();

    // Stand-in for the controller: takes every command as it is queued and
    // clears the left side after the robot has stepped along the obstacle.
    let finished = Arc::new(AtomicBool::new(false));
    let drain = {
        let shared = Arc::clone(&h.ctx.shared);
        let finished = Arc::clone(&finished);
        thread::spawn(move || {
            let mut taken = Vec::new();
            let mut steps = 0;
            while !finished.load(Ordering::Acquire) || !shared.commands.is_empty() {
                let Some((command, _)) = shared.commands.pop_timeout(Duration::from_millis(5)) else {
                    continue;
                };
                if command.as_str() == "FW10" {
                    steps += 1;
                    if steps == BLOCKED_STEPS {
                        shared.left_clear.raise();
                    }
                }
                taken.push(command.as_str().to_string());
            }
            taken
        })
    };

    let mut sequencer = NavigationSequencer::new(h.ctx.clone());
    sequencer.run().unwrap();
    finished.store(true, Ordering::Release);
    let taken = drain.join().unwrap();

    assert_eq!(sequencer.state().lateral_cm, 40);
    let tail = [
        // Beside the second obstacle: three blocked steps and the trailing one
        "FR30", "FW10", "FW10", "FW10", "FW10", "FL30", "FW10",
        // Across the back: 2 * 40 + 30
        "FL30", "FW99", "FW11", "FL30",
        // Home: the 170 cm gap, then 2 * 40 / 4 + 20
        "FW99", "FW71", "FL30", "FW40", "FR30", "STOP", "ZZ02",
    ];
    let start = taken.len().saturating_sub(tail.len());
    assert_eq!(&taken[start..], &tail[..], "commands taken: {:?}", taken);
}

#[test]
fn test_run_survives_classification_failure() {
    let h = TestHarness::new();
    h.camera.set_failure(true);
    h.ctx.shared.front_clear.lower();

    let mut sequencer = NavigationSequencer::new(h.ctx.clone());
    sequencer.run().unwrap();

    assert_eq!(sequencer.state().first, Some(Branch::Default(None)));
    assert_eq!(h.queued(), vec!["STOP", "ZZ02"]);
}

#[test]
fn test_launch_runs_once_at_a_time() {
    let h = TestHarness::new();
    h.ctx.shared.front_clear.lower();

    let handle = NavigationSequencer::launch(h.ctx.clone()).unwrap().unwrap();
    handle.join().unwrap();
    assert!(!h
        .ctx
        .shared
        .fastest_run_active
        .load(std::sync::atomic::Ordering::Acquire));
    assert_eq!(h.queued().last().map(String::as_str), Some("ZZ02"));
}
