//! Queue -> controller -> ACK flow through the real worker threads.

use crate::harness::TestHarness;
use sarathi::protocol::{Category, MovementCommand, RobotMode, Waypoint};
use sarathi::threads::spawn_threads;
use serde_json::json;
use std::time::Duration;

#[test]
fn test_commands_wait_for_ack() {
    let h = TestHarness::new();
    let handles = spawn_threads(&h.ctx).unwrap();

    h.ctx.shared.commands.push(MovementCommand::forward(10));
    h.ctx.shared.commands.push(MovementCommand::stop());

    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("FW10"));
    // STOP is held back until FW10 is acknowledged.
    assert_eq!(h.next_controller(Duration::from_millis(300)), None);

    h.controller.inject("ACK");
    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("STOP"));

    h.controller.inject("ACK");
    assert!(h.wait_until(|| !h.ctx.shared.motion_lock.is_held()));
    assert_eq!(h.controller.sent(), vec!["FW10", "STOP"]);

    h.shutdown();
    handles.command.join().unwrap();
    handles.ack.join().unwrap();
    handles.actions.join().unwrap();
}

#[test]
fn test_path_mode_reports_one_location_per_ack() {
    let h = TestHarness::new();
    let shared = &h.ctx.shared;
    shared.set_mode(RobotMode::Path);
    shared.unpause.lower();
    shared
        .commands
        .push_planned("FW10".into(), Waypoint::new(1, 2, 0, -1));
    shared
        .commands
        .push_planned("FR00".into(), Waypoint::new(2, 3, 2, -1));

    let handles = spawn_threads(&h.ctx).unwrap();
    assert_eq!(h.next_controller(Duration::from_millis(300)), None);

    shared.unpause.raise();
    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("FW10"));
    h.controller.inject("ACK");

    let location = h.next_outbound().unwrap();
    assert_eq!(location.category, Category::Location);
    assert_eq!(location.value, json!({"x": 1, "y": 2, "d": 0}));

    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("FR00"));
    h.controller.inject("ACK");
    let location = h.next_outbound().unwrap();
    assert_eq!(location.value, json!({"x": 2, "y": 3, "d": 2}));
    assert_eq!(shared.commands.waypoint_len(), 0);

    h.shutdown();
    handles.command.join().unwrap();
    handles.ack.join().unwrap();
    handles.actions.join().unwrap();
}

#[test]
fn test_snapshot_classifies_and_continues() {
    let h = TestHarness::new();
    h.vision.answer("11");
    let handles = spawn_threads(&h.ctx).unwrap();

    h.ctx.shared.commands.push("SNAP2_L".into());
    h.ctx.shared.commands.push("FW10".into());

    let rec = h.next_outbound().unwrap();
    assert_eq!(rec.category, Category::ImageRec);
    assert_eq!(rec.value, json!({"image_id": "11", "obstacle_id": "2"}));

    // The dispatcher released the lock, so the next command goes out.
    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("FW10"));
    assert!(h.vision.uploads()[0].ends_with("_2_L.jpg"));

    h.shutdown();
    handles.command.join().unwrap();
    handles.ack.join().unwrap();
    handles.actions.join().unwrap();
}
