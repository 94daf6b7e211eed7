//! Mode changes requested by the operator.

use crate::harness::TestHarness;
use sarathi::protocol::{Category, RobotMode, Waypoint};
use sarathi::threads::{OperatorReceiver, spawn_threads};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

#[test]
fn test_switch_to_path_drains_and_pauses() {
    let h = TestHarness::new();
    let shared = &h.ctx.shared;
    shared.unpause.lower();
    shared.commands.push("FW10".into());
    shared
        .commands
        .push_planned("FR00".into(), Waypoint::new(1, 2, 0, -1));
    shared.motion_lock.acquire();

    let handles = spawn_threads(&h.ctx).unwrap();
    let receiver = OperatorReceiver::new(h.ctx.clone(), Arc::new(AtomicBool::new(false)));
    receiver.handle(r#"{"cat":"mode","value":"path"}"#);

    let info = h.next_outbound().unwrap();
    assert_eq!(info.text(), Some("Robot is now in Path mode."));
    assert_eq!(shared.mode(), RobotMode::Path);
    assert!(shared.commands.is_empty());
    assert_eq!(shared.commands.waypoint_len(), 0);
    assert!(!shared.unpause.get());
    assert!(!shared.motion_lock.is_held());
    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("ZZ01"));

    // Manual movement is now refused.
    receiver.handle(r#"{"cat":"manual","value":"FW10"}"#);
    let error = h.next_outbound().unwrap();
    assert_eq!(error.category, Category::Error);
    assert!(shared.commands.is_empty());

    receiver.handle(r#"{"cat":"mode","value":"path"}"#);
    let error = h.next_outbound().unwrap();
    assert_eq!(error.text(), Some("Robot already in Path mode."));

    h.shutdown();
    handles.command.join().unwrap();
    handles.ack.join().unwrap();
    handles.actions.join().unwrap();
}

#[test]
fn test_single_obstacle_then_start() {
    let h = TestHarness::new();
    let handles = spawn_threads(&h.ctx).unwrap();
    let receiver = OperatorReceiver::new(h.ctx.clone(), Arc::new(AtomicBool::new(false)));

    receiver.handle(r#"{"cat":"mode","value":"path"}"#);
    assert_eq!(h.next_outbound().unwrap().text(), Some("Robot is now in Path mode."));

    receiver.handle(r#"{"cat":"single-obstacle","value":""}"#);
    assert_eq!(
        h.next_outbound().unwrap().text(),
        Some("Navigate-around-obstacle path loaded. Robot is ready to move.")
    );

    receiver.handle(r#"{"cat":"control","value":"start"}"#);
    assert_eq!(h.next_outbound().unwrap().text(), Some("Starting robot on path!"));
    assert_eq!(h.next_outbound().unwrap().text(), Some("running"));

    // ZZ01 from the mode change, then the first path command.
    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("ZZ01"));
    assert_eq!(h.next_controller(Duration::from_secs(3)).as_deref(), Some("DT20"));

    h.shutdown();
    handles.command.join().unwrap();
    handles.ack.join().unwrap();
    handles.actions.join().unwrap();
}
