//! Operator link loss and recovery.

use crate::harness::{TestHarness, WAIT};
use sarathi::threads::{OperatorTasks, ReconnectSupervisor};
use std::thread;

#[test]
fn test_drop_restarts_operator_tasks_once() {
    let h = TestHarness::new();
    let tasks = OperatorTasks::spawn(&h.ctx).unwrap();

    let supervisor = {
        let ctx = h.ctx.clone();
        thread::spawn(move || ReconnectSupervisor::new(ctx).run(tasks))
    };

    h.operator.inject_failure();

    let mut seen = Vec::new();
    while let Some(sent) = h.operator.next_sent(WAIT) {
        let done = sent.contains(r#""cat":"mode""#);
        seen.push(sent);
        if done {
            break;
        }
    }
    assert_eq!(
        seen,
        vec![
            r#"{"cat":"info","value":"You are reconnected!"}"#.to_string(),
            r#"{"cat":"mode","value":"manual"}"#.to_string(),
        ]
    );
    assert_eq!(h.operator.connect_count(), 1);
    assert!(h.wait_until(|| !h.ctx.shared.operator_dropped.get()));
    assert!(h.ctx.shared.link_health.lock().connected);

    // Normal traffic flows through the new generation.
    h.ctx
        .shared
        .notify(sarathi::protocol::OutboundMessage::info("still here"));
    assert_eq!(
        h.operator.next_sent(WAIT).as_deref(),
        Some(r#"{"cat":"info","value":"still here"}"#)
    );

    h.ctx.shared.signal_shutdown();
    let remaining = supervisor.join().unwrap().unwrap().unwrap();
    assert!(remaining.terminate(&h.ctx).is_clean());

    assert_eq!(h.controller.sent(), vec!["ZZ03", "ZZ02"]);
    let reconnected = h
        .operator
        .sent()
        .iter()
        .filter(|m| m.contains("You are reconnected!"))
        .count();
    assert_eq!(reconnected, 1);
}
