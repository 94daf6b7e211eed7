//! Operator link tasks: inbound admission and outbound delivery.
//!
//! Each connection generation runs one receiver and one sender thread sharing
//! a cancel flag. Either side raises `operator_dropped` on a link failure; the
//! reconnect supervisor then cancels the generation, shuts the socket down to
//! unblock the receiver, and joins both threads before reconnecting.

use crate::context::Context;
use crate::error::Result;
use crate::navigation::NavigationSequencer;
use crate::protocol::{Action, MovementCommand, OperatorRequest, OutboundMessage, RobotMode};
use crossbeam_channel::RecvTimeoutError;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Sender wake-up interval while the outbound queue is idle.
const SEND_POLL: Duration = Duration::from_millis(500);

/// Manual command that launches a fastest run instead of moving.
const FASTEST_RUN_TRIGGER: &str = "FC01";

/// Clears an alive flag when the owning thread exits, panics included.
struct AliveGuard(Arc<AtomicBool>);

impl AliveGuard {
    fn new(flag: &Arc<AtomicBool>) -> Self {
        flag.store(true, Ordering::Release);
        Self(Arc::clone(flag))
    }
}

impl Drop for AliveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Inbound side: parses operator requests and routes them.
pub struct OperatorReceiver {
    ctx: Context,
    cancel: Arc<AtomicBool>,
}

impl OperatorReceiver {
    pub fn new(ctx: Context, cancel: Arc<AtomicBool>) -> Self {
        Self { ctx, cancel }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn run(&self) {
        debug!("Operator receiver started");
        while !self.cancelled() {
            match self.ctx.operator.recv() {
                Ok(line) => self.handle(&line),
                Err(e) => {
                    if !self.cancelled() {
                        error!("Operator link is down: {}", e);
                        self.ctx.shared.record_link_error(&e);
                        self.ctx.shared.operator_dropped.raise();
                    }
                    break;
                }
            }
        }
        debug!("Operator receiver stopped");
    }

    /// Route one inbound frame.
    pub fn handle(&self, line: &str) {
        let request = match OperatorRequest::parse(line) {
            Ok(request) => request,
            Err(e) => {
                debug!("Dropped operator message {:?}: {}", line, e);
                return;
            }
        };
        debug!("Operator request: {:?}", request);

        let shared = &self.ctx.shared;
        let mode = shared.mode();

        match request {
            OperatorRequest::Mode(name) => shared.post_action(Action::Mode(name)),
            OperatorRequest::Manual(token) => {
                if mode != RobotMode::Manual {
                    self.reject("Manual movement not allowed in Path mode.");
                } else if token == FASTEST_RUN_TRIGGER {
                    self.start_fastest_run();
                } else {
                    debug!("Manual movement added to command queue: {}", token);
                    shared.commands.push(MovementCommand::new(token));
                }
            }
            OperatorRequest::Obstacles(obstacles) => {
                if mode == RobotMode::Path {
                    shared.post_action(Action::Obstacles(obstacles));
                } else {
                    self.reject("Robot must be in Path mode to set obstacles.");
                }
            }
            OperatorRequest::SingleObstacle(_) => {
                if mode == RobotMode::Path {
                    shared.post_action(Action::SingleObstacle);
                } else {
                    self.reject("Robot must be in Path mode to set single obstacle.");
                }
            }
            OperatorRequest::Control(control) => {
                if control != "start" {
                    debug!("Ignored control value {:?}", control);
                } else if mode == RobotMode::Path {
                    self.start_path();
                } else {
                    self.reject("Robot must be in Path mode to start robot on path.");
                }
            }
        }
    }

    fn start_path(&self) {
        let shared = &self.ctx.shared;

        if !self.ctx.planner.health() {
            error!("API is down! Start command aborted.");
            shared.notify(OutboundMessage::error("API is down, start command aborted."));
            self.ctx.signal_controller("ZZ04");
        }

        if shared.commands.is_empty() {
            self.reject("Command queue is empty, did you set obstacles?");
            return;
        }

        shared.unpause.raise();
        info!("Start command received, starting robot on path!");
        shared.notify(OutboundMessage::info("Starting robot on path!"));
        shared.notify(OutboundMessage::status("running"));
    }

    fn start_fastest_run(&self) {
        match NavigationSequencer::launch(self.ctx.clone()) {
            Ok(Some(_)) => info!("Fastest run launched"),
            Ok(None) => self.reject("Fastest run already in progress."),
            Err(e) => {
                error!("Failed to launch fastest run: {}", e);
                self.ctx
                    .shared
                    .notify(OutboundMessage::error("Failed to start fastest run."));
            }
        }
    }

    fn reject(&self, text: &str) {
        warn!("{}", text);
        self.ctx.shared.notify(OutboundMessage::error(text));
    }
}

/// Outbound side: drains the outbound queue onto the link.
pub struct OperatorSender {
    ctx: Context,
    cancel: Arc<AtomicBool>,
}

impl OperatorSender {
    pub fn new(ctx: Context, cancel: Arc<AtomicBool>) -> Self {
        Self { ctx, cancel }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    pub fn run(&self) {
        debug!("Operator sender started");
        let outbound = self.ctx.shared.outbound();

        while !self.cancelled() {
            let message = match outbound.recv_timeout(SEND_POLL) {
                Ok(message) => message,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let sent = message
                .to_json()
                .and_then(|json| self.ctx.operator.send(&json));
            if let Err(e) = sent {
                if self.cancelled() {
                    break;
                }
                error!("Failed to send to operator: {}", e);
                self.ctx.shared.record_link_error(&e);
                self.ctx.shared.operator_dropped.raise();
                // Leave the queue alone until the next generation takes over.
                while !self.cancelled() && !self.ctx.shared.should_shutdown() {
                    thread::sleep(SEND_POLL);
                }
                break;
            }
        }
        debug!("Operator sender stopped");
    }
}

/// Outcome of tearing down one operator generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminationReport {
    pub receiver_alive: bool,
    pub sender_alive: bool,
}

impl TerminationReport {
    pub fn is_clean(&self) -> bool {
        !self.receiver_alive && !self.sender_alive
    }
}

/// The receiver/sender pair of one connection generation.
pub struct OperatorTasks {
    receiver: JoinHandle<()>,
    sender: JoinHandle<()>,
    receiver_alive: Arc<AtomicBool>,
    sender_alive: Arc<AtomicBool>,
    cancel: Arc<AtomicBool>,
}

impl OperatorTasks {
    pub fn spawn(ctx: &Context) -> Result<Self> {
        let cancel = Arc::new(AtomicBool::new(false));
        let receiver_alive = Arc::new(AtomicBool::new(true));
        let sender_alive = Arc::new(AtomicBool::new(true));

        let receiver_task = OperatorReceiver::new(ctx.clone(), Arc::clone(&cancel));
        let alive = Arc::clone(&receiver_alive);
        let receiver = thread::Builder::new()
            .name("operator-recv".into())
            .spawn(move || {
                let _guard = AliveGuard::new(&alive);
                receiver_task.run();
            })?;

        let sender_task = OperatorSender::new(ctx.clone(), Arc::clone(&cancel));
        let alive = Arc::clone(&sender_alive);
        let sender = thread::Builder::new()
            .name("operator-send".into())
            .spawn(move || {
                let _guard = AliveGuard::new(&alive);
                sender_task.run();
            })?;

        Ok(Self {
            receiver,
            sender,
            receiver_alive,
            sender_alive,
            cancel,
        })
    }

    /// Cancel both threads, unblock the receiver and wait for both to exit.
    pub fn terminate(self, ctx: &Context) -> TerminationReport {
        self.cancel.store(true, Ordering::Release);
        ctx.operator.disconnect();

        if self.receiver.join().is_err() {
            error!("Operator receiver panicked");
        }
        if self.sender.join().is_err() {
            error!("Operator sender panicked");
        }

        TerminationReport {
            receiver_alive: self.receiver_alive.load(Ordering::Acquire),
            sender_alive: self.sender_alive.load(Ordering::Acquire),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::rig::Rig;
    use crate::protocol::Category;

    fn receiver(rig: &Rig) -> OperatorReceiver {
        OperatorReceiver::new(rig.ctx.clone(), Arc::new(AtomicBool::new(false)))
    }

    fn errors(rig: &Rig) -> Vec<String> {
        rig.outbound()
            .into_iter()
            .filter(|m| m.category == Category::Error)
            .filter_map(|m| m.text().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_manual_command_queued_in_manual_mode() {
        let rig = Rig::new();
        receiver(&rig).handle(r#"{"cat":"manual","value":"FW10"}"#);
        assert_eq!(rig.queued(), vec!["FW10"]);
    }

    #[test]
    fn test_manual_rejected_in_path_mode() {
        let rig = Rig::new();
        rig.ctx.shared.set_mode(RobotMode::Path);
        receiver(&rig).handle(r#"{"cat":"manual","value":"FW10"}"#);

        assert!(rig.queued().is_empty());
        assert_eq!(errors(&rig), vec!["Manual movement not allowed in Path mode."]);
    }

    #[test]
    fn test_path_only_requests() {
        let rig = Rig::new();
        let recv = receiver(&rig);
        recv.handle(r#"{"cat":"obstacles","value":{"obstacles":[]}}"#);
        recv.handle(r#"{"cat":"single-obstacle","value":""}"#);
        assert_eq!(errors(&rig).len(), 2);
        assert!(rig.ctx.shared.actions().try_recv().is_err());

        rig.ctx.shared.set_mode(RobotMode::Path);
        recv.handle(r#"{"cat":"single-obstacle","value":""}"#);
        assert_eq!(rig.ctx.shared.actions().try_recv().unwrap(), Action::SingleObstacle);
    }

    #[test]
    fn test_mode_request_becomes_action() {
        let rig = Rig::new();
        receiver(&rig).handle(r#"{"cat":"mode","value":"path"}"#);
        assert_eq!(
            rig.ctx.shared.actions().try_recv().unwrap(),
            Action::Mode("path".to_string())
        );
    }

    #[test]
    fn test_start_requires_commands() {
        let rig = Rig::new();
        rig.ctx.shared.set_mode(RobotMode::Path);
        rig.ctx.shared.unpause.lower();
        receiver(&rig).handle(r#"{"cat":"control","value":"start"}"#);

        assert!(!rig.ctx.shared.unpause.get());
        assert_eq!(errors(&rig), vec!["Command queue is empty, did you set obstacles?"]);
    }

    #[test]
    fn test_start_with_api_down_still_starts() {
        let rig = Rig::new();
        rig.ctx.shared.set_mode(RobotMode::Path);
        rig.ctx.shared.unpause.lower();
        rig.ctx.shared.commands.push("FW10".into());
        rig.planner.set_healthy(false);

        receiver(&rig).handle(r#"{"cat":"control","value":"start"}"#);

        assert!(rig.ctx.shared.unpause.get());
        assert_eq!(rig.controller.sent(), vec!["ZZ04"]);
        let out = rig.outbound();
        assert_eq!(out[0].text(), Some("API is down, start command aborted."));
        assert_eq!(out[1].text(), Some("Starting robot on path!"));
        assert_eq!(out[2].text(), Some("running"));
    }

    #[test]
    fn test_malformed_and_unknown_dropped() {
        let rig = Rig::new();
        let recv = receiver(&rig);
        recv.handle("{not json");
        recv.handle(r#"{"cat":"teleport","value":"home"}"#);
        assert!(rig.outbound().is_empty());
        assert!(rig.queued().is_empty());
    }

    #[test]
    fn test_recv_failure_raises_dropped() {
        let rig = Rig::new();
        rig.operator.inject_failure();
        receiver(&rig).run();
        assert!(rig.ctx.shared.operator_dropped.get());
        assert!(!rig.ctx.shared.link_health.lock().connected);
    }

    #[test]
    fn test_sender_delivers_json_lines() {
        let rig = Rig::new();
        let tasks = OperatorTasks::spawn(&rig.ctx).unwrap();
        rig.ctx.shared.notify(OutboundMessage::info("hello"));

        let sent = rig.operator.next_sent(Duration::from_secs(2)).unwrap();
        assert_eq!(sent, r#"{"cat":"info","value":"hello"}"#);

        let report = tasks.terminate(&rig.ctx);
        assert!(report.is_clean());
        assert!(!rig.ctx.shared.operator_dropped.get());
    }
}
