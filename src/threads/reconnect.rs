//! Operator reconnect supervisor, run on the main thread.

use super::operator::{OperatorTasks, TerminationReport};
use crate::context::Context;
use crate::error::Result;
use crate::protocol::OutboundMessage;
use log::{error, info, warn};
use std::thread;
use std::time::Duration;

const POLL: Duration = Duration::from_millis(500);

pub struct ReconnectSupervisor {
    ctx: Context,
}

impl ReconnectSupervisor {
    pub fn new(ctx: Context) -> Self {
        Self { ctx }
    }

    /// Watch the dropped flag until shutdown, replacing the operator tasks
    /// after every failure.
    ///
    /// Returns the generation still running at shutdown, if any.
    pub fn run(&self, tasks: OperatorTasks) -> Result<Option<OperatorTasks>> {
        let shared = &self.ctx.shared;
        let mut tasks = tasks;
        info!("Reconnect supervisor started");

        while !shared.should_shutdown() {
            if !shared.operator_dropped.wait_for_timeout(true, POLL) || shared.should_shutdown() {
                continue;
            }

            warn!("Operator link dropped, reconnecting");
            let (next, report) = self.recover(tasks)?;
            if !report.is_clean() {
                error!("Operator tasks still alive after termination: {:?}", report);
            }
            match next {
                Some(next) => tasks = next,
                None => {
                    info!("Shutdown during reconnect");
                    return Ok(None);
                }
            }
        }

        info!("Reconnect supervisor stopped");
        Ok(Some(tasks))
    }

    /// Tear down one generation and bring up the next.
    ///
    /// Returns `None` for the new generation when shutdown arrived while
    /// waiting for the operator to come back.
    pub fn recover(
        &self,
        tasks: OperatorTasks,
    ) -> Result<(Option<OperatorTasks>, TerminationReport)> {
        let shared = &self.ctx.shared;
        self.ctx.signal_controller("ZZ03");

        let report = tasks.terminate(&self.ctx);
        if report.is_clean() {
            info!("Operator tasks terminated");
        }

        self.ctx.operator.disconnect();
        loop {
            if shared.should_shutdown() {
                return Ok((None, report));
            }
            match self.ctx.operator.connect() {
                Ok(()) => break,
                Err(e) => {
                    warn!("Operator reconnect failed: {}", e);
                    thread::sleep(self.ctx.config.reconnect_retry());
                }
            }
        }
        shared.record_link_connected();

        let next = OperatorTasks::spawn(&self.ctx)?;
        info!("Operator reconnected");
        shared.notify(OutboundMessage::info("You are reconnected!"));
        shared.notify(OutboundMessage::mode(shared.mode()));
        self.ctx.signal_controller("ZZ02");
        shared.operator_dropped.lower();

        Ok((Some(next), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::rig::Rig;
    use crate::protocol::Category;

    #[test]
    fn test_recover_replaces_generation() {
        let rig = Rig::new();
        let tasks = OperatorTasks::spawn(&rig.ctx).unwrap();
        rig.ctx.shared.operator_dropped.raise();

        let supervisor = ReconnectSupervisor::new(rig.ctx.clone());
        let (next, report) = supervisor.recover(tasks).unwrap();
        let next = next.unwrap();

        assert!(report.is_clean());
        assert!(!rig.ctx.shared.operator_dropped.get());
        assert_eq!(rig.controller.sent(), vec!["ZZ03", "ZZ02"]);
        assert_eq!(rig.operator.connect_count(), 1);

        // The new sender delivers the reconnect notices.
        let first = rig.operator.next_sent(Duration::from_secs(2)).unwrap();
        let second = rig.operator.next_sent(Duration::from_secs(2)).unwrap();
        assert_eq!(first, r#"{"cat":"info","value":"You are reconnected!"}"#);
        assert_eq!(second, r#"{"cat":"mode","value":"manual"}"#);

        assert!(next.terminate(&rig.ctx).is_clean());
        assert!(rig.outbound().iter().all(|m| m.category != Category::Error));
    }

    #[test]
    fn test_shutdown_aborts_reconnect() {
        let rig = Rig::new();
        let tasks = OperatorTasks::spawn(&rig.ctx).unwrap();
        rig.ctx.shared.signal_shutdown();

        let (next, report) = ReconnectSupervisor::new(rig.ctx.clone())
            .recover(tasks)
            .unwrap();
        assert!(next.is_none());
        assert!(report.is_clean());
    }
}
