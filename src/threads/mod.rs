//! Coordinator threads.
//!
//! - Command sequencer: queue -> motion lock -> controller
//! - Acknowledgement listener: controller `ACK` -> lock release, locations
//! - Action dispatcher: mode changes, path loading, snapshots, stitching
//! - Operator receiver/sender: one pair per connection generation
//! - Reconnect supervisor: replaces the operator pair after a drop (main thread)

mod ack;
mod actions;
mod command;
mod operator;
mod reconnect;

pub use ack::AckListener;
pub use actions::ActionDispatcher;
pub use command::CommandSequencer;
pub use operator::{OperatorReceiver, OperatorSender, OperatorTasks, TerminationReport};
pub use reconnect::ReconnectSupervisor;

use crate::context::Context;
use crate::error::Result;
use log::error;
use std::thread::{self, JoinHandle};

/// Handles of the long-lived worker threads.
pub struct ThreadHandles {
    pub command: JoinHandle<()>,
    pub ack: JoinHandle<()>,
    pub actions: JoinHandle<()>,
}

/// Spawn the sequencer, the acknowledgement listener and the action dispatcher.
pub fn spawn_threads(ctx: &Context) -> Result<ThreadHandles> {
    let sequencer = CommandSequencer::new(ctx.clone());
    let command_handle = thread::Builder::new()
        .name("command-seq".into())
        .spawn(move || {
            if let Err(e) = sequencer.run() {
                error!("Command sequencer stopped: {}", e);
            }
        })?;

    let listener = AckListener::new(ctx.clone());
    let ack_handle = thread::Builder::new()
        .name("controller-ack".into())
        .spawn(move || listener.run())?;

    let dispatcher = ActionDispatcher::new(ctx.clone());
    let actions_handle = thread::Builder::new()
        .name("actions".into())
        .spawn(move || dispatcher.run())?;

    Ok(ThreadHandles {
        command: command_handle,
        ack: ack_handle,
        actions: actions_handle,
    })
}
