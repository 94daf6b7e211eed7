//! Wire vocabulary: controller commands, operator messages and dispatcher actions.

pub mod action;
pub mod command;
pub mod message;

pub use action::Action;
pub use command::{CommandKind, MovementCommand, forward_chunks};
pub use message::{Category, OperatorRequest, OutboundMessage, RobotMode, Waypoint};
