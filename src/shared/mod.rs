//! Synchronisation primitives and the state shared by all threads.

mod flag;
mod motion_lock;
mod queues;
mod state;

pub use flag::Flag;
pub use motion_lock::MotionLock;
pub use queues::CommandQueue;
pub use state::{LinkHealth, SharedState, Side};
