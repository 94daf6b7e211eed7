//! Transport layer for the operator and controller links
//!
//! Both links carry line-oriented text. A link is shared between a receiving
//! thread and one or more sending threads, so every method takes `&self` and
//! implementations guard each direction separately.

use crate::error::Result;

mod mock;
mod serial;
mod tcp;

pub use mock::MockLink;
pub use serial::SerialLink;
pub use tcp::TcpLink;

/// Bidirectional text link.
pub trait Link: Send + Sync {
    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Establish the link, blocking until a peer is available
    fn connect(&self) -> Result<()>;

    /// Tear the link down, unblocking any pending `recv`
    fn disconnect(&self);

    /// Send one message
    fn send(&self, message: &str) -> Result<()>;

    /// Block until one complete message arrives
    fn recv(&self) -> Result<String>;

    /// Abort any pending or future `connect` (process shutdown)
    fn close(&self) {
        self.disconnect();
    }
}
