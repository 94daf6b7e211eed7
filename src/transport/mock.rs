//! In-memory link for tests

use super::Link;
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

/// How often a blocked `recv` re-checks the connection state.
const POLL: Duration = Duration::from_millis(10);

/// Mock link: injected messages are returned by `recv`, sent messages are recorded.
pub struct MockLink {
    name: &'static str,
    inbound_tx: Sender<Result<String>>,
    inbound_rx: Receiver<Result<String>>,
    sent_tx: Sender<String>,
    sent_rx: Receiver<String>,
    history: Mutex<Vec<String>>,
    connected: AtomicBool,
    fail_send: AtomicBool,
    connects: AtomicUsize,
}

impl MockLink {
    pub fn new(name: &'static str) -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        let (sent_tx, sent_rx) = unbounded();
        Self {
            name,
            inbound_tx,
            inbound_rx,
            sent_tx,
            sent_rx,
            history: Mutex::new(Vec::new()),
            connected: AtomicBool::new(true),
            fail_send: AtomicBool::new(false),
            connects: AtomicUsize::new(0),
        }
    }

    /// Queue a message for `recv`.
    pub fn inject(&self, message: &str) {
        let _ = self.inbound_tx.send(Ok(message.to_string()));
    }

    /// Make the next `recv` fail as if the peer went away.
    pub fn inject_failure(&self) {
        let _ = self.inbound_tx.send(Err(Error::LinkClosed(self.name)));
    }

    /// Make every `send` fail until reset.
    pub fn set_send_failure(&self, fail: bool) {
        self.fail_send.store(fail, Ordering::Relaxed);
    }

    /// Wait for the next sent message.
    pub fn next_sent(&self, timeout: Duration) -> Option<String> {
        self.sent_rx.recv_timeout(timeout).ok()
    }

    /// Everything sent so far.
    pub fn sent(&self) -> Vec<String> {
        self.history.lock().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Number of successful `connect` calls.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::Relaxed)
    }
}

impl Link for MockLink {
    fn name(&self) -> &'static str {
        self.name
    }

    fn connect(&self) -> Result<()> {
        self.connected.store(true, Ordering::Relaxed);
        self.connects.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    fn send(&self, message: &str) -> Result<()> {
        if !self.is_connected() {
            return Err(Error::NotConnected(self.name));
        }
        if self.fail_send.load(Ordering::Relaxed) {
            return Err(Error::LinkClosed(self.name));
        }
        self.history.lock().push(message.to_string());
        let _ = self.sent_tx.send(message.to_string());
        Ok(())
    }

    fn recv(&self) -> Result<String> {
        loop {
            if !self.is_connected() {
                return Err(Error::LinkClosed(self.name));
            }
            match self.inbound_rx.recv_timeout(POLL) {
                Ok(message) => return message,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => return Err(Error::LinkClosed(self.name)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_inject_and_record() {
        let link = MockLink::new("test");
        link.inject("ACK");
        assert_eq!(link.recv().unwrap(), "ACK");

        link.send("FW10").unwrap();
        assert_eq!(link.next_sent(Duration::from_millis(10)).as_deref(), Some("FW10"));
        assert_eq!(link.sent(), vec!["FW10"]);
    }

    #[test]
    fn test_disconnect_unblocks_recv() {
        let link = Arc::new(MockLink::new("test"));
        let receiver = {
            let link = Arc::clone(&link);
            thread::spawn(move || link.recv())
        };

        thread::sleep(Duration::from_millis(20));
        link.disconnect();
        assert!(matches!(receiver.join().unwrap(), Err(Error::LinkClosed(_))));
    }
}
