//! Operator link: TCP server, one client at a time.
//!
//! # Wire Format
//!
//! Newline-delimited JSON, one object per line in each direction:
//!
//! ```text
//! {"cat": "manual", "value": "FW10"}\n
//! ```
//!
//! # Connection Lifecycle
//!
//! ```text
//! 1. connect() binds the listener on first use and accepts one client
//! 2. recv()/send() run on separate threads through cloned streams
//! 3. disconnect() shuts the socket down; a blocked recv() returns LinkClosed
//! 4. connect() accepts the next client on the same listener
//! ```

use super::Link;
use crate::error::{Error, Result};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

const NAME: &str = "operator";

/// Poll interval while waiting for a client.
const ACCEPT_POLL: Duration = Duration::from_millis(10);

pub struct TcpLink {
    bind_address: String,
    listener: Mutex<Option<TcpListener>>,
    reader: Mutex<Option<BufReader<TcpStream>>>,
    writer: Mutex<Option<TcpStream>>,
    /// Handle used only to shut the socket down from any thread
    control: Mutex<Option<TcpStream>>,
    closing: AtomicBool,
}

impl TcpLink {
    pub fn new(bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            listener: Mutex::new(None),
            reader: Mutex::new(None),
            writer: Mutex::new(None),
            control: Mutex::new(None),
            closing: AtomicBool::new(false),
        }
    }

    /// Bind the listener now, so the local address is known before a client connects.
    pub fn bind(&self) -> Result<std::net::SocketAddr> {
        let mut listener = self.listener.lock();
        if listener.is_none() {
            let bound = TcpListener::bind(&self.bind_address).map_err(|e| {
                Error::Other(format!("Failed to bind to {}: {}", self.bind_address, e))
            })?;
            if let Err(e) = bound.set_nonblocking(true) {
                warn!("Failed to set nonblocking mode: {}", e);
            }
            info!("Operator server listening on {}", self.bind_address);
            *listener = Some(bound);
        }
        match listener.as_ref() {
            Some(bound) => Ok(bound.local_addr()?),
            None => Err(Error::NotConnected(NAME)),
        }
    }

    fn accept(&self) -> Result<TcpStream> {
        self.bind()?;
        loop {
            if self.closing.load(Ordering::Relaxed) {
                return Err(Error::LinkClosed(NAME));
            }
            let accepted = match self.listener.lock().as_ref() {
                Some(listener) => listener.accept(),
                None => return Err(Error::NotConnected(NAME)),
            };
            match accepted {
                Ok((stream, addr)) => {
                    info!("Operator connected: {}", addr);
                    stream.set_nonblocking(false)?;
                    if let Err(e) = stream.set_nodelay(true) {
                        debug!("Failed to set TCP_NODELAY: {}", e);
                    }
                    return Ok(stream);
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL),
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl Link for TcpLink {
    fn name(&self) -> &'static str {
        NAME
    }

    fn connect(&self) -> Result<()> {
        let stream = self.accept()?;
        let reader = stream.try_clone()?;
        let control = stream.try_clone()?;

        *self.reader.lock() = Some(BufReader::new(reader));
        *self.writer.lock() = Some(stream);
        *self.control.lock() = Some(control);
        Ok(())
    }

    fn disconnect(&self) {
        if let Some(control) = self.control.lock().take() {
            let _ = control.shutdown(Shutdown::Both);
            debug!("Operator socket shut down");
        }
        self.writer.lock().take();
        // A receiver may still be parked inside read_line holding the lock;
        // the shutdown above wakes it and the next connect replaces the reader.
        if let Some(mut reader) = self.reader.try_lock() {
            reader.take();
        }
    }

    fn send(&self, message: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        let stream = writer.as_mut().ok_or(Error::NotConnected(NAME))?;
        stream.write_all(message.as_bytes())?;
        stream.write_all(b"\n")?;
        stream.flush()?;
        Ok(())
    }

    fn recv(&self) -> Result<String> {
        let mut reader = self.reader.lock();
        let stream = reader.as_mut().ok_or(Error::NotConnected(NAME))?;
        let mut line = String::new();
        let read = stream.read_line(&mut line)?;
        if read == 0 {
            return Err(Error::LinkClosed(NAME));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    fn close(&self) {
        self.closing.store(true, Ordering::Relaxed);
        self.disconnect();
    }
}
