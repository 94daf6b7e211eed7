//! Controller link over a serial port

use super::Link;
use crate::error::{Error, Result};
use parking_lot::Mutex;
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

const NAME: &str = "controller";

/// Serial link to the motion controller.
///
/// Outbound tokens are written as-is; inbound messages are `\n` terminated.
pub struct SerialLink {
    path: String,
    baud_rate: u32,
    read_timeout: Duration,
    writer: Mutex<Option<Box<dyn SerialPort>>>,
    reader: Mutex<Option<LineReader>>,
}

struct LineReader {
    port: Box<dyn SerialPort>,
    pending: Vec<u8>,
}

impl SerialLink {
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/ttyUSB0")
    /// * `baud_rate` - Baud rate (e.g., 115200)
    /// * `read_timeout` - Port read timeout; `recv` keeps waiting across timeouts
    pub fn new(path: impl Into<String>, baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            read_timeout,
            writer: Mutex::new(None),
            reader: Mutex::new(None),
        }
    }
}

impl LineReader {
    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.pending.drain(..=end).collect();
        Some(
            String::from_utf8_lossy(&line)
                .trim_end_matches(['\r', '\n'])
                .to_string(),
        )
    }
}

impl Link for SerialLink {
    fn name(&self) -> &'static str {
        NAME
    }

    fn connect(&self) -> Result<()> {
        let port = serialport::new(&self.path, self.baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(self.read_timeout)
            .open()?;
        let reader = port.try_clone()?;

        log::info!("Opened serial port: {} at {} baud", self.path, self.baud_rate);

        *self.writer.lock() = Some(port);
        *self.reader.lock() = Some(LineReader {
            port: reader,
            pending: Vec::new(),
        });
        Ok(())
    }

    fn disconnect(&self) {
        self.writer.lock().take();
        if let Some(mut reader) = self.reader.try_lock() {
            reader.take();
        }
        log::debug!("Closed serial port: {}", self.path);
    }

    fn send(&self, message: &str) -> Result<()> {
        let mut writer = self.writer.lock();
        let port = writer.as_mut().ok_or(Error::NotConnected(NAME))?;
        port.write_all(message.as_bytes())?;
        port.flush()?;
        Ok(())
    }

    fn recv(&self) -> Result<String> {
        let mut guard = self.reader.lock();
        let reader = guard.as_mut().ok_or(Error::NotConnected(NAME))?;
        let mut buffer = [0u8; 64];
        loop {
            if let Some(line) = reader.take_line() {
                return Ok(line);
            }
            match reader.port.read(&mut buffer) {
                Ok(0) => return Err(Error::LinkClosed(NAME)),
                Ok(n) => reader.pending.extend_from_slice(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::TimedOut => {}
                Err(e) => return Err(e.into()),
            }
        }
    }
}
