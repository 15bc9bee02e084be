//! One open serial device and its raw I/O primitives.
//!
//! A [`PortSession`] owns its adapter exclusively. Dropping the session (or
//! calling [`PortSession::close`]) releases the OS handle.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Why [`PortSession::read_until`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// The delimiter arrived. It is not part of the returned data.
    Delimited,
    /// `max_len - 1` bytes arrived without a delimiter.
    Truncated,
    /// The deadline passed first. Data may be partial or empty.
    TimedOut,
}

/// Result of a delimited read. Timeouts are data, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub data: Vec<u8>,
    pub status: ReadStatus,
}

/// An open, configured serial device.
#[derive(Debug)]
pub struct PortSession {
    port: Box<dyn SerialPortAdapter>,
    config: PortConfiguration,
}

impl PortSession {
    /// Acquire and configure the device at `path` through `opener`.
    pub fn open(
        opener: &mut dyn PortOpener,
        path: &str,
        config: PortConfiguration,
    ) -> Result<Self, PortError> {
        let port = opener.open(path, &config)?;
        debug!(port = path, baud = config.baud_rate, "port session opened");
        Ok(Self { port, config })
    }

    /// Wrap an already opened adapter.
    pub fn from_adapter(port: Box<dyn SerialPortAdapter>, config: PortConfiguration) -> Self {
        Self { port, config }
    }

    pub fn name(&self) -> &str {
        self.port.name()
    }

    pub fn config(&self) -> &PortConfiguration {
        &self.config
    }

    /// Release the device.
    pub fn close(self) {
        debug!(port = self.port.name(), "port session closed");
    }

    /// Discard unread input and unsent output.
    pub fn flush(&mut self) -> Result<(), PortError> {
        self.port.clear_buffers()
    }

    /// Write a single byte.
    pub fn write_byte(&mut self, byte: u8) -> Result<usize, PortError> {
        self.write_all(&[byte])
    }

    /// Write the bytes of `text` verbatim. No terminator is added.
    pub fn write_str(&mut self, text: &str) -> Result<usize, PortError> {
        self.write_all(text.as_bytes())
    }

    /// Write every byte of `data`, failing if the device stops accepting.
    pub fn write_all(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut written = 0;
        while written < data.len() {
            let n = self.port.write_bytes(&data[written..])?;
            if n == 0 {
                return Err(PortError::ShortWrite {
                    written,
                    expected: data.len(),
                });
            }
            written += n;
        }
        trace!(port = self.port.name(), bytes = written, "wrote");
        Ok(written)
    }

    /// Read one byte at a time until `delimiter`, `max_len - 1` bytes, or
    /// `timeout` of wall-clock time has passed, whichever comes first.
    ///
    /// At least one read is attempted, even with a zero timeout. The deadline
    /// is checked after every attempt and empty attempts back off for at most
    /// one poll interval, clipped to the time left, so the call returns no
    /// later than `timeout` plus one per-attempt read wait.
    pub fn read_until(
        &mut self,
        delimiter: u8,
        max_len: usize,
        timeout: Duration,
    ) -> Result<ReadOutcome, PortError> {
        let limit = max_len.saturating_sub(1);
        let mut data = Vec::with_capacity(limit);
        if limit == 0 {
            return Ok(ReadOutcome {
                data,
                status: ReadStatus::Truncated,
            });
        }

        let started = Instant::now();
        let mut byte = [0u8; 1];

        loop {
            let got = match self.port.read_bytes(&mut byte) {
                Ok(n) => n,
                Err(e) if e.is_poll_expiry() => 0,
                Err(e) => return Err(e),
            };

            if got > 0 {
                if byte[0] == delimiter {
                    return Ok(ReadOutcome {
                        data,
                        status: ReadStatus::Delimited,
                    });
                }
                data.push(byte[0]);
                if data.len() >= limit {
                    return Ok(ReadOutcome {
                        data,
                        status: ReadStatus::Truncated,
                    });
                }
            }

            let remaining = timeout.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                debug!(received = data.len(), ?timeout, "read timed out");
                return Ok(ReadOutcome {
                    data,
                    status: ReadStatus::TimedOut,
                });
            }

            if got == 0 {
                std::thread::sleep(self.config.poll_interval.min(remaining));
            }
        }
    }
}
