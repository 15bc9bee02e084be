//! Core traits for serial port abstraction.
//!
//! `SerialPortAdapter` is the byte-level seam and `PortOpener` is the
//! device-acquisition seam. Real hardware and mocks implement both, which is
//! what lets the sequencer run against scripted devices in tests.

use super::error::PortError;
use std::time::Duration;

/// Settings of an open port.
///
/// The line itself is always raw 8N1 without flow control; only the speed
/// and the read polling quantum vary. Changing either means closing the
/// port and opening it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Per-attempt read deadline. Reads poll in slices of this length.
    pub poll_interval: Duration,
}

impl PortConfiguration {
    /// Raw 8N1 line at `baud_rate` with no flow control.
    pub fn raw_8n1(baud_rate: u32, poll_interval: Duration) -> Self {
        Self {
            baud_rate,
            poll_interval,
        }
    }
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self::raw_8n1(115_200, Duration::from_millis(1))
    }
}

/// Trait for serial port I/O operations.
///
/// Implementations are used by exactly one owner at a time and never shared
/// across threads concurrently.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Write bytes to the serial port.
    ///
    /// Returns the number of bytes the device accepted, which may be fewer
    /// than `data.len()`.
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError>;

    /// Read bytes from the serial port into the provided buffer.
    ///
    /// Blocks for at most the configured per-attempt timeout. An empty
    /// attempt is reported either as `Ok(0)` or as an error for which
    /// [`PortError::is_poll_expiry`] holds.
    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError>;

    /// Get the name/path of this serial port.
    fn name(&self) -> &str;

    /// Clear both input and output buffers.
    ///
    /// This discards any unread data in the receive buffer and any unsent
    /// data in the transmit buffer.
    fn clear_buffers(&mut self) -> Result<(), PortError>;
}

/// Acquires devices by path.
///
/// The sequencer only ever talks to this trait, so tests can hand out mock
/// ports while the binary hands out real ones.
pub trait PortOpener: Send {
    /// Open and configure the device at `path`.
    fn open(
        &mut self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
