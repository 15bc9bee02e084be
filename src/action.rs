//! The unit of work the sequencer consumes.

use std::time::Duration;

/// One command-line option, parsed. Executed exactly once, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Baud rate for the next `Open`.
    SetBaud(u32),
    /// Close any open port, then open and flush `path`.
    Open(String),
    /// Write the text as-is.
    Send(String),
    /// Write the text followed by `\n`.
    SendLine(String),
    /// Write one byte.
    SendByte(u8),
    /// Read a line, print it, append it to the receive log.
    Receive,
    /// Read a line and forward it to the status store.
    Report,
    /// Discard buffered input and output.
    Flush,
    /// Pause the run.
    Delay(Duration),
    /// Delimiter for later reads.
    SetEol(u8),
    /// Timeout for later reads.
    SetTimeout(Duration),
    /// Suppress informational output from here on.
    Quiet,
}

impl Action {
    /// Whether the action needs an open port.
    pub fn requires_port(&self) -> bool {
        matches!(
            self,
            Self::Send(_)
                | Self::SendLine(_)
                | Self::SendByte(_)
                | Self::Receive
                | Self::Report
                | Self::Flush
        )
    }
}

/// `n mod 256`, two's complement for negative values.
pub fn byte_from_number(n: i64) -> u8 {
    n.rem_euclid(256) as u8
}
