//! Append-only record of every line received by the receive action.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Text file that only ever grows. Never truncated or rotated here.
#[derive(Debug, Clone)]
pub struct ReceiveLog {
    path: PathBuf,
}

impl ReceiveLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append the raw bytes of `line` plus a newline, opening and closing
    /// the file each time.
    pub fn append(&self, line: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut record = Vec::with_capacity(line.len() + 1);
        record.extend_from_slice(line);
        record.push(b'\n');
        file.write_all(&record)
    }
}
