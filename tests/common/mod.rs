//! Shared test utilities.
//!
//! - a recording status sink
//! - a sequencer harness wired to a mock device and a temporary receive log

#![allow(dead_code)]

use arduino_serial::config::Config;
use arduino_serial::port::{MockPortOpener, MockSerialPort};
use arduino_serial::report::{StatusReport, StatusSink, StoreError};
use arduino_serial::Sequencer;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

pub const DEVICE: &str = "/dev/ttyMOCK0";

/// Sink that remembers every report it receives.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Arc<Mutex<Vec<StatusReport>>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<StatusReport> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl StatusSink for RecordingSink {
    async fn report(&self, report: &StatusReport) -> Result<u64, StoreError> {
        self.reports.lock().push(report.clone());
        Ok(1)
    }
}

/// Sequencer plus handles to everything it touches.
pub struct Harness {
    pub sequencer: Sequencer<Vec<u8>>,
    pub device: MockSerialPort,
    pub opener: MockPortOpener,
    pub sink: RecordingSink,
    pub log_path: PathBuf,
    _dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Build a harness; the receive log is redirected into a temp dir.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("temp dir");
        let log_path = dir.path().join("out.txt");
        config.receive.log_path = log_path.clone();

        let opener = MockPortOpener::new();
        let device = opener.add_port(DEVICE);
        let sink = RecordingSink::default();
        let sequencer = Sequencer::new(
            &config,
            Box::new(opener.clone()),
            Box::new(sink.clone()),
            Vec::new(),
        );

        Self {
            sequencer,
            device,
            opener,
            sink,
            log_path,
            _dir: dir,
        }
    }

    /// Everything the run printed so far.
    pub fn printed(&self) -> String {
        String::from_utf8_lossy(self.sequencer.output()).into_owned()
    }

    /// Raw bytes the run printed so far.
    pub fn printed_bytes(&self) -> &[u8] {
        self.sequencer.output()
    }

    /// Raw bytes of the receive log, empty if it was never created.
    pub fn receive_log_bytes(&self) -> Vec<u8> {
        std::fs::read(&self.log_path).unwrap_or_default()
    }

    /// Contents of the receive log, empty if it was never created.
    pub fn receive_log(&self) -> String {
        std::fs::read_to_string(&self.log_path).unwrap_or_default()
    }
}
