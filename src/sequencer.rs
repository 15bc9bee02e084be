//! Executes actions strictly in the order given, against at most one open port.
//!
//! All run-wide settings live in [`RunState`], owned by the [`Sequencer`] and
//! mutated only by the action currently executing.

use crate::action::Action;
use crate::config::{Config, SerialConfig};
use crate::error::{AppError, AppResult};
use crate::port::{PortConfiguration, PortOpener, PortSession, ReadOutcome};
use crate::receive_log::ReceiveLog;
use crate::report::{StatusReport, StatusSink};
use std::io::Write;
use std::time::Duration;
use tracing::{debug, info};

/// Settings later actions observe, plus the currently open port.
#[derive(Debug)]
pub struct RunState {
    pub port: Option<PortSession>,
    pub baud_rate: u32,
    pub eol: u8,
    pub timeout: Duration,
    pub quiet: bool,
    pub read_buffer_size: usize,
    pub poll_interval: Duration,
}

impl RunState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            port: None,
            baud_rate: config.serial.default_baud,
            eol: config.serial.eol_byte(),
            timeout: config.serial.default_timeout(),
            quiet: false,
            read_buffer_size: config.serial.read_buffer_size,
            poll_interval: config.serial.poll_interval(),
        }
    }

    fn port_mut(&mut self) -> AppResult<&mut PortSession> {
        self.port.as_mut().ok_or(AppError::PortNotOpen)
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// The command sequencer.
///
/// `W` receives everything the run prints; the binary passes stdout.
pub struct Sequencer<W: Write> {
    opener: Box<dyn PortOpener>,
    sink: Box<dyn StatusSink>,
    receive_log: ReceiveLog,
    serial: SerialConfig,
    out: W,
    state: RunState,
}

impl<W: Write> Sequencer<W> {
    pub fn new(
        config: &Config,
        opener: Box<dyn PortOpener>,
        sink: Box<dyn StatusSink>,
        out: W,
    ) -> Self {
        Self {
            opener,
            sink,
            receive_log: ReceiveLog::new(config.receive.log_path.clone()),
            serial: config.serial.clone(),
            out,
            state: RunState::from_config(config),
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run every action in order, stopping at the first fatal error.
    pub async fn run(&mut self, actions: impl IntoIterator<Item = Action>) -> AppResult<()> {
        for action in actions {
            self.apply(action).await?;
        }
        self.out.flush()?;
        Ok(())
    }

    /// Execute a single action.
    pub async fn apply(&mut self, action: Action) -> AppResult<()> {
        debug!(?action, "applying");
        if action.requires_port() && self.state.port.is_none() {
            return Err(AppError::PortNotOpen);
        }

        match action {
            Action::SetBaud(baud) => self.state.baud_rate = baud,
            Action::Open(path) => self.open(&path)?,
            Action::Send(text) => self.send(text)?,
            Action::SendLine(mut text) => {
                text.push('\n');
                self.send(text)?;
            }
            Action::SendByte(byte) => {
                self.state
                    .port_mut()?
                    .write_byte(byte)
                    .map_err(AppError::WriteFailed)?;
            }
            Action::Receive => self.receive()?,
            Action::Report => self.report().await?,
            Action::Flush => {
                self.say(format_args!("flushing receive buffer"))?;
                self.state
                    .port_mut()?
                    .flush()
                    .map_err(AppError::FlushFailed)?;
            }
            Action::Delay(duration) => {
                self.say(format_args!("sleep {} millisecs", duration.as_millis()))?;
                tokio::time::sleep(duration).await;
            }
            Action::SetEol(eol) => {
                self.state.eol = eol;
                self.say(format_args!("eolchar set to '{}'", eol.escape_ascii()))?;
            }
            Action::SetTimeout(timeout) => {
                self.state.timeout = timeout;
                self.say(format_args!("timeout set to {} millisecs", timeout.as_millis()))?;
            }
            Action::Quiet => self.state.quiet = true,
        }
        Ok(())
    }

    /// Informational line, suppressed in quiet mode.
    fn say(&mut self, args: std::fmt::Arguments<'_>) -> AppResult<()> {
        if !self.state.quiet {
            writeln!(self.out, "{args}")?;
        }
        Ok(())
    }

    fn open(&mut self, requested: &str) -> AppResult<()> {
        if let Some(previous) = self.state.port.take() {
            let name = previous.name().to_string();
            previous.close();
            self.say(format_args!("closed port {name}"))?;
        }

        let path = self.serial.resolve_port(requested);
        let config = PortConfiguration::raw_8n1(self.state.baud_rate, self.state.poll_interval);

        let mut session =
            PortSession::open(self.opener.as_mut(), &path, config).map_err(|source| {
                AppError::OpenFailed {
                    port: path.clone(),
                    source,
                }
            })?;
        info!(port = %path, baud = self.state.baud_rate, "opened port");
        self.say(format_args!("opened port {path}"))?;

        session.flush().map_err(AppError::FlushFailed)?;
        self.state.port = Some(session);
        Ok(())
    }

    fn send(&mut self, text: String) -> AppResult<()> {
        self.say(format_args!("send string:{text}"))?;
        self.state
            .port_mut()?
            .write_str(&text)
            .map_err(AppError::WriteFailed)?;
        Ok(())
    }

    fn read_line(&mut self) -> AppResult<ReadOutcome> {
        let (eol, max_len, timeout) = (
            self.state.eol,
            self.state.read_buffer_size,
            self.state.timeout,
        );
        let outcome = self
            .state
            .port_mut()?
            .read_until(eol, max_len, timeout)
            .map_err(AppError::ReadFailed)?;
        debug!(status = ?outcome.status, bytes = outcome.data.len(), "read finished");
        Ok(outcome)
    }

    /// Informational `label` followed by raw device bytes.
    fn say_bytes(&mut self, label: &str, bytes: &[u8]) -> AppResult<()> {
        if !self.state.quiet {
            self.out.write_all(label.as_bytes())?;
            self.out.write_all(bytes)?;
            self.out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn receive(&mut self) -> AppResult<()> {
        let line = self.read_line()?.data;
        if !self.state.quiet {
            write!(self.out, "read string:")?;
        }
        self.out.write_all(&line)?;
        self.out.write_all(b"\n")?;

        self.receive_log
            .append(&line)
            .map_err(|source| AppError::ReceiveLog {
                path: self.receive_log.path().to_path_buf(),
                source,
            })
    }

    async fn report(&mut self) -> AppResult<()> {
        let line = self.read_line()?.data;
        let report = StatusReport::parse(&line);
        let status: Vec<u8> = report.status.into_iter().collect();
        self.say_bytes("status: ", &status)?;
        self.say_bytes("code: ", &report.code)?;

        let updated = self.sink.report(&report).await?;
        self.say(format_args!("updated {updated} record(s)"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::{MockPortOpener, MockSerialPort};
    use crate::report::MockStatusSink;
    use pretty_assertions::assert_eq;

    struct Harness {
        sequencer: Sequencer<Vec<u8>>,
        device: MockSerialPort,
        opener: MockPortOpener,
        _dir: tempfile::TempDir,
    }

    fn harness(sink: MockStatusSink) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.receive.log_path = dir.path().join("out.txt");
        config.serial.default_timeout_ms = 50;

        let opener = MockPortOpener::new();
        let device = opener.add_port("/dev/ttyMOCK0");
        let sequencer = Sequencer::new(
            &config,
            Box::new(opener.clone()),
            Box::new(sink),
            Vec::new(),
        );
        Harness {
            sequencer,
            device,
            opener,
            _dir: dir,
        }
    }

    fn printed(h: &Harness) -> String {
        String::from_utf8_lossy(h.sequencer.output()).into_owned()
    }

    #[tokio::test]
    async fn test_default_state() {
        let h = harness(MockStatusSink::new());
        let state = h.sequencer.state();
        assert!(state.port.is_none());
        assert_eq!(state.eol, b'\n');
        assert_eq!(state.baud_rate, 115_200);
        assert!(!state.quiet);
    }

    #[tokio::test]
    async fn test_open_uses_current_baud_and_flushes() {
        let mut h = harness(MockStatusSink::new());
        h.device.enqueue_read(b"boot noise");

        h.sequencer
            .run([Action::SetBaud(9600), Action::Open("/dev/ttyMOCK0".into())])
            .await
            .unwrap();

        let opens = h.opener.open_log();
        assert_eq!(opens.len(), 1);
        assert_eq!(opens[0].1.baud_rate, 9600);
        assert!(h.device.was_cleared());
        assert_eq!(h.device.available_bytes(), 0);
        assert_eq!(printed(&h), "opened port /dev/ttyMOCK0\n");
    }

    #[tokio::test]
    async fn test_reopen_closes_previous_first() {
        let mut h = harness(MockStatusSink::new());
        h.sequencer
            .run([
                Action::Open("/dev/ttyMOCK0".into()),
                Action::Open("/dev/ttyMOCK0".into()),
            ])
            .await
            .unwrap();

        assert_eq!(
            printed(&h),
            "opened port /dev/ttyMOCK0\nclosed port /dev/ttyMOCK0\nopened port /dev/ttyMOCK0\n"
        );
        assert_eq!(h.opener.open_log().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_open_leaves_no_port() {
        let mut h = harness(MockStatusSink::new());
        let err = h
            .sequencer
            .apply(Action::Open("/dev/missing".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::OpenFailed { ref port, .. } if port == "/dev/missing"));
        assert!(h.sequencer.state().port.is_none());
    }

    #[tokio::test]
    async fn test_port_actions_require_open_port() {
        for action in [
            Action::Send("x".into()),
            Action::SendLine("x".into()),
            Action::SendByte(1),
            Action::Receive,
            Action::Report,
            Action::Flush,
        ] {
            let mut h = harness(MockStatusSink::new());
            let err = h.sequencer.apply(action).await.unwrap_err();
            assert!(matches!(err, AppError::PortNotOpen));
            assert!(h.opener.open_log().is_empty());
        }
    }

    #[tokio::test]
    async fn test_settings_apply_only_to_later_reads() {
        let mut h = harness(MockStatusSink::new());
        h.sequencer
            .run([
                Action::Open("/dev/ttyMOCK0".into()),
                Action::Quiet,
            ])
            .await
            .unwrap();
        h.device.enqueue_read(b"a;b\n");

        h.sequencer.apply(Action::Receive).await.unwrap();
        h.sequencer.apply(Action::SetEol(b';')).await.unwrap();
        h.device.enqueue_read(b"c;");
        h.sequencer.apply(Action::Receive).await.unwrap();

        assert_eq!(printed(&h), "opened port /dev/ttyMOCK0\na;b\nc\n");
    }

    #[tokio::test]
    async fn test_report_forwards_status_and_code_once() {
        let mut sink = MockStatusSink::new();
        sink.expect_report()
            .withf(|r| r.status == Some(b'1') && r.code == b"ABC123")
            .times(1)
            .returning(|_| Ok(1));

        let mut h = harness(sink);
        h.sequencer
            .apply(Action::Open("/dev/ttyMOCK0".into()))
            .await
            .unwrap();
        h.device.enqueue_read(b"1ABC123\n");
        h.sequencer.apply(Action::Report).await.unwrap();

        let out = printed(&h);
        assert!(out.contains("status: 1\n"));
        assert!(out.contains("code: ABC123\n"));
    }

    #[tokio::test]
    async fn test_report_on_timeout_forwards_empty_values() {
        let mut sink = MockStatusSink::new();
        sink.expect_report()
            .withf(|r| r.status.is_none() && r.code.is_empty())
            .times(1)
            .returning(|_| Ok(0));

        let mut h = harness(sink);
        h.sequencer
            .run([
                Action::Open("/dev/ttyMOCK0".into()),
                Action::SetTimeout(Duration::from_millis(10)),
                Action::Report,
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_report_store_failure_is_fatal() {
        let mut sink = MockStatusSink::new();
        sink.expect_report().times(1).returning(|_| {
            Err(crate::report::StoreError::InvalidIdentifier("x".into()))
        });

        let mut h = harness(sink);
        let result = h
            .sequencer
            .run([
                Action::Open("/dev/ttyMOCK0".into()),
                Action::SetTimeout(Duration::from_millis(5)),
                Action::Report,
                Action::Send("never".into()),
            ])
            .await;

        assert!(matches!(result, Err(AppError::Store(_))));
        assert!(h.device.written_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_stops_the_run() {
        let mut h = harness(MockStatusSink::new());
        h.device.set_write_capacity(Some(0));

        let result = h
            .sequencer
            .run([
                Action::Open("/dev/ttyMOCK0".into()),
                Action::SendByte(7),
                Action::SetTimeout(Duration::from_millis(1)),
            ])
            .await;

        assert!(matches!(result, Err(AppError::WriteFailed(_))));
        assert_eq!(h.sequencer.state().timeout, Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_flush_fault_stops_the_run() {
        let mut h = harness(MockStatusSink::new());
        h.sequencer
            .apply(Action::Open("/dev/ttyMOCK0".into()))
            .await
            .unwrap();
        h.device.fail_next_clear(std::io::ErrorKind::BrokenPipe);

        let result = h
            .sequencer
            .run([Action::Flush, Action::SendByte(7)])
            .await;

        assert!(matches!(result, Err(AppError::FlushFailed(_))));
        assert!(h.device.written_bytes().is_empty());
    }

    #[tokio::test]
    async fn test_failed_flush_after_open_leaves_no_port() {
        let mut h = harness(MockStatusSink::new());
        h.device.fail_next_clear(std::io::ErrorKind::PermissionDenied);

        let err = h
            .sequencer
            .apply(Action::Open("/dev/ttyMOCK0".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::FlushFailed(_)));
        assert!(h.sequencer.state().port.is_none());
        assert_eq!(h.opener.open_log().len(), 1);

        let err = h.sequencer.apply(Action::Receive).await.unwrap_err();
        assert!(matches!(err, AppError::PortNotOpen));
    }

    #[tokio::test]
    async fn test_informational_output() {
        let mut h = harness(MockStatusSink::new());
        h.sequencer
            .run([
                Action::SetEol(b'\r'),
                Action::SetTimeout(Duration::from_millis(20)),
                Action::Delay(Duration::from_millis(1)),
                Action::Open("/dev/ttyMOCK0".into()),
                Action::SendLine("hi".into()),
                Action::Flush,
            ])
            .await
            .unwrap();

        assert_eq!(
            printed(&h),
            "eolchar set to '\\r'\n\
             timeout set to 20 millisecs\n\
             sleep 1 millisecs\n\
             opened port /dev/ttyMOCK0\n\
             send string:hi\n\n\
             flushing receive buffer\n"
        );
        assert_eq!(h.device.written_bytes(), b"hi\n");
    }
}
