//! Mock serial port implementation for testing.
//!
//! Provides a `MockSerialPort` that simulates a device without hardware, and
//! a `MockPortOpener` that hands out registered mock ports by path.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

/// Inner state of the mock port, shared between clones.
#[derive(Debug, Default)]
struct MockPortState {
    /// Queue of bytes to be returned by read operations.
    read_queue: VecDeque<u8>,
    /// Log of all bytes written to the port, one entry per write call.
    write_log: Vec<Vec<u8>>,
    /// Whether the next operation should time out.
    should_timeout: bool,
    /// Maximum bytes accepted per write call (`None` accepts everything).
    write_capacity: Option<usize>,
    /// Error kind returned by the next read, simulating a device fault.
    read_fault: Option<std::io::ErrorKind>,
    /// Error kind returned by the next buffer clear.
    clear_fault: Option<std::io::ErrorKind>,
    /// Configured timeout duration.
    timeout: Duration,
    /// How many times buffers have been cleared.
    clear_count: usize,
}

/// Mock serial port implementation for testing.
///
/// Clones share state, so a test can keep one handle for inspection while
/// the code under test owns another.
///
/// # Example
/// ```
/// use arduino_serial::port::{MockSerialPort, SerialPortAdapter};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"OK\n");
///
/// let mut buffer = [0u8; 3];
/// let n = port.read_bytes(&mut buffer).unwrap();
/// assert_eq!(&buffer[..n], b"OK\n");
///
/// port.write_bytes(b"ping").unwrap();
/// assert_eq!(port.written_bytes(), b"ping");
/// ```
#[derive(Clone)]
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    /// Create a new mock serial port with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState {
                timeout: Duration::from_millis(1),
                ..Default::default()
            })),
        }
    }

    /// Enqueue bytes to be returned by subsequent read operations.
    pub fn enqueue_read(&mut self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Get a copy of all write calls made on the port.
    pub fn get_write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All bytes written so far, concatenated as they went on the wire.
    pub fn written_bytes(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Clear the write log.
    pub fn clear_write_log(&mut self) {
        self.state.lock().write_log.clear();
    }

    /// Set whether the next read/write operation should time out.
    pub fn set_should_timeout(&mut self, should_timeout: bool) {
        self.state.lock().should_timeout = should_timeout;
    }

    /// Limit how many bytes each write call accepts.
    pub fn set_write_capacity(&mut self, capacity: Option<usize>) {
        self.state.lock().write_capacity = capacity;
    }

    /// Make the next read fail with a hard I/O error of `kind`.
    pub fn fail_next_read(&mut self, kind: std::io::ErrorKind) {
        self.state.lock().read_fault = Some(kind);
    }

    /// Make the next buffer clear fail with a hard I/O error of `kind`.
    pub fn fail_next_clear(&mut self, kind: std::io::ErrorKind) {
        self.state.lock().clear_fault = Some(kind);
    }

    /// Whether buffers have been cleared at least once.
    pub fn was_cleared(&self) -> bool {
        self.state.lock().clear_count > 0
    }

    /// Number of times buffers have been cleared.
    pub fn clear_count(&self) -> usize {
        self.state.lock().clear_count
    }

    /// Get the number of bytes available to read.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(state.timeout));
        }

        let accepted = state
            .write_capacity
            .map_or(data.len(), |cap| cap.min(data.len()));
        if accepted > 0 {
            state.write_log.push(data[..accepted].to_vec());
        }
        Ok(accepted)
    }

    fn read_bytes(&mut self, buffer: &mut [u8]) -> Result<usize, PortError> {
        let mut state = self.state.lock();

        if let Some(kind) = state.read_fault.take() {
            return Err(PortError::Io(std::io::Error::new(kind, "simulated device fault")));
        }

        if state.should_timeout {
            state.should_timeout = false;
            return Err(PortError::timeout(state.timeout));
        }

        let mut bytes_read = 0;
        for byte in buffer.iter_mut() {
            match state.read_queue.pop_front() {
                Some(queued) => {
                    *byte = queued;
                    bytes_read += 1;
                }
                None => break,
            }
        }

        if bytes_read == 0 {
            // Simulate "would block" behavior of a drained non-blocking port
            Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "No data available",
            )))
        } else {
            Ok(bytes_read)
        }
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn clear_buffers(&mut self) -> Result<(), PortError> {
        let mut state = self.state.lock();
        if let Some(kind) = state.clear_fault.take() {
            return Err(PortError::Io(std::io::Error::new(kind, "simulated clear fault")));
        }
        state.read_queue.clear();
        state.clear_count += 1;
        Ok(())
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .finish()
    }
}

/// Hands out registered [`MockSerialPort`]s by path.
///
/// Every successful or failed open is recorded so tests can assert on the
/// order and line configuration the sequencer used.
#[derive(Debug, Clone, Default)]
pub struct MockPortOpener {
    ports: Arc<Mutex<HashMap<String, MockSerialPort>>>,
    opens: Arc<Mutex<Vec<(String, PortConfiguration)>>>,
}

impl MockPortOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device path and return a handle sharing its state.
    pub fn add_port(&self, path: &str) -> MockSerialPort {
        let port = MockSerialPort::new(path);
        self.ports.lock().insert(path.to_string(), port.clone());
        port
    }

    /// Every open attempt so far, in order.
    pub fn open_log(&self) -> Vec<(String, PortConfiguration)> {
        self.opens.lock().clone()
    }
}

impl PortOpener for MockPortOpener {
    fn open(
        &mut self,
        path: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        self.opens.lock().push((path.to_string(), config.clone()));
        let port = self
            .ports
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| PortError::not_found(path))?;
        port.state.lock().timeout = config.poll_interval;
        Ok(Box::new(port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_and_read() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"Hello");

        let mut buffer = [0u8; 10];
        let n = port.read_bytes(&mut buffer).unwrap();
        assert_eq!(n, 5);
        assert_eq!(&buffer[..n], b"Hello");
    }

    #[test]
    fn test_write_logging() {
        let mut port = MockSerialPort::new("MOCK0");
        port.write_bytes(b"Test1").unwrap();
        port.write_bytes(b"Test2").unwrap();

        let log = port.get_write_log();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0], b"Test1");
        assert_eq!(port.written_bytes(), b"Test1Test2");
    }

    #[test]
    fn test_write_capacity_limits_acceptance() {
        let mut port = MockSerialPort::new("MOCK0");
        port.set_write_capacity(Some(2));
        assert_eq!(port.write_bytes(b"abcd").unwrap(), 2);
        assert_eq!(port.written_bytes(), b"ab");

        port.set_write_capacity(Some(0));
        assert_eq!(port.write_bytes(b"cd").unwrap(), 0);
        assert_eq!(port.get_write_log().len(), 1);
    }

    #[test]
    fn test_timeout_simulation() {
        let mut port = MockSerialPort::new("MOCK0");
        port.set_should_timeout(true);

        let mut buffer = [0u8; 10];
        let result = port.read_bytes(&mut buffer);
        assert!(matches!(result, Err(PortError::Timeout(_))));
    }

    #[test]
    fn test_read_fault_is_not_poll_expiry() {
        let mut port = MockSerialPort::new("MOCK0");
        port.fail_next_read(std::io::ErrorKind::BrokenPipe);

        let mut buffer = [0u8; 1];
        let err = port.read_bytes(&mut buffer).unwrap_err();
        assert!(!err.is_poll_expiry());
    }

    #[test]
    fn test_clear_buffers() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"Should be cleared");

        port.clear_buffers().unwrap();
        assert!(port.was_cleared());
        assert_eq!(port.clear_count(), 1);
        assert_eq!(port.available_bytes(), 0);
    }

    #[test]
    fn test_clear_fault_fires_once() {
        let mut port = MockSerialPort::new("MOCK0");
        port.enqueue_read(b"kept");
        port.fail_next_clear(std::io::ErrorKind::PermissionDenied);

        let err = port.clear_buffers().unwrap_err();
        assert!(!err.is_poll_expiry());
        assert!(!port.was_cleared());
        assert_eq!(port.available_bytes(), 4);

        port.clear_buffers().unwrap();
        assert_eq!(port.clear_count(), 1);
    }

    #[test]
    fn test_empty_read() {
        let mut port = MockSerialPort::new("MOCK0");
        let mut buffer = [0u8; 10];

        let err = port.read_bytes(&mut buffer).unwrap_err();
        assert!(err.is_poll_expiry());
    }

    #[test]
    fn test_opener_shares_state_and_logs_opens() {
        let mut opener = MockPortOpener::new();
        let handle = opener.add_port("/dev/ttyMOCK");
        let config = PortConfiguration::raw_8n1(9600, Duration::from_millis(1));

        let mut port = opener.open("/dev/ttyMOCK", &config).unwrap();
        port.write_bytes(b"x").unwrap();

        assert_eq!(handle.written_bytes(), b"x");
        assert_eq!(opener.open_log(), vec![("/dev/ttyMOCK".to_string(), config)]);
    }

    #[test]
    fn test_opener_unknown_path() {
        let mut opener = MockPortOpener::new();
        let result = opener.open("/dev/missing", &PortConfiguration::default());
        assert!(matches!(result, Err(PortError::NotFound(_))));
        assert_eq!(opener.open_log().len(), 1);
    }
}
