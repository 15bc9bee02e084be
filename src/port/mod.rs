//! Port abstraction layer for serial communication.
//!
//! Provides the adapter/opener traits, the real `serialport`-backed
//! implementation, mocks for tests, and [`PortSession`], the owner of one
//! open device and its read/write/flush primitives.

pub mod error;
pub mod mock;
pub mod session;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use mock::{MockPortOpener, MockSerialPort};
pub use session::{PortSession, ReadOutcome, ReadStatus};
pub use sync_port::{SyncSerialPort, SystemPortOpener};
pub use traits::*;
