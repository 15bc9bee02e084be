//! arduino-serial library
//!
//! Core of a command-line tool that drives a microcontroller over a serial
//! line through an ordered list of actions, and forwards status replies to a
//! relational store.
//!
//! # Modules
//!
//! - `port`: serial device abstraction and the port session primitives
//! - `action`: the unit of work parsed from the command line
//! - `cli`: order-preserving command-line parsing
//! - `sequencer`: executes actions in order against one open port
//! - `report`: status reports and the SQL-backed sink
//! - `receive_log`: append-only log of received lines
//! - `config`: configuration management with TOML support
//! - `logging`: tracing subscriber setup
//! - `error`: fatal error taxonomy

pub mod action;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod receive_log;
pub mod report;
pub mod sequencer;

// Re-export commonly used types for convenience
pub use action::Action;
pub use error::{AppError, AppResult};
pub use port::{
    MockPortOpener, MockSerialPort, PortConfiguration, PortError, PortOpener, PortSession,
    ReadOutcome, ReadStatus, SerialPortAdapter, SyncSerialPort, SystemPortOpener,
};
pub use receive_log::ReceiveLog;
pub use report::{SqlStatusStore, StatusReport, StatusSink, StoreError};
pub use sequencer::{RunState, Sequencer};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
