//! Configuration module for arduino-serial.
//!
//! This module provides TOML-based configuration with environment variable overrides.
//! Command-line actions always win over configuration: the file only supplies
//! the starting values of the run state and the store connection.
//!
//! # Configuration Resolution
//!
//! 1. `--config <path>` on the command line
//! 2. `ARDUINO_SERIAL_CONFIG` environment variable (explicit path)
//! 3. `./arduino-serial.toml` (current directory)
//! 4. `<platform config dir>/arduino-serial/config.toml`
//! 5. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is: `ARDUINO_SERIAL_<SECTION>_<KEY>`, e.g.
//! `ARDUINO_SERIAL_SERIAL_DEFAULT_BAUD=9600` or `ARDUINO_SERIAL_STORE_URL=...`.
//!
//! # Example
//!
//! ```rust,no_run
//! use arduino_serial::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Default baud: {}", loader.config().serial.default_baud);
//! # Ok::<(), arduino_serial::config::ConfigError>(())
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{
    is_sql_identifier, Config, LogFormat, LoggingConfig, ReceiveConfig, SerialConfig,
    StoreConfig, TestingConfig,
};
