//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::Config;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "ARDUINO_SERIAL";

/// Config file name inside the platform config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "arduino-serial.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "ARDUINO_SERIAL_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `ARDUINO_SERIAL_CONFIG` environment variable (explicit path)
    /// 2. `./arduino-serial.toml` (current directory)
    /// 3. `<platform config dir>/arduino-serial/config.toml`
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values, then the result is validated.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = match config_path {
            Some(ref path) => load_from_file(path)?,
            None => Config::default(),
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path, which must exist.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Built-in defaults plus environment overrides, ignoring any file.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Consume the loader and return the configuration.
    pub fn into_config(self) -> Config {
        self.config
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|p| p.exists())
}

/// Get the platform config directory for this tool.
pub fn get_default_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "arduino-serial").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the default config file path.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

/// Load configuration from a file.
fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&content).map_err(ConfigError::ParseError)
}

fn env_key(suffix: &str) -> String {
    format!("{ENV_PREFIX}_{suffix}")
}

/// Parse an override if the variable is set.
fn env_parsed<T: FromStr>(suffix: &str, what: &str) -> ConfigResult<Option<T>> {
    let var = env_key(suffix);
    match std::env::var(&var) {
        Ok(val) => val
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}"))),
        Err(_) => Ok(None),
    }
}

/// Apply environment variable overrides to the configuration.
///
/// Environment variables follow the pattern: `ARDUINO_SERIAL_<SECTION>_<KEY>`
/// For example:
/// - `ARDUINO_SERIAL_SERIAL_DEFAULT_BAUD=9600`
/// - `ARDUINO_SERIAL_STORE_URL=mysql://user:pw@db/pihome`
/// - `ARDUINO_SERIAL_TESTING_PORT=/dev/ttyACM0`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    // Serial overrides
    if let Some(baud) = env_parsed("SERIAL_DEFAULT_BAUD", "baud rate")? {
        config.serial.default_baud = baud;
    }
    if let Some(ms) = env_parsed("SERIAL_DEFAULT_TIMEOUT_MS", "timeout")? {
        config.serial.default_timeout_ms = ms;
    }
    if let Ok(val) = std::env::var(env_key("SERIAL_EOL_CHAR")) {
        config.serial.eol_char = val;
    }
    if let Some(size) = env_parsed("SERIAL_READ_BUFFER_SIZE", "buffer size")? {
        config.serial.read_buffer_size = size;
    }
    if let Some(ms) = env_parsed("SERIAL_POLL_INTERVAL_MS", "poll interval")? {
        config.serial.poll_interval_ms = ms;
    }

    // Receive overrides
    if let Ok(val) = std::env::var(env_key("RECEIVE_LOG_PATH")) {
        config.receive.log_path = PathBuf::from(val);
    }

    // Store overrides
    if let Ok(val) = std::env::var(env_key("STORE_URL")) {
        config.store.url = val;
    }
    if let Ok(val) = std::env::var(env_key("STORE_TABLE")) {
        config.store.table = val;
    }

    // Logging overrides
    if let Ok(val) = std::env::var(env_key("LOGGING_LEVEL")) {
        config.logging.level = val;
    }

    // Testing overrides
    if let Ok(val) = std::env::var(env_key("TESTING_PORT")) {
        config.testing.port = Some(val);
    }

    Ok(())
}
