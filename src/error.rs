use crate::config::ConfigError;
use crate::port::PortError;
use crate::report::StoreError;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors. Any of these ends the run before the next action executes.
///
/// The `Display` text is the single diagnostic line printed on stderr.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("serial port not opened")]
    PortNotOpen,

    #[error("couldn't open port {port}: {source}")]
    OpenFailed {
        port: String,
        #[source]
        source: PortError,
    },

    #[error("error writing: {0}")]
    WriteFailed(#[source] PortError),

    #[error("error reading: {0}")]
    ReadFailed(#[source] PortError),

    #[error("error flushing: {0}")]
    FlushFailed(#[source] PortError),

    #[error("couldn't append to {}: {source}", path.display())]
    ReceiveLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("couldn't write output: {0}")]
    Output(#[from] std::io::Error),
}

/// Result type used throughout the sequencer.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_are_single_line() {
        let errors = [
            AppError::PortNotOpen,
            AppError::OpenFailed {
                port: "/dev/ttyACM0".into(),
                source: PortError::not_found("/dev/ttyACM0"),
            },
            AppError::WriteFailed(PortError::ShortWrite {
                written: 0,
                expected: 1,
            }),
            AppError::ReceiveLog {
                path: PathBuf::from("out.txt"),
                source: std::io::ErrorKind::PermissionDenied.into(),
            },
            AppError::Store(StoreError::InvalidIdentifier("a b".into())),
        ];
        for err in errors {
            assert!(!err.to_string().contains('\n'), "{err}");
        }
    }

    #[test]
    fn test_port_not_open_message() {
        assert_eq!(AppError::PortNotOpen.to_string(), "serial port not opened");
    }

    #[test]
    fn test_open_failed_names_port() {
        let err = AppError::OpenFailed {
            port: "/dev/ttyUSB7".into(),
            source: PortError::not_found("/dev/ttyUSB7"),
        };
        assert!(err.to_string().starts_with("couldn't open port /dev/ttyUSB7"));
    }
}
