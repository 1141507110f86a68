//! Error taxonomy for the live session
//!
//! Each concern gets its own error type so loops can decide locally whether a
//! failure is recoverable. `SessionError` is what the controller surfaces to
//! the caller before the session becomes active.

use std::time::Duration;
use thiserror::Error;

/// Configuration problems, reported before any device or network resource is touched
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("project_id is not set (export GOOGLE_CLOUD_PROJECT or set project_id in the config file)")]
    MissingProjectId,

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Input device failures
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("no default input device available")]
    Unavailable,

    #[error("failed to open input device: {0}")]
    Open(String),

    #[error("failed to read from input device: {0}")]
    Read(String),

    #[error("input exhausted")]
    EndOfInput,

    #[error("input device is closed")]
    Closed,
}

/// The session could not be established
#[derive(Debug, Error)]
#[error("connection failed: {0}")]
pub struct ConnectionError(pub String);

/// Sending one audio frame over the session failed
#[derive(Debug, Error)]
pub enum TransmitError {
    #[error("session is closed")]
    Closed,

    #[error("failed to send audio frame: {0}")]
    Send(String),
}

/// The inbound event stream itself broke
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("inbound stream failed: {0}")]
    Transport(String),

    #[error("no server activity for {0:?}")]
    Stalled(Duration),
}

/// A single inbound event could not be decoded; the stream itself is intact
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to decode server event: {0}")]
pub struct EventDecodeError(pub String);

/// Failures that end a run before the session reaches `Active`
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl SessionError {
    /// Process exit code for this failure
    pub fn exit_code(&self) -> u8 {
        match self {
            SessionError::Configuration(_) => 2,
            SessionError::Device(_) | SessionError::Connection(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_non_zero() {
        assert_eq!(SessionError::from(ConfigError::MissingProjectId).exit_code(), 2);
        assert_eq!(SessionError::from(DeviceError::Unavailable).exit_code(), 1);
        assert_eq!(
            SessionError::from(ConnectionError("refused".to_string())).exit_code(),
            1
        );
    }

    #[test]
    fn test_missing_project_mentions_env_var() {
        let err = ConfigError::MissingProjectId;
        assert!(err.to_string().contains("GOOGLE_CLOUD_PROJECT"));
    }
}
