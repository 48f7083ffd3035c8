use std::time::Duration;
use thiserror::Error;

/// Top-level error type, composed from each subsystem's own error enum.
#[derive(Error, Debug)]
pub enum SnapsyncError {
    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error(transparent)]
    Client(#[from] ClientError),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),

    #[error("Shutdown requested")]
    ShutdownRequested,
}

impl From<std::io::Error> for SnapsyncError {
    fn from(err: std::io::Error) -> Self {
        SnapsyncError::Server(ServerError::Io(err))
    }
}

/// C1: wire codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtoError {
    #[error("malformed frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
}

/// C2: bounded chunk queue errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue closed")]
    Closed,
    #[error("timed out waiting for an item")]
    Timeout,
}

/// C3/C4: server-side errors.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("PCM source stalled for {0:?}")]
    SourceStalled(Duration),

    #[error("session closed")]
    SessionClosed,
}

/// C5: client-side errors.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error(transparent)]
    Proto(#[from] ProtoError),

    #[error("no chunk available within callback deadline")]
    Stall,

    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("output device not found: {name:?}")]
    DeviceNotFound { name: Option<String> },
}

/// How a caller should react to an error, mirroring the recovery taxonomy
/// used by the pacer/session supervisors and the client's reconnect loop.
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryStrategy {
    Retry { max_attempts: u32, delay: Duration },
    Fallback { to: String },
    Restart,
    Ignore,
    Fatal,
}

impl ClientError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            ClientError::ConnectionLost(_) => RecoveryStrategy::Retry {
                max_attempts: u32::MAX,
                delay: Duration::from_millis(100),
            },
            ClientError::Stall => RecoveryStrategy::Ignore,
            ClientError::DeviceNotFound { .. } => RecoveryStrategy::Fallback {
                to: "default".to_string(),
            },
            ClientError::Proto(_) | ClientError::AudioDevice(_) => RecoveryStrategy::Restart,
        }
    }
}

impl SnapsyncError {
    pub fn recovery_strategy(&self) -> RecoveryStrategy {
        match self {
            SnapsyncError::Client(e) => e.recovery_strategy(),
            SnapsyncError::Server(ServerError::SessionClosed) => RecoveryStrategy::Ignore,
            SnapsyncError::Fatal(_) | SnapsyncError::ShutdownRequested => RecoveryStrategy::Fatal,
            _ => RecoveryStrategy::Restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_lost_is_retryable() {
        let err = SnapsyncError::Client(ClientError::ConnectionLost("reset".into()));
        assert!(matches!(
            err.recovery_strategy(),
            RecoveryStrategy::Retry { .. }
        ));
    }

    #[test]
    fn stall_is_ignored() {
        let err = SnapsyncError::Client(ClientError::Stall);
        assert_eq!(err.recovery_strategy(), RecoveryStrategy::Ignore);
    }

    #[test]
    fn device_not_found_falls_back_to_default() {
        let err = SnapsyncError::Client(ClientError::DeviceNotFound {
            name: Some("headphones".into()),
        });
        assert_eq!(
            err.recovery_strategy(),
            RecoveryStrategy::Fallback {
                to: "default".to_string()
            }
        );
    }
}
