//! Error types for chess-sight-core

use std::time::Duration;

use thiserror::Error;

/// Faults on the line channel to the engine process.
///
/// Any of these leaves the channel in an unknown position within the
/// response stream, so the process behind it cannot be reused.
#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("failed to write to engine: {0}")]
    Write(#[source] std::io::Error),

    #[error("engine did not respond within {0:?}")]
    Timeout(Duration),

    #[error("engine output closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("no engine candidate completed the handshake ({attempted} tried)")]
    Handshake { attempted: usize },

    #[error("engine unavailable")]
    EngineUnavailable,

    #[error("engine busy: analysis queue is full")]
    EngineBusy,

    #[error("engine communication failed: {0}")]
    Communication(#[from] ChannelError),

    #[error("invalid analysis request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// True when the failure means no engine could serve the request at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Handshake { .. } | Error::EngineUnavailable)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(Error::EngineUnavailable.is_unavailable());
        assert!(Error::Handshake { attempted: 3 }.is_unavailable());
        assert!(!Error::EngineBusy.is_unavailable());
        assert!(!Error::Communication(ChannelError::Closed).is_unavailable());
    }

    #[test]
    fn test_channel_error_converts() {
        let err: Error = ChannelError::Timeout(Duration::from_millis(5)).into();
        assert!(matches!(err, Error::Communication(ChannelError::Timeout(_))));
        assert!(err.to_string().contains("did not respond"));
    }
}
