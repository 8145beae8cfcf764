//! Channel-specific error types

use std::io;
use thiserror::Error;

/// Channel error type
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The named shared-memory object does not exist.
    #[error("shared memory object not found: {0}")]
    NotFound(String),

    /// The configured object name cannot be used (embedded NUL, empty).
    #[error("invalid shared memory name: {0:?}")]
    InvalidName(String),

    /// Shutdown was requested while blocked on the channel; callers must
    /// treat this as terminal.
    #[error("channel shutdown requested")]
    ShutdownRequested,

    /// OS-level failure creating, mapping or destroying the region.
    #[error("shared memory I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ChannelError {
    /// Check if this error indicates the peer should stop.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ChannelError::ShutdownRequested | ChannelError::Io(_)
        )
    }

    /// True for the shutdown sentinel.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ChannelError::ShutdownRequested)
    }
}

/// Specialized Result type for channel operations
pub type ChannelResult<T> = std::result::Result<T, ChannelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_is_fatal() {
        assert!(ChannelError::ShutdownRequested.is_fatal());
        assert!(ChannelError::ShutdownRequested.is_shutdown());
    }

    #[test]
    fn test_not_found_is_not_shutdown() {
        let err = ChannelError::NotFound("/missing".to_string());
        assert!(!err.is_shutdown());
        assert!(!err.is_fatal());
    }
}
