//! Error types for sensor operations.

use thiserror::Error;

/// Sensor array errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    /// A trigger was requested while the array's `ENABLE` control bit is
    /// clear.
    #[error("sensor array is not enabled")]
    NotEnabled,

    /// The sample buffer is full; the sample was dropped and the sticky
    /// `OVERFLOW` status bit raised.
    #[error("sample buffer overflow, sample dropped")]
    BufferOverflow,
}

/// Specialized Result type for sensor operations.
pub type SensorResult<T = ()> = Result<T, SensorError>;
