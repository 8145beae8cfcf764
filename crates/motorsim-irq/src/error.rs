//! Error types for the interrupt controller.

use std::io;
use thiserror::Error;

/// Interrupt controller errors.
#[derive(Debug, Error)]
pub enum IrqError {
    /// Installing the host signal lines failed.
    #[error("failed to install signal lines: {0}")]
    SignalSetup(#[from] io::Error),
}

/// Specialized Result type for interrupt controller operations.
pub type IrqResult<T = ()> = Result<T, IrqError>;
