//! Prelude module for convenient imports

pub use crate::controller::{InterruptController, IrqHandler, IrqSource};
pub use crate::error::{IrqError, IrqResult};
pub use crate::latch::IrqLatch;
#[cfg(unix)]
pub use crate::signal::install_signal_lines;
