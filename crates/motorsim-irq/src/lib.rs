//! Vectored interrupt controller for the motorsim device model.
//!
//! Five interrupt sources share a pending mask and an enabled mask, both
//! mirrored into the `IRQ_STATUS` and `IRQ_ENABLE` registers. Triggering
//! a disabled source is silently dropped; triggering an enabled one pends
//! it until the host tick loop calls
//! [`process_pending`](controller::InterruptController::process_pending),
//! which dispatches registered handlers in ascending source order and
//! acknowledges everything that was pending.
//!
//! Interrupts can also arrive asynchronously: a host signal (or, off
//! Unix, any thread) raises bits in the process-wide [`latch::IrqLatch`],
//! which touches nothing but atomics and is therefore safe from
//! signal-handler context. The latch is drained through the normal
//! enable gate at the start of the next `process_pending`.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod controller;
pub mod error;
pub mod latch;
pub mod prelude;
#[cfg(unix)]
pub mod signal;

pub use controller::{InterruptController, IrqHandler, IrqSource};
pub use error::{IrqError, IrqResult};
pub use latch::IrqLatch;
