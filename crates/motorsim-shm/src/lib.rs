//! Cross-process command/status channel over shared memory.
//!
//! Two principals, a controller that issues commands and a worker that
//! services them, rendezvous through a single shared record: one command
//! slot, one response slot, a status snapshot, and a shutdown flag, all
//! guarded by a mutex with two condition variables (`cmd_ready` wakes the
//! worker, `resp_ready` wakes the sender). Commands and responses are
//! strictly paired: a new command cannot be queued until the previous one
//! has been answered.
//!
//! Two backends provide the same contract:
//!
//! - **POSIX** (`cfg(unix)`): a named shared-memory object mapped into
//!   both processes, with `PTHREAD_PROCESS_SHARED` mutex and condition
//!   variables living inside the mapping.
//! - **In-process**: [`std::sync::Mutex`] and [`std::sync::Condvar`]
//!   behind a process-global registry, for hosts without POSIX shared
//!   memory and for hermetic tests.
//!
//! Blocking calls (`send_command`, `get_command`, `wait_response`) release
//! the lock while waiting and observe [`request_shutdown`]: a shutdown
//! broadcast wakes every blocked peer, which then returns
//! [`ChannelError::ShutdownRequested`].
//!
//! [`request_shutdown`]: channel::CommandChannel::request_shutdown
//! [`ChannelError::ShutdownRequested`]: error::ChannelError::ShutdownRequested

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod channel;
pub mod error;
mod local;
#[cfg(unix)]
mod posix;
pub mod prelude;
pub mod protocol;

pub use channel::CommandChannel;
pub use error::{ChannelError, ChannelResult};
pub use protocol::{
    ChannelConfig, CommandKind, CommandRequest, Response, ResponseStatus, StatusSnapshot,
    RESPONSE_DATA_WORDS,
};

/// Default name of the POSIX shared-memory object.
pub const DEFAULT_SHM_NAME: &str = "/motor_driver_shm";
