//! The channel facade over the platform backends.

use std::sync::Arc;

use tracing::debug;

use crate::error::ChannelResult;
use crate::local::LocalChannel;
#[cfg(unix)]
use crate::posix::PosixChannel;
use crate::protocol::{
    ChannelConfig, CommandKind, CommandRequest, Response, ResponseStatus, StatusSnapshot,
};

enum Backend {
    #[cfg(unix)]
    Posix(PosixChannel),
    Local { channel: Arc<LocalChannel>, name: String },
}

/// One endpoint of the command/status channel.
///
/// Endpoints are cheap to hold and internally synchronized; the blocking
/// calls ([`send_command`](Self::send_command),
/// [`get_command`](Self::get_command),
/// [`wait_response`](Self::wait_response)) release the channel lock while
/// waiting. The tick loop must use
/// [`try_get_command`](Self::try_get_command) so the update cadence never
/// stalls on an empty command slot.
pub struct CommandChannel {
    backend: Backend,
}

impl CommandChannel {
    /// Create the channel on the platform-default backend: POSIX shared
    /// memory on Unix, in-process elsewhere.
    ///
    /// # Errors
    ///
    /// Resource errors from the OS; the caller treats them as fatal.
    pub fn create(config: &ChannelConfig) -> ChannelResult<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                backend: Backend::Posix(PosixChannel::create(&config.name)?),
            })
        }
        #[cfg(not(unix))]
        {
            Self::create_in_process(config)
        }
    }

    /// Attach to a channel another process created.
    ///
    /// # Errors
    ///
    /// [`crate::ChannelError::NotFound`] when nothing is listening under
    /// the configured name.
    pub fn open_existing(config: &ChannelConfig) -> ChannelResult<Self> {
        #[cfg(unix)]
        {
            Ok(Self {
                backend: Backend::Posix(PosixChannel::open_existing(&config.name)?),
            })
        }
        #[cfg(not(unix))]
        {
            Self::open_in_process(config)
        }
    }

    /// Create an in-process channel regardless of platform. Peers in the
    /// same process attach with [`open_in_process`](Self::open_in_process).
    pub fn create_in_process(config: &ChannelConfig) -> ChannelResult<Self> {
        Ok(Self {
            backend: Backend::Local {
                channel: LocalChannel::create(&config.name),
                name: config.name.clone(),
            },
        })
    }

    /// Attach to an in-process channel created elsewhere in this process.
    ///
    /// # Errors
    ///
    /// [`crate::ChannelError::NotFound`] when the name is not registered.
    pub fn open_in_process(config: &ChannelConfig) -> ChannelResult<Self> {
        Ok(Self {
            backend: Backend::Local {
                channel: LocalChannel::open_existing(&config.name)?,
                name: config.name.clone(),
            },
        })
    }

    /// Tear the channel down and release the OS resource.
    ///
    /// Only the creating endpoint unlinks the backing object; calling
    /// this on a peer endpoint merely detaches, like dropping it.
    ///
    /// # Errors
    ///
    /// OS errors from unlinking the backing object.
    pub fn destroy(self) -> ChannelResult<()> {
        match self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => {
                if posix.is_owner() {
                    posix.destroy()
                } else {
                    Ok(())
                }
            }
            Backend::Local { name, .. } => {
                LocalChannel::destroy(&name);
                debug!(name, "in-process channel destroyed");
                Ok(())
            }
        }
    }

    /// Queue a command for the worker, blocking while a previous command
    /// is still unanswered.
    ///
    /// # Errors
    ///
    /// [`crate::ChannelError::ShutdownRequested`] when shutdown wakes the
    /// wait.
    pub fn send_command(&self, kind: CommandKind, param1: u32, param2: u32) -> ChannelResult<()> {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.send_command(kind, param1, param2),
            Backend::Local { channel, .. } => channel.send_command(kind, param1, param2),
        }
    }

    /// Blocking worker receive: waits until a command is pending.
    ///
    /// The command slot stays occupied until
    /// [`send_response`](Self::send_response) answers it.
    ///
    /// # Errors
    ///
    /// [`crate::ChannelError::ShutdownRequested`] when shutdown wakes the
    /// wait; callers must treat it as terminal.
    pub fn get_command(&self) -> ChannelResult<CommandRequest> {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.get_command(),
            Backend::Local { channel, .. } => channel.get_command(),
        }
    }

    /// Non-blocking worker receive: `Ok(None)` when no command is
    /// pending.
    ///
    /// # Errors
    ///
    /// [`crate::ChannelError::ShutdownRequested`] once shutdown has been
    /// requested.
    pub fn try_get_command(&self) -> ChannelResult<Option<CommandRequest>> {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.try_get_command(),
            Backend::Local { channel, .. } => channel.try_get_command(),
        }
    }

    /// Answer the pending command: copies up to eight payload words,
    /// frees the command slot, and wakes the waiting sender.
    pub fn send_response(&self, status: ResponseStatus, data: &[i32]) {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.send_response(status, data),
            Backend::Local { channel, .. } => channel.send_response(status, data),
        }
    }

    /// Block until the worker answers the outstanding command.
    ///
    /// # Errors
    ///
    /// [`crate::ChannelError::ShutdownRequested`] when shutdown wakes the
    /// wait.
    pub fn wait_response(&self) -> ChannelResult<Response> {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.wait_response(),
            Backend::Local { channel, .. } => channel.wait_response(),
        }
    }

    /// Publish a status snapshot. Independent of the command/response
    /// pairing; written atomically under the channel lock.
    pub fn update_status(&self, snapshot: &StatusSnapshot) {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.update_status(snapshot),
            Backend::Local { channel, .. } => channel.update_status(snapshot),
        }
    }

    /// Read the most recently published status snapshot.
    #[must_use]
    pub fn read_status(&self) -> StatusSnapshot {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.read_status(),
            Backend::Local { channel, .. } => channel.read_status(),
        }
    }

    /// True once shutdown has been requested.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.is_shutdown_requested(),
            Backend::Local { channel, .. } => channel.is_shutdown_requested(),
        }
    }

    /// Request shutdown and wake every peer blocked on the channel.
    pub fn request_shutdown(&self) {
        match &self.backend {
            #[cfg(unix)]
            Backend::Posix(posix) => posix.request_shutdown(),
            Backend::Local { channel, .. } => channel.request_shutdown(),
        }
    }
}
