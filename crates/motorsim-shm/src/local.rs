//! In-process channel backend.
//!
//! Hosts without POSIX shared memory get the same rendezvous contract
//! over [`std::sync::Mutex`] and [`std::sync::Condvar`]. A process-global
//! registry stands in for the OS namespace so `open_existing` can find a
//! record created elsewhere in the same process; this also keeps tests
//! hermetic.

use std::collections::BTreeMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use crate::error::{ChannelError, ChannelResult};
use crate::protocol::{
    CommandKind, CommandRequest, Response, ResponseStatus, StatusSnapshot, RESPONSE_DATA_WORDS,
};

/// Registry of live in-process channels, keyed by object name.
static REGISTRY: Mutex<BTreeMap<String, Arc<LocalChannel>>> = Mutex::new(BTreeMap::new());

fn registry() -> MutexGuard<'static, BTreeMap<String, Arc<LocalChannel>>> {
    REGISTRY.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ChannelState {
    cmd: u32,
    cmd_param1: u32,
    cmd_param2: u32,
    cmd_pending: bool,
    resp_status: u32,
    resp_data: [i32; RESPONSE_DATA_WORDS],
    resp_ready: bool,
    status: StatusSnapshot,
    shutdown: bool,
}

/// One in-process channel record.
#[derive(Debug, Default)]
pub(crate) struct LocalChannel {
    state: Mutex<ChannelState>,
    cmd_ready: Condvar,
    resp_ready: Condvar,
}

impl LocalChannel {
    /// Create the named record, or return the existing one (matching the
    /// open-or-create semantics of the POSIX backend).
    pub(crate) fn create(name: &str) -> Arc<LocalChannel> {
        registry()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(LocalChannel::default()))
            .clone()
    }

    /// Attach to an already-created record.
    pub(crate) fn open_existing(name: &str) -> ChannelResult<Arc<LocalChannel>> {
        registry()
            .get(name)
            .cloned()
            .ok_or_else(|| ChannelError::NotFound(name.to_string()))
    }

    /// Remove the named record from the registry; peers holding the Arc
    /// keep a dangling-but-valid record, as with an unlinked POSIX object.
    pub(crate) fn destroy(name: &str) {
        registry().remove(name);
    }

    fn lock(&self) -> MutexGuard<'_, ChannelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn send_command(&self, kind: CommandKind, param1: u32, param2: u32) -> ChannelResult<()> {
        let mut st = self.lock();
        while st.cmd_pending && !st.shutdown {
            st = self
                .resp_ready
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if st.shutdown {
            return Err(ChannelError::ShutdownRequested);
        }

        st.cmd = kind as u32;
        st.cmd_param1 = param1;
        st.cmd_param2 = param2;
        st.cmd_pending = true;
        st.resp_ready = false;
        self.cmd_ready.notify_one();
        Ok(())
    }

    pub(crate) fn get_command(&self) -> ChannelResult<CommandRequest> {
        let mut st = self.lock();
        while !st.cmd_pending && !st.shutdown {
            st = self
                .cmd_ready
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if st.shutdown {
            return Err(ChannelError::ShutdownRequested);
        }

        Ok(CommandRequest {
            kind: CommandKind::from_raw(st.cmd),
            param1: st.cmd_param1,
            param2: st.cmd_param2,
        })
    }

    pub(crate) fn try_get_command(&self) -> ChannelResult<Option<CommandRequest>> {
        let st = self.lock();
        if st.shutdown {
            return Err(ChannelError::ShutdownRequested);
        }
        if !st.cmd_pending {
            return Ok(None);
        }
        Ok(Some(CommandRequest {
            kind: CommandKind::from_raw(st.cmd),
            param1: st.cmd_param1,
            param2: st.cmd_param2,
        }))
    }

    pub(crate) fn send_response(&self, status: ResponseStatus, data: &[i32]) {
        let mut st = self.lock();
        st.resp_status = status as u32;
        let count = data.len().min(RESPONSE_DATA_WORDS);
        st.resp_data[..count].copy_from_slice(&data[..count]);
        st.cmd_pending = false;
        st.resp_ready = true;
        self.resp_ready.notify_all();
    }

    pub(crate) fn wait_response(&self) -> ChannelResult<Response> {
        let mut st = self.lock();
        while !st.resp_ready && !st.shutdown {
            st = self
                .resp_ready
                .wait(st)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if st.shutdown {
            return Err(ChannelError::ShutdownRequested);
        }

        let response = Response {
            status: ResponseStatus::from_raw(st.resp_status),
            data: st.resp_data,
        };
        st.resp_ready = false;
        // Unblock any sender waiting for the slot to free up.
        self.resp_ready.notify_one();
        Ok(response)
    }

    pub(crate) fn update_status(&self, snapshot: &StatusSnapshot) {
        self.lock().status = *snapshot;
    }

    pub(crate) fn read_status(&self) -> StatusSnapshot {
        self.lock().status
    }

    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.lock().shutdown
    }

    pub(crate) fn request_shutdown(&self) {
        let mut st = self.lock();
        st.shutdown = true;
        self.cmd_ready.notify_all();
        self.resp_ready.notify_all();
    }
}
