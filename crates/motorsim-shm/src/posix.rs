//! POSIX shared-memory channel backend.
//!
//! The channel record lives inside a named shared-memory object mapped by
//! both processes. The mutex and both condition variables are initialized
//! with `PTHREAD_PROCESS_SHARED` so the rendezvous works across process
//! boundaries, not just threads.
//!
//! The owner (the process that called [`PosixChannel::create`]) unlinks
//! the object on destroy; peers merely unmap on drop.

use std::ffi::CString;
use std::fs::File;
use std::io;
use std::mem;
use std::os::unix::io::FromRawFd;

use memmap2::MmapMut;
use tracing::{debug, info};

use crate::error::{ChannelError, ChannelResult};
use crate::protocol::{
    CommandKind, CommandRequest, Response, ResponseStatus, StatusSnapshot, RESPONSE_DATA_WORDS,
};

/// On-shm layout of the channel record.
///
/// Field order mirrors the wire contract: synchronization primitives
/// first, then the command slot, response slot, status snapshot, and the
/// shutdown flag. Booleans are `u32` words so the layout has no
/// platform-dependent padding surprises.
#[repr(C)]
struct RawChannel {
    mutex: libc::pthread_mutex_t,
    cmd_ready: libc::pthread_cond_t,
    resp_ready: libc::pthread_cond_t,

    cmd: u32,
    cmd_param1: u32,
    cmd_param2: u32,
    cmd_pending: u32,

    resp_status: u32,
    resp_data: [i32; RESPONSE_DATA_WORDS],
    resp_ready_flag: u32,

    motor_state: u32,
    motor_speed: u32,
    motor_position: i32,
    sensor_values: [i32; 4],
    fault_code: u32,

    shutdown_requested: u32,
}

/// A channel endpoint backed by POSIX shared memory.
pub(crate) struct PosixChannel {
    // Kept alive for the lifetime of `ptr`; unmapped on drop.
    _map: MmapMut,
    ptr: *mut RawChannel,
    name: CString,
    owner: bool,
}

// SAFETY: the record is designed for concurrent access from multiple
// processes; every field access happens under the process-shared mutex,
// and the mapping itself is immovable for the lifetime of the value.
unsafe impl Send for PosixChannel {}
unsafe impl Sync for PosixChannel {}

fn shm_name(name: &str) -> ChannelResult<CString> {
    if name.is_empty() {
        return Err(ChannelError::InvalidName(name.to_string()));
    }
    CString::new(name).map_err(|_| ChannelError::InvalidName(name.to_string()))
}

impl PosixChannel {
    /// Create (or re-open) the named object, size it for one record, map
    /// it, and initialize the process-shared primitives and slot flags.
    pub(crate) fn create(name: &str) -> ChannelResult<Self> {
        let cname = shm_name(name)?;

        // SAFETY: cname is a valid NUL-terminated string; the fd is
        // immediately wrapped in a File which owns it from here on.
        let fd = unsafe { libc::shm_open(cname.as_ptr(), libc::O_CREAT | libc::O_RDWR, 0o666) };
        if fd < 0 {
            return Err(io::Error::last_os_error().into());
        }
        let file = unsafe { File::from_raw_fd(fd) };
        file.set_len(mem::size_of::<RawChannel>() as u64)?;

        // SAFETY: the object was just sized to hold one RawChannel.
        let mut map = unsafe { MmapMut::map_mut(&file)? };
        let ptr = map.as_mut_ptr() as *mut RawChannel;

        // SAFETY: ptr points at a mapping large enough for RawChannel;
        // the pthread attr objects are initialized before use and
        // destroyed after.
        unsafe {
            let ch = &mut *ptr;

            let mut mutex_attr: libc::pthread_mutexattr_t = mem::zeroed();
            libc::pthread_mutexattr_init(&mut mutex_attr);
            libc::pthread_mutexattr_setpshared(&mut mutex_attr, libc::PTHREAD_PROCESS_SHARED);
            libc::pthread_mutex_init(&mut ch.mutex, &mutex_attr);
            libc::pthread_mutexattr_destroy(&mut mutex_attr);

            let mut cond_attr: libc::pthread_condattr_t = mem::zeroed();
            libc::pthread_condattr_init(&mut cond_attr);
            libc::pthread_condattr_setpshared(&mut cond_attr, libc::PTHREAD_PROCESS_SHARED);
            libc::pthread_cond_init(&mut ch.cmd_ready, &cond_attr);
            libc::pthread_cond_init(&mut ch.resp_ready, &cond_attr);
            libc::pthread_condattr_destroy(&mut cond_attr);

            ch.cmd = CommandKind::None as u32;
            ch.cmd_pending = 0;
            ch.resp_ready_flag = 0;
            ch.shutdown_requested = 0;
        }

        info!(name, "shared memory channel created");
        Ok(Self {
            _map: map,
            ptr,
            name: cname,
            owner: true,
        })
    }

    /// Attach to an object another process already created.
    pub(crate) fn open_existing(name: &str) -> ChannelResult<Self> {
        let cname = shm_name(name)?;

        // SAFETY: cname is a valid NUL-terminated string.
        let fd = unsafe { libc::shm_open(cname.as_ptr(), libc::O_RDWR, 0o666) };
        if fd < 0 {
            let err = io::Error::last_os_error();
            return Err(if err.kind() == io::ErrorKind::NotFound {
                ChannelError::NotFound(name.to_string())
            } else {
                err.into()
            });
        }
        let file = unsafe { File::from_raw_fd(fd) };

        // SAFETY: the creator sized the object for one RawChannel.
        let mut map = unsafe { MmapMut::map_mut(&file)? };
        let ptr = map.as_mut_ptr() as *mut RawChannel;

        debug!(name, "attached to shared memory channel");
        Ok(Self {
            _map: map,
            ptr,
            name: cname,
            owner: false,
        })
    }

    /// Destroy the synchronization primitives and unlink the object.
    pub(crate) fn destroy(self) -> ChannelResult<()> {
        // SAFETY: no other call on this endpoint can be in flight (we
        // consume self); peers in other processes must have detached.
        unsafe {
            let ch = &mut *self.ptr;
            libc::pthread_mutex_destroy(&mut ch.mutex);
            libc::pthread_cond_destroy(&mut ch.cmd_ready);
            libc::pthread_cond_destroy(&mut ch.resp_ready);
            libc::shm_unlink(self.name.as_ptr());
        }
        info!(name = ?self.name, "shared memory channel destroyed");
        Ok(())
    }

    /// Run `f` with the record locked.
    fn with_lock<R>(&self, f: impl FnOnce(&mut RawChannel) -> R) -> R {
        // SAFETY: ptr is valid for the lifetime of self, and the
        // process-shared mutex serializes every access to the record.
        unsafe {
            let ch = &mut *self.ptr;
            libc::pthread_mutex_lock(&mut ch.mutex);
            let result = f(&mut *ch);
            libc::pthread_mutex_unlock(&mut ch.mutex);
            result
        }
    }

    pub(crate) fn send_command(
        &self,
        kind: CommandKind,
        param1: u32,
        param2: u32,
    ) -> ChannelResult<()> {
        self.with_lock(|ch| {
            while ch.cmd_pending != 0 && ch.shutdown_requested == 0 {
                // SAFETY: called with the mutex held, as cond_wait requires.
                unsafe {
                    libc::pthread_cond_wait(&mut ch.resp_ready, &mut ch.mutex);
                }
            }
            if ch.shutdown_requested != 0 {
                return Err(ChannelError::ShutdownRequested);
            }

            ch.cmd = kind as u32;
            ch.cmd_param1 = param1;
            ch.cmd_param2 = param2;
            ch.cmd_pending = 1;
            ch.resp_ready_flag = 0;
            // SAFETY: mutex held.
            unsafe {
                libc::pthread_cond_signal(&mut ch.cmd_ready);
            }
            Ok(())
        })
    }

    pub(crate) fn get_command(&self) -> ChannelResult<CommandRequest> {
        self.with_lock(|ch| {
            while ch.cmd_pending == 0 && ch.shutdown_requested == 0 {
                // SAFETY: mutex held.
                unsafe {
                    libc::pthread_cond_wait(&mut ch.cmd_ready, &mut ch.mutex);
                }
            }
            if ch.shutdown_requested != 0 {
                return Err(ChannelError::ShutdownRequested);
            }

            Ok(CommandRequest {
                kind: CommandKind::from_raw(ch.cmd),
                param1: ch.cmd_param1,
                param2: ch.cmd_param2,
            })
        })
    }

    pub(crate) fn try_get_command(&self) -> ChannelResult<Option<CommandRequest>> {
        self.with_lock(|ch| {
            if ch.shutdown_requested != 0 {
                return Err(ChannelError::ShutdownRequested);
            }
            if ch.cmd_pending == 0 {
                return Ok(None);
            }
            Ok(Some(CommandRequest {
                kind: CommandKind::from_raw(ch.cmd),
                param1: ch.cmd_param1,
                param2: ch.cmd_param2,
            }))
        })
    }

    pub(crate) fn send_response(&self, status: ResponseStatus, data: &[i32]) {
        self.with_lock(|ch| {
            ch.resp_status = status as u32;
            let count = data.len().min(RESPONSE_DATA_WORDS);
            ch.resp_data[..count].copy_from_slice(&data[..count]);
            ch.cmd_pending = 0;
            ch.resp_ready_flag = 1;
            // SAFETY: mutex held.
            unsafe {
                libc::pthread_cond_broadcast(&mut ch.resp_ready);
            }
        });
    }

    pub(crate) fn wait_response(&self) -> ChannelResult<Response> {
        self.with_lock(|ch| {
            while ch.resp_ready_flag == 0 && ch.shutdown_requested == 0 {
                // SAFETY: mutex held.
                unsafe {
                    libc::pthread_cond_wait(&mut ch.resp_ready, &mut ch.mutex);
                }
            }
            if ch.shutdown_requested != 0 {
                return Err(ChannelError::ShutdownRequested);
            }

            let response = Response {
                status: ResponseStatus::from_raw(ch.resp_status),
                data: ch.resp_data,
            };
            ch.resp_ready_flag = 0;
            // Unblock any sender waiting for the slot to free up.
            // SAFETY: mutex held.
            unsafe {
                libc::pthread_cond_signal(&mut ch.resp_ready);
            }
            Ok(response)
        })
    }

    pub(crate) fn update_status(&self, snapshot: &StatusSnapshot) {
        self.with_lock(|ch| {
            ch.motor_state = snapshot.motor_state;
            ch.motor_speed = snapshot.motor_speed;
            ch.motor_position = snapshot.motor_position;
            ch.sensor_values = snapshot.sensor_values;
            ch.fault_code = snapshot.fault_code;
        });
    }

    pub(crate) fn read_status(&self) -> StatusSnapshot {
        self.with_lock(|ch| StatusSnapshot {
            motor_state: ch.motor_state,
            motor_speed: ch.motor_speed,
            motor_position: ch.motor_position,
            sensor_values: ch.sensor_values,
            fault_code: ch.fault_code,
        })
    }

    pub(crate) fn is_shutdown_requested(&self) -> bool {
        self.with_lock(|ch| ch.shutdown_requested != 0)
    }

    pub(crate) fn request_shutdown(&self) {
        self.with_lock(|ch| {
            ch.shutdown_requested = 1;
            // SAFETY: mutex held.
            unsafe {
                libc::pthread_cond_broadcast(&mut ch.cmd_ready);
                libc::pthread_cond_broadcast(&mut ch.resp_ready);
            }
        });
    }

    pub(crate) fn is_owner(&self) -> bool {
        self.owner
    }
}

impl Drop for PosixChannel {
    fn drop(&mut self) {
        debug!(name = ?self.name, owner = self.owner, "detaching shared memory channel");
    }
}
