//! Host signal lines simulating hardware interrupt wires (Unix).
//!
//! Two signals map onto the async latch: `SIGUSR1` pends
//! [`IrqSource::MotorFault`] and `SIGUSR2` pends
//! [`IrqSource::SensorReady`]. The handler only touches the latch
//! atomics; dispatch happens on the next tick.

use std::io;

use tracing::debug;

use crate::controller::IrqSource;
use crate::error::IrqResult;
use crate::latch::IrqLatch;

extern "C" fn line_handler(signum: libc::c_int) {
    match signum {
        libc::SIGUSR1 => IrqLatch::raise(IrqSource::MotorFault),
        libc::SIGUSR2 => IrqLatch::raise(IrqSource::SensorReady),
        _ => {}
    }
}

/// Install the two signal lines.
///
/// # Errors
///
/// [`crate::IrqError::SignalSetup`] when `sigaction` fails.
pub fn install_signal_lines() -> IrqResult {
    // SAFETY: sigaction is called with a zeroed, fully initialized
    // struct; the handler only performs atomic stores.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        let handler: extern "C" fn(libc::c_int) = line_handler;
        action.sa_sigaction = handler as usize;
        action.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut action.sa_mask);

        for signum in [libc::SIGUSR1, libc::SIGUSR2] {
            if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
                return Err(io::Error::last_os_error().into());
            }
        }
    }

    debug!("signal lines installed (SIGUSR1 -> motor fault, SIGUSR2 -> sensor ready)");
    Ok(())
}

/// Restore the default dispositions of both signal lines.
pub(crate) fn restore_default_lines() {
    // SAFETY: resetting to SIG_DFL is always valid.
    unsafe {
        libc::signal(libc::SIGUSR1, libc::SIG_DFL);
        libc::signal(libc::SIGUSR2, libc::SIG_DFL);
    }
}
