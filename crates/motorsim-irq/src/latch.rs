//! Process-wide asynchronous interrupt latch.
//!
//! The asynchronous trigger path (a Unix signal handler, or any thread on
//! other hosts) has no controller context to call into, so the latch is a
//! process-wide static of atomics. The controller installs itself on
//! construction and releases on cleanup; raises that arrive while nothing
//! is installed are dropped, mirroring a device whose interrupt lines are
//! not wired up.
//!
//! Only atomic loads and stores happen here, no locks and no allocation,
//! so every entry point is safe from signal-handler context.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::controller::IrqSource;

/// The async-trigger latch.
#[derive(Debug)]
pub struct IrqLatch {
    installed: AtomicBool,
    signal_received: AtomicBool,
    raised: AtomicU32,
}

static LATCH: IrqLatch = IrqLatch::new();

impl IrqLatch {
    const fn new() -> Self {
        Self {
            installed: AtomicBool::new(false),
            signal_received: AtomicBool::new(false),
            raised: AtomicU32::new(0),
        }
    }

    /// Raise `source` from asynchronous context.
    ///
    /// Sets the signal flag and the source's bit; dropped when no
    /// controller is installed. Async-signal-safe.
    pub fn raise(source: IrqSource) {
        if !LATCH.installed.load(Ordering::Acquire) {
            return;
        }
        LATCH.raised.fetch_or(source.bit(), Ordering::AcqRel);
        LATCH.signal_received.store(true, Ordering::Release);
    }

    /// Install the latch for the lifetime of a controller.
    pub(crate) fn install() {
        LATCH.raised.store(0, Ordering::Relaxed);
        LATCH.signal_received.store(false, Ordering::Relaxed);
        LATCH.installed.store(true, Ordering::Release);
    }

    /// Release the latch; subsequent raises are dropped.
    pub(crate) fn release() {
        LATCH.installed.store(false, Ordering::Release);
        LATCH.raised.store(0, Ordering::Relaxed);
        LATCH.signal_received.store(false, Ordering::Relaxed);
    }

    /// Drain the latch: returns the raised-source mask if the signal flag
    /// was set since the last drain.
    pub(crate) fn drain() -> Option<u32> {
        if LATCH.signal_received.swap(false, Ordering::AcqRel) {
            Some(LATCH.raised.swap(0, Ordering::AcqRel))
        } else {
            None
        }
    }
}
