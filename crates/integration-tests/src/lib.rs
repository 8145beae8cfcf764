//! End-to-end test suite for the motorsim driver
//!
//! The scenarios here span component boundaries: motor ramps observed
//! through the register file, sensor acquisition feeding the interrupt
//! controller, and full command/response round trips over the channel.

#![deny(rust_2018_idioms)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use std::sync::atomic::{AtomicUsize, Ordering};

use motorsim_motor::MotorController;

/// Advance the motor state machine `n` ticks.
pub fn run_motor_ticks(motor: &mut MotorController<'_>, n: usize) {
    for _ in 0..n {
        motor.update();
    }
}

/// A channel object name no other concurrently-running test uses.
pub fn unique_channel_name(tag: &str) -> String {
    static COUNTER: AtomicUsize = AtomicUsize::new(0);
    let id = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("/motorsim-test-{tag}-{}-{id}", std::process::id())
}
