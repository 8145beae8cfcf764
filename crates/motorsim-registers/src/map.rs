//! Register map of the simulated motion-control device.
//!
//! Byte offsets of the word-sized registers, plus the bit assignments of
//! each control/status register. Offsets must be word-aligned; the file
//! spans `0x00..=0x20`.

/// Motor control register.
pub const MOTOR_CTRL: u32 = 0x00;
/// Motor status register.
pub const MOTOR_STATUS: u32 = 0x04;
/// Current motor speed in RPM.
pub const MOTOR_SPEED: u32 = 0x08;
/// Signed motor position accumulator in ticks.
pub const MOTOR_POSITION: u32 = 0x0C;
/// Sensor control register.
pub const SENSOR_CTRL: u32 = 0x10;
/// Most recent completed sensor sample (observer side-channel).
pub const SENSOR_DATA: u32 = 0x14;
/// Sensor status register.
pub const SENSOR_STATUS: u32 = 0x18;
/// IRQ pending bits, one per interrupt source.
pub const IRQ_STATUS: u32 = 0x1C;
/// IRQ enable bits, one per interrupt source.
pub const IRQ_ENABLE: u32 = 0x20;

/// Bit assignments of [`MOTOR_CTRL`].
pub mod motor_ctrl {
    /// Motor drive enabled.
    pub const ENABLE: u32 = 1 << 0;
    /// Direction is clockwise when set, counter-clockwise when clear.
    pub const DIR_CW: u32 = 1 << 1;
    /// Brake engaged; cleared by the next start.
    pub const BRAKE: u32 = 1 << 2;
    /// Reset pulse; write-then-clear, best effort for observers.
    pub const RESET: u32 = 1 << 7;
}

/// Bit assignments of [`MOTOR_STATUS`].
pub mod motor_status {
    /// Motor is ramping or at speed.
    pub const RUNNING: u32 = 1 << 0;
    /// Generic fault (mapped to overcurrent).
    pub const FAULT: u32 = 1 << 1;
    /// Rotor stall detected.
    pub const STALL: u32 = 1 << 2;
    /// Thermal limit exceeded.
    pub const OVERHEAT: u32 = 1 << 3;
}

/// Bit assignments of [`SENSOR_CTRL`].
pub mod sensor_ctrl {
    /// Sensor array enabled.
    pub const ENABLE: u32 = 1 << 0;
    /// Continuous acquisition mode.
    pub const CONTINUOUS: u32 = 1 << 1;
    /// Acquisition trigger; cleared when the pass completes.
    pub const TRIGGER: u32 = 1 << 2;
}

/// Bit assignments of [`SENSOR_STATUS`].
pub mod sensor_status {
    /// Array enabled and ready to sample.
    pub const READY: u32 = 1 << 0;
    /// Sample buffer overflowed; sticky until the buffer is cleared.
    pub const OVERFLOW: u32 = 1 << 1;
    /// A sensor is in the error state.
    pub const ERROR: u32 = 1 << 2;
}
