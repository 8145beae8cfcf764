//! Wire types shared by both channel backends.

use serde::{Deserialize, Serialize};

use crate::DEFAULT_SHM_NAME;

/// Number of payload words in the response slot.
pub const RESPONSE_DATA_WORDS: usize = 8;

/// Command kinds understood by the worker.
///
/// Discriminants are the on-wire encoding; 0 marks an empty command slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum CommandKind {
    /// Empty slot / unrecognized command.
    None = 0,
    /// Start the motor: param1 = speed (RPM), param2 = direction (1 = CW).
    MotorStart = 1,
    /// Ramp the motor down to a stop.
    MotorStop = 2,
    /// Change the target speed: param1 = speed (RPM).
    MotorSetSpeed = 3,
    /// Read all sensor values into the response payload.
    SensorRead = 4,
    /// Read motor state, speed, position and fault code.
    GetStatus = 5,
    /// Reset the motor controller and clear the sample buffer.
    Reset = 6,
}

impl CommandKind {
    /// Decode a wire value; unknown values map to `None`, which the
    /// worker answers with [`ResponseStatus::InvalidCommand`].
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            1 => CommandKind::MotorStart,
            2 => CommandKind::MotorStop,
            3 => CommandKind::MotorSetSpeed,
            4 => CommandKind::SensorRead,
            5 => CommandKind::GetStatus,
            6 => CommandKind::Reset,
            _ => CommandKind::None,
        }
    }
}

/// Response status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ResponseStatus {
    /// Command serviced.
    Ok = 0,
    /// The operation was rejected or failed.
    Error = 1,
    /// The worker cannot take the command right now.
    Busy = 2,
    /// The command kind was not recognized.
    InvalidCommand = 3,
}

impl ResponseStatus {
    /// Decode a wire value; unknown values map to `Error`.
    #[must_use]
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => ResponseStatus::Ok,
            2 => ResponseStatus::Busy,
            3 => ResponseStatus::InvalidCommand,
            _ => ResponseStatus::Error,
        }
    }
}

/// A received command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandRequest {
    /// What to do.
    pub kind: CommandKind,
    /// First parameter; meaning depends on `kind`.
    pub param1: u32,
    /// Second parameter; meaning depends on `kind`.
    pub param2: u32,
}

/// A received response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    /// Outcome of the paired command.
    pub status: ResponseStatus,
    /// Payload words; meaning depends on the command.
    pub data: [i32; RESPONSE_DATA_WORDS],
}

/// Most-recent driver state, published each tick for external observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusSnapshot {
    /// Motor state code.
    pub motor_state: u32,
    /// Current motor speed in RPM.
    pub motor_speed: u32,
    /// Motor position accumulator.
    pub motor_position: i32,
    /// Latest value of each sensor.
    pub sensor_values: [i32; 4],
    /// Motor fault code (0 = none).
    pub fault_code: u32,
}

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Name of the shared-memory object (POSIX backend).
    pub name: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SHM_NAME.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_kind_roundtrip() {
        for kind in [
            CommandKind::MotorStart,
            CommandKind::MotorStop,
            CommandKind::MotorSetSpeed,
            CommandKind::SensorRead,
            CommandKind::GetStatus,
            CommandKind::Reset,
        ] {
            assert_eq!(CommandKind::from_raw(kind as u32), kind);
        }
    }

    #[test]
    fn test_unknown_command_decodes_to_none() {
        assert_eq!(CommandKind::from_raw(0), CommandKind::None);
        assert_eq!(CommandKind::from_raw(999), CommandKind::None);
    }

    #[test]
    fn test_unknown_status_decodes_to_error() {
        assert_eq!(ResponseStatus::from_raw(1), ResponseStatus::Error);
        assert_eq!(ResponseStatus::from_raw(77), ResponseStatus::Error);
    }

    #[test]
    fn test_default_config_uses_default_object_name() {
        assert_eq!(ChannelConfig::default().name, "/motor_driver_shm");
    }
}
