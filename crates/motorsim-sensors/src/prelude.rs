//! Prelude module for convenient imports

pub use crate::array::{SensorArray, SensorKind, SensorState, SENSOR_COUNT};
pub use crate::buffer::{SampleBuffer, SAMPLE_BUFFER_SLOTS};
pub use crate::error::{SensorError, SensorResult};
