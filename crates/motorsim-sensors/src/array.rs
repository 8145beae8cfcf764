//! The sensor array and its acquisition state machine.

use motorsim_registers::{map, RegisterFile};
use tracing::{debug, warn};

use crate::buffer::SampleBuffer;
use crate::error::{SensorError, SensorResult};

/// Number of sensors in the array.
pub const SENSOR_COUNT: usize = 4;

/// What a sensor measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    /// Shaft position, ticks.
    Position,
    /// Shaft velocity, RPM.
    Velocity,
    /// Winding temperature, °C.
    Temperature,
    /// Phase current, mA.
    Current,
}

impl SensorKind {
    /// Fixed array layout: one sensor of each kind, in this order.
    pub const ALL: [SensorKind; SENSOR_COUNT] = [
        SensorKind::Position,
        SensorKind::Velocity,
        SensorKind::Temperature,
        SensorKind::Current,
    ];

    /// Closed legal range for this sensor kind; samples are clamped into
    /// it when acquisition completes.
    #[must_use]
    pub fn range(self) -> (i32, i32) {
        match self {
            SensorKind::Position => (-10_000, 10_000),
            SensorKind::Velocity => (0, 10_000),
            SensorKind::Temperature => (-40, 125),
            SensorKind::Current => (0, 5_000),
        }
    }
}

/// Acquisition state of one sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorState {
    /// Powered down; triggers are ignored.
    Disabled,
    /// Enabled and waiting for a trigger.
    Idle,
    /// Acquisition in flight; completes on the next update pass.
    Sampling,
    /// Sensor failure.
    Error,
}

#[derive(Debug)]
struct Sensor {
    kind: SensorKind,
    state: SensorState,
    value: i32,
    min: i32,
    max: i32,
    samples: u32,
}

impl Sensor {
    fn new(kind: SensorKind) -> Self {
        let (min, max) = kind.range();
        Self {
            kind,
            state: SensorState::Disabled,
            value: 0,
            min,
            max,
            samples: 0,
        }
    }
}

/// The four-sensor acquisition array.
///
/// Shares the register file with the other subsystems; the `SENSOR_CTRL`
/// and `SENSOR_STATUS` registers are the externally observable mirror of
/// the array's state, and `SENSOR_DATA` carries the most recent completed
/// sample as a side-channel for observers (core logic never reads it).
#[derive(Debug)]
pub struct SensorArray<'r> {
    regs: &'r RegisterFile,
    sensors: [Sensor; SENSOR_COUNT],
    buffer: SampleBuffer,
    continuous: bool,
}

impl<'r> SensorArray<'r> {
    /// Create the array with every sensor disabled and the sensor
    /// registers cleared.
    pub fn new(regs: &'r RegisterFile) -> Self {
        regs.write(map::SENSOR_CTRL, 0);
        regs.write(map::SENSOR_DATA, 0);
        regs.write(map::SENSOR_STATUS, 0);

        Self {
            regs,
            sensors: SensorKind::ALL.map(Sensor::new),
            buffer: SampleBuffer::new(),
            continuous: false,
        }
    }

    /// Power the array up: every sensor becomes idle, `ENABLE` and
    /// `READY` bits raise.
    pub fn enable(&mut self) {
        for sensor in &mut self.sensors {
            sensor.state = SensorState::Idle;
        }
        self.regs.set_bits(map::SENSOR_CTRL, map::sensor_ctrl::ENABLE);
        self.regs
            .set_bits(map::SENSOR_STATUS, map::sensor_status::READY);
        debug!("sensor array enabled");
    }

    /// Power the array down: every sensor disabled, `ENABLE` and `READY`
    /// bits drop.
    pub fn disable(&mut self) {
        for sensor in &mut self.sensors {
            sensor.state = SensorState::Disabled;
        }
        self.regs
            .clear_bits(map::SENSOR_CTRL, map::sensor_ctrl::ENABLE);
        self.regs
            .clear_bits(map::SENSOR_STATUS, map::sensor_status::READY);
        debug!("sensor array disabled");
    }

    /// Start an acquisition: every idle sensor moves to sampling and its
    /// sample counter advances. Completion happens on the next
    /// [`update`](Self::update) pass.
    ///
    /// # Errors
    ///
    /// [`SensorError::NotEnabled`] when the `ENABLE` control bit is clear.
    pub fn trigger(&mut self) -> SensorResult {
        if self.regs.read(map::SENSOR_CTRL) & map::sensor_ctrl::ENABLE == 0 {
            return Err(SensorError::NotEnabled);
        }

        self.regs
            .set_bits(map::SENSOR_CTRL, map::sensor_ctrl::TRIGGER);

        for sensor in &mut self.sensors {
            if sensor.state == SensorState::Idle {
                sensor.state = SensorState::Sampling;
                sensor.samples += 1;
            }
        }
        Ok(())
    }

    /// Switch continuous acquisition on or off, mirroring the
    /// `CONTINUOUS` control bit.
    pub fn set_continuous(&mut self, enable: bool) {
        self.continuous = enable;
        if enable {
            self.regs
                .set_bits(map::SENSOR_CTRL, map::sensor_ctrl::CONTINUOUS);
        } else {
            self.regs
                .clear_bits(map::SENSOR_CTRL, map::sensor_ctrl::CONTINUOUS);
        }
    }

    /// Complete the acquisition pass.
    ///
    /// Every sampling sensor finishes: its raw value is clamped into the
    /// sensor's legal range, the sensor returns to idle, and in
    /// continuous mode the sample is pushed into the buffer (a full
    /// buffer drops the sample and raises the sticky `OVERFLOW` bit).
    /// The `TRIGGER` bit clears afterwards, and continuous mode re-arms
    /// the next acquisition while the array remains ready.
    pub fn update(&mut self) {
        for i in 0..SENSOR_COUNT {
            if self.sensors[i].state != SensorState::Sampling {
                continue;
            }
            self.sensors[i].state = SensorState::Idle;
            self.sensors[i].value = self.sensors[i]
                .value
                .clamp(self.sensors[i].min, self.sensors[i].max);
            self.regs
                .write(map::SENSOR_DATA, self.sensors[i].value as u32);

            if self.continuous {
                if self.buffer.push(self.sensors[i].value).is_err() {
                    self.regs
                        .set_bits(map::SENSOR_STATUS, map::sensor_status::OVERFLOW);
                    warn!(
                        sensor = ?self.sensors[i].kind,
                        "sample buffer overflow, sample dropped"
                    );
                }
            }
        }

        self.regs
            .clear_bits(map::SENSOR_CTRL, map::sensor_ctrl::TRIGGER);

        if self.continuous && self.is_ready() {
            // Re-arm; cannot fail while the READY bit is set.
            let _ = self.trigger();
        }
    }

    /// Latest value of sensor `id`, or 0 for an out-of-range id.
    #[must_use]
    pub fn read(&self, id: usize) -> i32 {
        self.sensors.get(id).map_or(0, |s| s.value)
    }

    /// Copy up to [`SENSOR_COUNT`] values into `out`; returns the number
    /// copied.
    pub fn read_all(&self, out: &mut [i32]) -> usize {
        let count = out.len().min(SENSOR_COUNT);
        for (slot, sensor) in out.iter_mut().zip(&self.sensors) {
            *slot = sensor.value;
        }
        count
    }

    /// Inject a raw pre-clamp value for sensor `id`; the next update pass
    /// clamps it. Out-of-range ids are ignored. Test and simulation hook.
    pub fn set_simulated_value(&mut self, id: usize, value: i32) {
        if let Some(sensor) = self.sensors.get_mut(id) {
            sensor.value = value;
        }
    }

    /// Acquisition state of sensor `id`; out-of-range ids report `Error`.
    #[must_use]
    pub fn sensor_state(&self, id: usize) -> SensorState {
        self.sensors.get(id).map_or(SensorState::Error, |s| s.state)
    }

    /// Completed-acquisition count of sensor `id` (0 for out-of-range
    /// ids).
    #[must_use]
    pub fn sample_count(&self, id: usize) -> u32 {
        self.sensors.get(id).map_or(0, |s| s.samples)
    }

    /// True while the `READY` status bit is set.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.regs.read(map::SENSOR_STATUS) & map::sensor_status::READY != 0
    }

    /// True while the `ERROR` status bit is set.
    #[must_use]
    pub fn has_error(&self) -> bool {
        self.regs.read(map::SENSOR_STATUS) & map::sensor_status::ERROR != 0
    }

    /// Push a sample into the buffer directly.
    ///
    /// # Errors
    ///
    /// [`SensorError::BufferOverflow`] when the buffer is full; the sticky
    /// `OVERFLOW` status bit raises.
    pub fn push_sample(&mut self, sample: i32) -> SensorResult {
        if self.buffer.push(sample).is_err() {
            self.regs
                .set_bits(map::SENSOR_STATUS, map::sensor_status::OVERFLOW);
            return Err(SensorError::BufferOverflow);
        }
        Ok(())
    }

    /// Pop the oldest buffered sample, or `None` when the buffer is
    /// empty.
    pub fn pop_sample(&mut self) -> Option<i32> {
        self.buffer.pop()
    }

    /// Number of buffered samples.
    #[must_use]
    pub fn buffered_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered samples and clear the sticky `OVERFLOW` bit.
    pub fn clear_samples(&mut self) {
        self.buffer.clear();
        self.regs
            .clear_bits(map::SENSOR_STATUS, map::sensor_status::OVERFLOW);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SAMPLE_BUFFER_SLOTS;

    #[test]
    fn test_new_array_is_disabled_and_registers_clear() {
        let regs = RegisterFile::new();
        let array = SensorArray::new(&regs);

        for id in 0..SENSOR_COUNT {
            assert_eq!(array.sensor_state(id), SensorState::Disabled);
        }
        assert_eq!(regs.read(map::SENSOR_CTRL), 0);
        assert_eq!(regs.read(map::SENSOR_STATUS), 0);
    }

    #[test]
    fn test_enable_disable_mirror_registers() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);

        array.enable();
        assert!(array.is_ready());
        assert_ne!(regs.read(map::SENSOR_CTRL) & map::sensor_ctrl::ENABLE, 0);
        assert_eq!(array.sensor_state(0), SensorState::Idle);

        array.disable();
        assert!(!array.is_ready());
        assert_eq!(regs.read(map::SENSOR_CTRL) & map::sensor_ctrl::ENABLE, 0);
        assert_eq!(array.sensor_state(0), SensorState::Disabled);
    }

    #[test]
    fn test_trigger_requires_enable() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);

        assert_eq!(array.trigger(), Err(SensorError::NotEnabled));

        array.enable();
        array.trigger().expect("trigger");
        assert_eq!(array.sensor_state(2), SensorState::Sampling);
        assert_eq!(array.sample_count(2), 1);
    }

    #[test]
    fn test_update_clamps_to_sensor_range() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);
        array.enable();

        // Temperature sensor range is [-40, 125].
        array.set_simulated_value(2, 9999);
        array.trigger().expect("trigger");
        array.update();
        assert_eq!(array.read(2), 125);

        array.set_simulated_value(2, -500);
        array.trigger().expect("trigger");
        array.update();
        assert_eq!(array.read(2), -40);
    }

    #[test]
    fn test_update_clears_trigger_bit() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);
        array.enable();

        array.trigger().expect("trigger");
        assert_ne!(regs.read(map::SENSOR_CTRL) & map::sensor_ctrl::TRIGGER, 0);

        array.update();
        assert_eq!(regs.read(map::SENSOR_CTRL) & map::sensor_ctrl::TRIGGER, 0);
    }

    #[test]
    fn test_continuous_mode_buffers_and_retriggers() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);
        array.enable();
        array.set_continuous(true);
        assert_ne!(
            regs.read(map::SENSOR_CTRL) & map::sensor_ctrl::CONTINUOUS,
            0
        );

        array.set_simulated_value(0, 42);
        array.trigger().expect("trigger");
        array.update();

        // All four sensors completed, all four samples buffered.
        assert_eq!(array.buffered_samples(), SENSOR_COUNT);
        assert_eq!(array.pop_sample(), Some(42));

        // Continuous mode re-armed the acquisition.
        assert_eq!(array.sensor_state(0), SensorState::Sampling);
    }

    #[test]
    fn test_overflow_sets_sticky_bit_and_clear_resets_it() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);
        array.enable();

        for i in 0..SAMPLE_BUFFER_SLOTS as i32 {
            array.push_sample(i).expect("push");
        }
        assert_eq!(array.push_sample(99), Err(SensorError::BufferOverflow));
        assert_ne!(
            regs.read(map::SENSOR_STATUS) & map::sensor_status::OVERFLOW,
            0
        );

        array.clear_samples();
        assert_eq!(array.buffered_samples(), 0);
        assert_eq!(
            regs.read(map::SENSOR_STATUS) & map::sensor_status::OVERFLOW,
            0
        );
    }

    #[test]
    fn test_read_all_copies_up_to_four() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);
        array.enable();

        for id in 0..SENSOR_COUNT {
            array.set_simulated_value(id, (id as i32 + 1) * 10);
        }
        array.trigger().expect("trigger");
        array.update();

        let mut out = [0i32; 8];
        assert_eq!(array.read_all(&mut out), SENSOR_COUNT);
        assert_eq!(&out[..4], &[10, 20, 30, 40]);

        let mut short = [0i32; 2];
        assert_eq!(array.read_all(&mut short), 2);
        assert_eq!(short, [10, 20]);
    }

    #[test]
    fn test_out_of_range_ids_are_soft() {
        let regs = RegisterFile::new();
        let mut array = SensorArray::new(&regs);

        assert_eq!(array.read(99), 0);
        assert_eq!(array.sensor_state(99), SensorState::Error);
        assert_eq!(array.sample_count(99), 0);
        array.set_simulated_value(99, 1); // dropped
    }
}
