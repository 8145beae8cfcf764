//! The motor controller and its per-tick state machine.

use motorsim_registers::{map, RegisterFile};
use tracing::{debug, warn};

use crate::error::{MotorError, MotorResult};
use crate::state::{Direction, MotorFault, MotorState};
use crate::{MAX_SPEED, SPEED_RAMP_RATE};

/// Motor controller holding a borrowed view of the register file.
///
/// The controller is single-threaded: it is driven by the host tick loop
/// and never blocks. All register traffic goes through the shared
/// [`RegisterFile`] so other subsystems (and external observers) see the
/// same mirror the controller does.
#[derive(Debug)]
pub struct MotorController<'r> {
    regs: &'r RegisterFile,
    state: MotorState,
    fault: Option<MotorFault>,
    target_speed: u32,
    current_speed: u32,
    position: i32,
    direction: Direction,
}

impl<'r> MotorController<'r> {
    /// Create a controller in the `Idle` state and clear the motor
    /// registers.
    pub fn new(regs: &'r RegisterFile) -> Self {
        regs.write(map::MOTOR_CTRL, 0);
        regs.write(map::MOTOR_STATUS, 0);
        regs.write(map::MOTOR_SPEED, 0);
        regs.write(map::MOTOR_POSITION, 0);

        Self {
            regs,
            state: MotorState::Idle,
            fault: None,
            target_speed: 0,
            current_speed: 0,
            position: 0,
            direction: Direction::Ccw,
        }
    }

    /// Command the motor to ramp to `speed` RPM in `direction`.
    ///
    /// Speeds above [`MAX_SPEED`] are clamped. The control register is
    /// rewritten with `ENABLE` (and `DIR_CW` for clockwise), which also
    /// drops any lingering `BRAKE` bit.
    ///
    /// # Errors
    ///
    /// [`MotorError::FaultLatched`] while a fault is latched.
    pub fn start(&mut self, speed: u32, direction: Direction) -> MotorResult {
        if self.state == MotorState::Fault {
            return Err(MotorError::FaultLatched(self.latched_fault()));
        }

        self.target_speed = speed.min(MAX_SPEED);
        self.direction = direction;
        self.state = MotorState::Starting;

        let mut ctrl = map::motor_ctrl::ENABLE;
        if direction == Direction::Cw {
            ctrl |= map::motor_ctrl::DIR_CW;
        }
        self.regs.write(map::MOTOR_CTRL, ctrl);

        debug!(target_speed = self.target_speed, ?direction, "motor start");
        Ok(())
    }

    /// Begin a controlled ramp-down to zero.
    ///
    /// A no-op when already idle. The `ENABLE` bit drops immediately; the
    /// state machine ramps the speed down over the following ticks.
    pub fn stop(&mut self) {
        if self.state == MotorState::Idle {
            return;
        }

        self.target_speed = 0;
        self.state = MotorState::Stopping;
        self.regs.clear_bits(map::MOTOR_CTRL, map::motor_ctrl::ENABLE);
        debug!("motor stop requested");
    }

    /// Immediate stop: zero the speed, engage the brake, go `Idle`.
    ///
    /// The position accumulator is preserved.
    pub fn brake(&mut self) {
        self.target_speed = 0;
        self.current_speed = 0;
        self.state = MotorState::Idle;

        self.regs.set_bits(map::MOTOR_CTRL, map::motor_ctrl::BRAKE);
        self.regs.clear_bits(map::MOTOR_CTRL, map::motor_ctrl::ENABLE);
        self.regs.write(map::MOTOR_SPEED, 0);
        self.regs
            .clear_bits(map::MOTOR_STATUS, map::motor_status::RUNNING);
        debug!("motor brake engaged");
    }

    /// Change the target speed; the ramp engine enacts it over the
    /// following ticks.
    ///
    /// # Errors
    ///
    /// [`MotorError::FaultLatched`] while a fault is latched.
    pub fn set_speed(&mut self, speed: u32) -> MotorResult {
        if self.state == MotorState::Fault {
            return Err(MotorError::FaultLatched(self.latched_fault()));
        }

        self.target_speed = speed.min(MAX_SPEED);
        Ok(())
    }

    /// Reset the controller: pulse the `RESET` control bit, clear status
    /// and speed registers, return to `Idle` with no fault.
    ///
    /// The position accumulator deliberately survives a reset; only a
    /// fresh power-up (constructing a new controller) zeroes it.
    pub fn reset(&mut self) {
        self.regs.write(map::MOTOR_CTRL, map::motor_ctrl::RESET);
        self.regs.write(map::MOTOR_STATUS, 0);
        self.regs.write(map::MOTOR_SPEED, 0);

        self.state = MotorState::Idle;
        self.fault = None;
        self.current_speed = 0;
        self.target_speed = 0;

        // Best-effort pulse: observers may or may not see the bit high.
        self.regs.clear_bits(map::MOTOR_CTRL, map::motor_ctrl::RESET);
        debug!("motor reset");
    }

    /// Advance the state machine by one tick.
    ///
    /// Fault bits in the status register take precedence over everything
    /// else: they latch the `Fault` state and freeze the ramp until
    /// [`clear_fault`](Self::clear_fault) or [`reset`](Self::reset).
    pub fn update(&mut self) {
        let status = self.regs.read(map::MOTOR_STATUS);
        let fault_bits =
            map::motor_status::FAULT | map::motor_status::STALL | map::motor_status::OVERHEAT;
        if status & fault_bits != 0 {
            if self.state != MotorState::Fault {
                self.state = MotorState::Fault;
                self.fault = Some(if status & map::motor_status::STALL != 0 {
                    MotorFault::Stall
                } else if status & map::motor_status::OVERHEAT != 0 {
                    MotorFault::Overheat
                } else {
                    MotorFault::Overcurrent
                });
                warn!(fault = %self.latched_fault(), "motor fault latched");
            }
            return;
        }

        match self.state {
            MotorState::Idle | MotorState::Fault => {}

            MotorState::Starting => {
                if self.current_speed < self.target_speed {
                    self.current_speed += SPEED_RAMP_RATE;
                    if self.current_speed >= self.target_speed {
                        self.current_speed = self.target_speed;
                        self.state = MotorState::Running;
                        debug!(speed = self.current_speed, "motor at target speed");
                    }
                } else {
                    self.state = MotorState::Running;
                }
                self.regs.write(map::MOTOR_SPEED, self.current_speed);
                self.regs
                    .set_bits(map::MOTOR_STATUS, map::motor_status::RUNNING);
            }

            MotorState::Running => {
                if self.current_speed < self.target_speed {
                    self.current_speed =
                        (self.current_speed + SPEED_RAMP_RATE).min(self.target_speed);
                } else if self.current_speed > self.target_speed {
                    self.current_speed = self
                        .current_speed
                        .saturating_sub(SPEED_RAMP_RATE)
                        .max(self.target_speed);
                }
                self.regs.write(map::MOTOR_SPEED, self.current_speed);

                let step = (self.current_speed / 100) as i32;
                self.position = match self.direction {
                    Direction::Cw => self.position.saturating_add(step),
                    Direction::Ccw => self.position.saturating_sub(step),
                };
                self.regs.write(map::MOTOR_POSITION, self.position as u32);
            }

            MotorState::Stopping => {
                if self.current_speed > SPEED_RAMP_RATE {
                    self.current_speed -= SPEED_RAMP_RATE;
                } else {
                    self.current_speed = 0;
                    self.state = MotorState::Idle;
                    self.regs
                        .clear_bits(map::MOTOR_STATUS, map::motor_status::RUNNING);
                    debug!("motor stopped");
                }
                self.regs.write(map::MOTOR_SPEED, self.current_speed);
            }

            MotorState::Recovery => {
                // Recovery is a single-tick state.
                self.state = MotorState::Idle;
            }
        }
    }

    /// Force the controller into the fault state and raise the matching
    /// status-register bit. Test and simulation hook.
    pub fn inject_fault(&mut self, fault: MotorFault) {
        self.fault = Some(fault);
        self.state = MotorState::Fault;

        let bit = match fault {
            MotorFault::Stall => map::motor_status::STALL,
            MotorFault::Overheat => map::motor_status::OVERHEAT,
            MotorFault::Overcurrent => map::motor_status::FAULT,
        };
        self.regs.set_bits(map::MOTOR_STATUS, bit);
        warn!(%fault, "motor fault injected");
    }

    /// Clear a latched fault and enter `Recovery`; the next tick lands in
    /// `Idle`. A no-op outside the fault state.
    pub fn clear_fault(&mut self) {
        if self.state != MotorState::Fault {
            return;
        }

        self.fault = None;
        self.state = MotorState::Recovery;
        self.regs.write(map::MOTOR_STATUS, 0);
        debug!("motor fault cleared, entering recovery");
    }

    /// Current run state.
    #[must_use]
    pub fn state(&self) -> MotorState {
        self.state
    }

    /// Latched fault cause, if any.
    #[must_use]
    pub fn fault(&self) -> Option<MotorFault> {
        self.fault
    }

    /// Current speed in RPM.
    #[must_use]
    pub fn speed(&self) -> u32 {
        self.current_speed
    }

    /// Target speed in RPM.
    #[must_use]
    pub fn target_speed(&self) -> u32 {
        self.target_speed
    }

    /// Position accumulator in ticks.
    #[must_use]
    pub fn position(&self) -> i32 {
        self.position
    }

    /// Commanded direction.
    #[must_use]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// True while the motor is starting or running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        matches!(self.state, MotorState::Starting | MotorState::Running)
    }

    fn latched_fault(&self) -> MotorFault {
        self.fault.unwrap_or(MotorFault::Overcurrent)
    }
}
