//! Servicing of channel commands against the device model.

use std::cell::RefCell;

use tracing::{debug, warn};

use motorsim_motor::{Direction, MotorController, MotorFault};
use motorsim_sensors::SensorArray;
use motorsim_shm::{
    CommandChannel, CommandKind, CommandRequest, ResponseStatus, RESPONSE_DATA_WORDS,
};

/// Execute `request` against the motor and sensor array, then answer it.
pub(crate) fn service_command(
    channel: &CommandChannel,
    motor: &RefCell<MotorController<'_>>,
    sensors: &RefCell<SensorArray<'_>>,
    request: CommandRequest,
) {
    debug!("Servicing command {:?}", request.kind);
    let mut data = [0i32; RESPONSE_DATA_WORDS];

    let status = match request.kind {
        CommandKind::MotorStart => {
            let direction = Direction::from(request.param2);
            match motor.borrow_mut().start(request.param1, direction) {
                Ok(()) => ResponseStatus::Ok,
                Err(e) => {
                    warn!("Motor start rejected: {e}");
                    ResponseStatus::Error
                }
            }
        }

        CommandKind::MotorStop => {
            motor.borrow_mut().stop();
            ResponseStatus::Ok
        }

        CommandKind::MotorSetSpeed => match motor.borrow_mut().set_speed(request.param1) {
            Ok(()) => ResponseStatus::Ok,
            Err(e) => {
                warn!("Set speed rejected: {e}");
                ResponseStatus::Error
            }
        },

        CommandKind::SensorRead => {
            sensors.borrow().read_all(&mut data[..4]);
            ResponseStatus::Ok
        }

        CommandKind::GetStatus => {
            let m = motor.borrow();
            data[0] = m.state().code() as i32;
            data[1] = m.speed() as i32;
            data[2] = m.position();
            data[3] = MotorFault::code(m.fault()) as i32;
            ResponseStatus::Ok
        }

        CommandKind::Reset => {
            motor.borrow_mut().reset();
            sensors.borrow_mut().clear_samples();
            ResponseStatus::Ok
        }

        CommandKind::None => ResponseStatus::InvalidCommand,
    };

    channel.send_response(status, &data);
}
