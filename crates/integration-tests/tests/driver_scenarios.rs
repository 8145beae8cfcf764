//! End-to-end driver scenarios: motor, sensors and interrupts working
//! through the shared register file.

use std::cell::Cell;
use std::rc::Rc;

use motorsim_integration_tests::run_motor_ticks;
use motorsim_irq::{InterruptController, IrqSource};
use motorsim_motor::{Direction, MotorController, MotorFault, MotorState, MAX_SPEED};
use motorsim_registers::{map, RegisterFile};
use motorsim_sensors::{SensorArray, SensorState};

#[test]
fn start_cruise_stop() {
    let regs = RegisterFile::new();
    let mut motor = MotorController::new(&regs);

    motor.start(5000, Direction::Cw).expect("start");
    assert_eq!(motor.state(), MotorState::Starting);

    run_motor_ticks(&mut motor, 20);
    assert_eq!(motor.state(), MotorState::Running);
    assert_eq!(motor.speed(), 5000);
    assert_eq!(
        regs.read(map::MOTOR_CTRL),
        map::motor_ctrl::ENABLE | map::motor_ctrl::DIR_CW
    );
    assert_ne!(regs.read(map::MOTOR_STATUS) & map::motor_status::RUNNING, 0);

    motor.stop();
    assert_eq!(motor.state(), MotorState::Stopping);

    run_motor_ticks(&mut motor, 20);
    assert_eq!(motor.state(), MotorState::Idle);
    assert_eq!(motor.speed(), 0);
    assert_eq!(regs.read(map::MOTOR_STATUS) & map::motor_status::RUNNING, 0);
}

#[test]
fn max_speed_clamp() {
    let regs = RegisterFile::new();
    let mut motor = MotorController::new(&regs);

    motor.start(99_999, Direction::Cw).expect("start");
    run_motor_ticks(&mut motor, 50);
    assert_eq!(motor.speed(), MAX_SPEED);
    assert_eq!(regs.read(map::MOTOR_SPEED), MAX_SPEED);
}

#[test]
fn direction_sign_on_position() {
    let regs = RegisterFile::new();
    let mut motor = MotorController::new(&regs);

    motor.start(1000, Direction::Cw).expect("start");
    run_motor_ticks(&mut motor, 20);
    assert!(motor.position() > 0);

    // Reset keeps the accumulator; the reverse leg runs long enough to
    // cross zero.
    motor.reset();
    motor.start(1000, Direction::Ccw).expect("start");
    run_motor_ticks(&mut motor, 50);
    assert!(motor.position() < 0);
}

#[test]
fn fault_and_recovery() {
    let regs = RegisterFile::new();
    let mut motor = MotorController::new(&regs);

    motor.start(5000, Direction::Cw).expect("start");
    motor.inject_fault(MotorFault::Stall);

    assert_eq!(motor.state(), MotorState::Fault);
    assert_eq!(motor.fault(), Some(MotorFault::Stall));
    assert_ne!(regs.read(map::MOTOR_STATUS) & map::motor_status::STALL, 0);

    motor.clear_fault();
    assert_eq!(motor.state(), MotorState::Recovery);

    motor.update();
    assert_eq!(motor.state(), MotorState::Idle);
    assert_eq!(motor.fault(), None);
}

#[test]
fn sensor_clamp_through_acquisition() {
    let regs = RegisterFile::new();
    let mut sensors = SensorArray::new(&regs);

    sensors.enable();
    sensors.set_simulated_value(2, 9999);
    sensors.trigger().expect("trigger");
    sensors.update();

    assert_eq!(sensors.read(2), 125);
    assert_eq!(sensors.sensor_state(2), SensorState::Idle);
}

#[test]
fn irq_dispatch_invokes_handler_exactly_once() {
    let regs = RegisterFile::new();
    let _motor = MotorController::new(&regs);
    let _sensors = SensorArray::new(&regs);
    let mut irq = InterruptController::new(&regs);

    let hits = Rc::new(Cell::new(0u32));
    {
        let hits = Rc::clone(&hits);
        irq.register_handler(IrqSource::MotorFault, move |_| hits.set(hits.get() + 1));
    }

    irq.enable(IrqSource::MotorFault);
    irq.trigger(IrqSource::MotorFault);
    assert_eq!(irq.process_pending(), 1);

    assert_eq!(hits.get(), 1);
    assert_eq!(irq.pending_mask(), 0);
    assert_eq!(regs.read(map::IRQ_STATUS), 0);
}

#[test]
fn motor_fault_propagates_to_interrupt_handler() {
    let regs = RegisterFile::new();
    let motor = Rc::new(std::cell::RefCell::new(MotorController::new(&regs)));
    let mut irq = InterruptController::new(&regs);

    let observed = Rc::new(Cell::new(None));
    {
        let motor = Rc::clone(&motor);
        let observed = Rc::clone(&observed);
        irq.register_handler(IrqSource::MotorFault, move |_| {
            observed.set(motor.borrow().fault());
        });
    }
    irq.enable(IrqSource::MotorFault);

    motor
        .borrow_mut()
        .start(3000, Direction::Cw)
        .expect("start");
    motor.borrow_mut().inject_fault(MotorFault::Overheat);

    // The tick loop pends the fault line whenever the motor is latched.
    motor.borrow_mut().update();
    if motor.borrow().state() == MotorState::Fault {
        irq.trigger(IrqSource::MotorFault);
    }
    irq.process_pending();

    assert_eq!(observed.get(), Some(MotorFault::Overheat));
}

#[test]
fn full_tick_cycle_mirrors_daemon_loop() {
    let regs = RegisterFile::new();
    let mut motor = MotorController::new(&regs);
    let mut sensors = SensorArray::new(&regs);
    let mut irq = InterruptController::new(&regs);
    irq.enable_all();

    sensors.enable();
    sensors.set_continuous(true);
    sensors.set_simulated_value(0, 100);
    sensors.set_simulated_value(1, 5000);
    sensors.set_simulated_value(2, 45);
    sensors.set_simulated_value(3, 2500);
    sensors.trigger().expect("trigger");

    motor.start(2000, Direction::Cw).expect("start");

    for _ in 0..10 {
        motor.update();
        sensors.update();
        irq.process_pending();
    }

    assert_eq!(motor.state(), MotorState::Running);
    assert_eq!(motor.speed(), 2000);

    let mut values = [0i32; 4];
    assert_eq!(sensors.read_all(&mut values), 4);
    assert_eq!(values, [100, 5000, 45, 2500]);

    // Continuous mode kept sampling; the buffer holds completed samples
    // (bounded by capacity).
    assert!(sensors.buffered_samples() > 0);
}
