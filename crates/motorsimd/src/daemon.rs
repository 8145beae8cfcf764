//! The driver host: component wiring, tick loop, graceful shutdown.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use motorsim_irq::{InterruptController, IrqSource};
use motorsim_motor::{Direction, MotorController, MotorFault, MotorState};
use motorsim_registers::RegisterFile;
use motorsim_sensors::SensorArray;
use motorsim_shm::{CommandChannel, StatusSnapshot};

use crate::commands;
use crate::config::DaemonConfig;

/// Cleared by SIGINT/SIGTERM to end the tick loop.
static RUNNING: AtomicBool = AtomicBool::new(true);

fn running() -> bool {
    RUNNING.load(Ordering::SeqCst)
}

#[cfg(unix)]
extern "C" fn shutdown_handler(_signum: libc::c_int) {
    RUNNING.store(false, Ordering::SeqCst);
}

#[cfg(unix)]
fn install_shutdown_handler() -> Result<()> {
    // SAFETY: the handler only performs an atomic store.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        let handler: extern "C" fn(libc::c_int) = shutdown_handler;
        action.sa_sigaction = handler as usize;
        libc::sigemptyset(&mut action.sa_mask);

        for signum in [libc::SIGINT, libc::SIGTERM] {
            if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
                return Err(std::io::Error::last_os_error())
                    .context("Failed to install shutdown handler");
            }
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn install_shutdown_handler() -> Result<()> {
    Ok(())
}

/// Run the driver until a shutdown signal or channel request arrives.
pub fn run(config: &DaemonConfig) -> Result<()> {
    install_shutdown_handler()?;

    let regs = RegisterFile::new();
    let motor = Rc::new(RefCell::new(MotorController::new(&regs)));
    let sensors = Rc::new(RefCell::new(SensorArray::new(&regs)));
    let mut irq = InterruptController::new(&regs);

    // Fault lines log the latched cause; the sensor line logs backlog.
    {
        let motor = Rc::clone(&motor);
        irq.register_handler(IrqSource::MotorFault, move |_| {
            info!("[IRQ] Motor fault detected: {:?}", motor.borrow().fault());
        });
    }
    {
        let motor = Rc::clone(&motor);
        irq.register_handler(IrqSource::MotorStall, move |_| {
            info!("[IRQ] Motor stall: {:?}", motor.borrow().fault());
        });
    }
    {
        let sensors = Rc::clone(&sensors);
        irq.register_handler(IrqSource::SensorReady, move |_| {
            info!(
                "[IRQ] Sensor data ready, buffer count: {}",
                sensors.borrow().buffered_samples()
            );
        });
    }

    irq.enable(IrqSource::MotorFault);
    irq.enable(IrqSource::MotorStall);
    irq.enable(IrqSource::SensorReady);

    #[cfg(unix)]
    motorsim_irq::signal::install_signal_lines().context("Failed to install signal lines")?;

    let channel = CommandChannel::create(&config.channel)
        .context("Failed to create shared memory channel")?;

    sensors.borrow_mut().enable();

    info!("Driver initialized. PID: {}", std::process::id());
    info!("Send SIGUSR1 for motor fault, SIGUSR2 for sensor interrupt");

    let direction = if config.demo_clockwise {
        Direction::Cw
    } else {
        Direction::Ccw
    };
    info!(
        "Starting motor at {} RPM {:?}...",
        config.demo_start_speed, direction
    );
    motor
        .borrow_mut()
        .start(config.demo_start_speed, direction)
        .context("Demo motor start rejected")?;

    for (id, &value) in config.simulated_sensor_values.iter().enumerate() {
        sensors.borrow_mut().set_simulated_value(id, value);
    }

    let mut tick: u64 = 0;
    while running() && !channel.is_shutdown_requested() {
        motor.borrow_mut().update();

        if tick % config.sensor_trigger_interval == 0 {
            let _ = sensors.borrow_mut().trigger();
        }
        sensors.borrow_mut().update();

        if motor.borrow().state() == MotorState::Fault {
            irq.trigger(IrqSource::MotorFault);
        }
        irq.process_pending();

        publish_status(&channel, &motor, &sensors);

        match channel.try_get_command() {
            Ok(Some(request)) => commands::service_command(&channel, &motor, &sensors, request),
            Ok(None) => {}
            Err(e) if e.is_shutdown() => break,
            Err(e) => warn!("Command poll failed: {e}"),
        }

        if tick % config.status_log_interval == 0 {
            let m = motor.borrow();
            info!(
                "Tick {}: State={:?} Speed={} Position={} Temp={}",
                tick,
                m.state(),
                m.speed(),
                m.position(),
                sensors.borrow().read(2)
            );
        }

        thread::sleep(Duration::from_millis(config.tick_ms));
        tick += 1;
    }

    info!("Shutting down...");

    // Ramp the motor down before releasing anything.
    motor.borrow_mut().stop();
    while motor.borrow().is_running() {
        motor.borrow_mut().update();
        thread::sleep(Duration::from_millis(config.tick_ms));
    }

    sensors.borrow_mut().disable();
    irq.cleanup();
    channel
        .destroy()
        .context("Failed to destroy shared memory channel")?;

    Ok(())
}

fn publish_status(
    channel: &CommandChannel,
    motor: &Rc<RefCell<MotorController<'_>>>,
    sensors: &Rc<RefCell<SensorArray<'_>>>,
) {
    let m = motor.borrow();
    let mut sensor_values = [0i32; 4];
    sensors.borrow().read_all(&mut sensor_values);

    channel.update_status(&StatusSnapshot {
        motor_state: m.state().code(),
        motor_speed: m.speed(),
        motor_position: m.position(),
        sensor_values,
        fault_code: MotorFault::code(m.fault()),
    });
}
