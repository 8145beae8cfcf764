//! The interrupt controller: masks, pend/dispatch, acknowledgement.

use motorsim_registers::{map, RegisterFile};
use tracing::{debug, trace};

use crate::latch::IrqLatch;

/// Interrupt sources, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum IrqSource {
    /// Motor entered the fault state.
    MotorFault = 0,
    /// Rotor stall detected.
    MotorStall = 1,
    /// Sensor data ready.
    SensorReady = 2,
    /// Sensor failure.
    SensorError = 3,
    /// Periodic timer, pended whenever the async latch fires.
    Timer = 4,
}

impl IrqSource {
    /// Number of interrupt sources.
    pub const COUNT: usize = 5;

    /// Every source, in ascending dispatch order.
    pub const ALL: [IrqSource; IrqSource::COUNT] = [
        IrqSource::MotorFault,
        IrqSource::MotorStall,
        IrqSource::SensorReady,
        IrqSource::SensorError,
        IrqSource::Timer,
    ];

    /// This source's bit in the pending/enabled masks and IRQ registers.
    #[inline]
    #[must_use]
    pub fn bit(self) -> u32 {
        1 << self as u32
    }

    /// Source index (0-based).
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// A registered interrupt handler.
///
/// Handlers are closures; whatever context they need is captured, and the
/// capture must outlive the controller (`'a`). They run from the tick
/// loop, never from asynchronous context.
pub type IrqHandler<'a> = Box<dyn FnMut(IrqSource) + 'a>;

/// The vectored interrupt controller.
///
/// Pending and enabled masks are mirrored in the `IRQ_STATUS` and
/// `IRQ_ENABLE` registers so external observers of the register file see
/// the controller's state, as on real silicon.
pub struct InterruptController<'a> {
    regs: &'a RegisterFile,
    handlers: [Option<IrqHandler<'a>>; IrqSource::COUNT],
    enabled: u32,
    pending: u32,
    released: bool,
}

impl<'a> InterruptController<'a> {
    /// Create a controller with every source disabled, clear the IRQ
    /// registers, and install the process-wide async latch.
    pub fn new(regs: &'a RegisterFile) -> Self {
        regs.write(map::IRQ_STATUS, 0);
        regs.write(map::IRQ_ENABLE, 0);
        IrqLatch::install();

        Self {
            regs,
            handlers: [None, None, None, None, None],
            enabled: 0,
            pending: 0,
            released: false,
        }
    }

    /// Bind `handler` to `source`, replacing any prior binding.
    pub fn register_handler(&mut self, source: IrqSource, handler: impl FnMut(IrqSource) + 'a) {
        self.handlers[source.index()] = Some(Box::new(handler));
    }

    /// Remove the handler bound to `source`, if any.
    pub fn unregister_handler(&mut self, source: IrqSource) {
        self.handlers[source.index()] = None;
    }

    /// Unmask `source`.
    pub fn enable(&mut self, source: IrqSource) {
        self.enabled |= source.bit();
        self.regs.set_bits(map::IRQ_ENABLE, source.bit());
    }

    /// Mask `source`; already-pending bits stay pending.
    pub fn disable(&mut self, source: IrqSource) {
        self.enabled &= !source.bit();
        self.regs.clear_bits(map::IRQ_ENABLE, source.bit());
    }

    /// Unmask every source.
    pub fn enable_all(&mut self) {
        self.enabled = (1 << IrqSource::COUNT as u32) - 1;
        self.regs.write(map::IRQ_ENABLE, self.enabled);
    }

    /// Mask every source.
    pub fn disable_all(&mut self) {
        self.enabled = 0;
        self.regs.write(map::IRQ_ENABLE, 0);
    }

    /// Pend `source` if it is enabled; silently dropped otherwise.
    /// Idempotent while already pending.
    pub fn trigger(&mut self, source: IrqSource) {
        if self.enabled & source.bit() != 0 {
            self.pending |= source.bit();
            self.regs.set_bits(map::IRQ_STATUS, source.bit());
            trace!(?source, "irq pended");
        }
    }

    /// True while `source` is pending.
    #[must_use]
    pub fn is_pending(&self, source: IrqSource) -> bool {
        self.pending & source.bit() != 0
    }

    /// The raw pending mask.
    #[must_use]
    pub fn pending_mask(&self) -> u32 {
        self.pending
    }

    /// Explicitly acknowledge `source` without dispatching it.
    pub fn clear(&mut self, source: IrqSource) {
        self.pending &= !source.bit();
        self.regs.clear_bits(map::IRQ_STATUS, source.bit());
    }

    /// Drain the async latch and dispatch everything pending.
    ///
    /// Latched async sources are fed through the normal enable gate, and
    /// a latch firing also pends [`IrqSource::Timer`]. Sources dispatch in
    /// ascending index order; a pending source without a handler is
    /// skipped but still acknowledged. On return the pending mask and the
    /// `IRQ_STATUS` register are clear.
    ///
    /// Returns the number of handlers invoked.
    pub fn process_pending(&mut self) -> usize {
        if let Some(raised) = IrqLatch::drain() {
            for source in IrqSource::ALL {
                if raised & source.bit() != 0 {
                    self.trigger(source);
                }
            }
            self.trigger(IrqSource::Timer);
        }

        let mut dispatched = 0;
        for source in IrqSource::ALL {
            if self.pending & source.bit() == 0 {
                continue;
            }
            if let Some(handler) = self.handlers[source.index()].as_mut() {
                trace!(?source, "irq dispatch");
                handler(source);
                dispatched += 1;
            }
        }

        self.pending = 0;
        self.regs.write(map::IRQ_STATUS, 0);
        dispatched
    }

    /// Tear the controller down: mask everything, release the process
    /// latch, and restore default dispositions of the host signal lines.
    ///
    /// Runs automatically on drop; calling it again is a no-op.
    pub fn cleanup(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        self.disable_all();
        IrqLatch::release();
        #[cfg(unix)]
        crate::signal::restore_default_lines();
        debug!("interrupt controller released");
    }
}

impl Drop for InterruptController<'_> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::latch_lock;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_new_clears_irq_registers() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        regs.write(map::IRQ_STATUS, 0xFF);
        regs.write(map::IRQ_ENABLE, 0xFF);

        let _irq = InterruptController::new(&regs);
        assert_eq!(regs.read(map::IRQ_STATUS), 0);
        assert_eq!(regs.read(map::IRQ_ENABLE), 0);
    }

    #[test]
    fn test_enable_mirrors_register() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);

        irq.enable(IrqSource::SensorReady);
        assert_eq!(regs.read(map::IRQ_ENABLE), IrqSource::SensorReady.bit());

        irq.disable(IrqSource::SensorReady);
        assert_eq!(regs.read(map::IRQ_ENABLE), 0);

        irq.enable_all();
        assert_eq!(regs.read(map::IRQ_ENABLE), 0b1_1111);

        irq.disable_all();
        assert_eq!(regs.read(map::IRQ_ENABLE), 0);
    }

    #[test]
    fn test_trigger_respects_enable_gate() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);

        irq.trigger(IrqSource::MotorFault);
        assert!(!irq.is_pending(IrqSource::MotorFault));

        irq.enable(IrqSource::MotorFault);
        irq.trigger(IrqSource::MotorFault);
        assert!(irq.is_pending(IrqSource::MotorFault));
        assert_eq!(regs.read(map::IRQ_STATUS), IrqSource::MotorFault.bit());
    }

    #[test]
    fn test_dispatch_invokes_handler_once_and_acknowledges() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);

        let count = Rc::new(Cell::new(0u32));
        let seen = Rc::clone(&count);
        irq.register_handler(IrqSource::MotorFault, move |source| {
            assert_eq!(source, IrqSource::MotorFault);
            seen.set(seen.get() + 1);
        });

        irq.enable(IrqSource::MotorFault);
        irq.trigger(IrqSource::MotorFault);
        irq.trigger(IrqSource::MotorFault); // idempotent pend

        assert_eq!(irq.process_pending(), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(irq.pending_mask(), 0);
        assert_eq!(regs.read(map::IRQ_STATUS), 0);

        // Nothing pending: nothing dispatched.
        assert_eq!(irq.process_pending(), 0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_dispatch_order_is_ascending_by_index() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);

        let order = Rc::new(Cell::new(Vec::new()));
        for source in [IrqSource::Timer, IrqSource::MotorFault, IrqSource::SensorReady] {
            let order = Rc::clone(&order);
            irq.register_handler(source, move |s| {
                let mut seen = order.take();
                seen.push(s);
                order.set(seen);
            });
        }

        irq.enable_all();
        irq.trigger(IrqSource::Timer);
        irq.trigger(IrqSource::SensorReady);
        irq.trigger(IrqSource::MotorFault);

        assert_eq!(irq.process_pending(), 3);
        assert_eq!(
            order.take(),
            vec![
                IrqSource::MotorFault,
                IrqSource::SensorReady,
                IrqSource::Timer
            ]
        );
    }

    #[test]
    fn test_pending_without_handler_is_acknowledged() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);

        irq.enable(IrqSource::SensorError);
        irq.trigger(IrqSource::SensorError);
        assert_eq!(irq.process_pending(), 0);
        assert_eq!(irq.pending_mask(), 0);
        assert_eq!(regs.read(map::IRQ_STATUS), 0);
    }

    #[test]
    fn test_clear_acknowledges_single_source() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);

        irq.enable_all();
        irq.trigger(IrqSource::MotorFault);
        irq.trigger(IrqSource::Timer);

        irq.clear(IrqSource::MotorFault);
        assert!(!irq.is_pending(IrqSource::MotorFault));
        assert!(irq.is_pending(IrqSource::Timer));
        assert_eq!(regs.read(map::IRQ_STATUS), IrqSource::Timer.bit());
    }

    #[test]
    fn test_latch_drain_pends_timer_and_mapped_sources() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);

        let timer_hits = Rc::new(Cell::new(0u32));
        let fault_hits = Rc::new(Cell::new(0u32));
        {
            let hits = Rc::clone(&timer_hits);
            irq.register_handler(IrqSource::Timer, move |_| hits.set(hits.get() + 1));
        }
        {
            let hits = Rc::clone(&fault_hits);
            irq.register_handler(IrqSource::MotorFault, move |_| hits.set(hits.get() + 1));
        }

        irq.enable(IrqSource::Timer);
        irq.enable(IrqSource::MotorFault);

        IrqLatch::raise(IrqSource::MotorFault);
        assert_eq!(irq.process_pending(), 2);
        assert_eq!(timer_hits.get(), 1);
        assert_eq!(fault_hits.get(), 1);

        // A raise for a masked source still fires the timer, but the
        // source itself is gated off.
        irq.disable(IrqSource::MotorFault);
        IrqLatch::raise(IrqSource::MotorFault);
        assert_eq!(irq.process_pending(), 1);
        assert_eq!(timer_hits.get(), 2);
        assert_eq!(fault_hits.get(), 1);
    }

    #[test]
    fn test_cleanup_releases_latch() {
        let _guard = latch_lock();
        let regs = RegisterFile::new();
        let mut irq = InterruptController::new(&regs);
        irq.enable_all();

        irq.cleanup();
        assert_eq!(regs.read(map::IRQ_ENABLE), 0);

        // Raises after release are dropped.
        IrqLatch::raise(IrqSource::SensorReady);
        assert_eq!(irq.process_pending(), 0);
    }
}
