//! The implementation of the SysTick timer driver.
use core::{
    fmt, ptr,
    sync::atomic::{AtomicPtr, Ordering},
};
use tock_registers::interfaces::{ReadWriteable, Readable, Writeable};

use crate::{
    regs::{RegisterFile, RegisterFileExt, STCTRL, STRELOAD, STCURRENT},
    reload_for, ConfigError, TimerMode, TimerState,
};

/// A function called on every timer expiry.
pub type Callback = fn();

/// Holds at most one [`Callback`]. Written from the foreground, read from the
/// SysTick handler.
struct CallbackSlot(AtomicPtr<()>);

impl CallbackSlot {
    const fn new() -> Self {
        Self(AtomicPtr::new(ptr::null_mut()))
    }

    #[inline]
    fn store(&self, callback: Option<Callback>) {
        let p = callback.map_or(ptr::null_mut(), |f| f as *mut ());
        self.0.store(p, Ordering::Release);
    }

    #[inline]
    fn load(&self) -> Option<Callback> {
        let p = self.0.load(Ordering::Acquire);
        if p.is_null() {
            None
        } else {
            // Safety: Only `store` writes a non-null value, and it's always
            //         a `Callback`
            Some(unsafe { core::mem::transmute::<*mut (), Callback>(p) })
        }
    }
}

/// The driver for the SysTick timer.
///
/// The timer counts down from the reload value at the frequency given to
/// [`new`](Self::new) and, in interrupt mode, raises the SysTick exception
/// every period. The exception handler must call [`handler`](Self::handler),
/// which dispatches to the registered callback. [`use_systick!`] sets this up
/// for the memory-mapped register file.
///
/// The callback is independent of the counter configuration. It survives
/// [`init`](Self::init) and [`deinit`](Self::deinit) and is only replaced by
/// [`set_callback`](Self::set_callback) and
/// [`clear_callback`](Self::clear_callback).
///
/// [`use_systick!`]: crate::use_systick
pub struct SystemTimer<R> {
    regs: R,
    frequency: u32,
    callback: CallbackSlot,
}

impl<R: fmt::Debug> fmt::Debug for SystemTimer<R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SystemTimer")
            .field("regs", &self.regs)
            .field("frequency", &self.frequency)
            .field("callback", &self.callback.load())
            .finish()
    }
}

impl<R> SystemTimer<R> {
    /// Construct a `SystemTimer` operating on `regs`. `frequency` is the
    /// frequency of the system clock, measured in hertz.
    pub const fn new(regs: R, frequency: u32) -> Self {
        Self {
            regs,
            frequency,
            callback: CallbackSlot::new(),
        }
    }

    /// Get a reference to the underlying register file.
    pub fn regs(&self) -> &R {
        &self.regs
    }

    /// Get the frequency of the system clock, measured in hertz.
    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Register `callback` to be called on every timer expiry, replacing the
    /// previous one. Takes effect from the next expiry.
    pub fn set_callback(&self, callback: Callback) {
        self.callback.store(Some(callback));
    }

    /// Unregister the callback.
    pub fn clear_callback(&self) {
        self.callback.store(None);
    }

    /// Get the registered callback.
    pub fn callback(&self) -> Option<Callback> {
        self.callback.load()
    }

    /// The SysTick exception handler. Calls the registered callback once, or
    /// does nothing if there's none.
    #[inline]
    pub fn handler(&self) {
        if let Some(callback) = self.callback.load() {
            callback();
        }
    }
}

impl<R: RegisterFile> SystemTimer<R> {
    /// Stop the timer, load the reload value for `period_ms`, and restart the
    /// counter in interrupt mode.
    ///
    /// Returns [`ConfigError::BadPeriod`] without touching any register if the
    /// period is zero or too long for the 24-bit counter.
    pub fn init(&self, period_ms: u32) -> Result<(), ConfigError> {
        let reload = self.load(period_ms)?;
        self.regs.st_ctrl().write(
            STCTRL::CLK_SRC::SystemClock + STCTRL::INTEN::SET + STCTRL::ENABLE::SET,
        );
        log::debug!("SysTick running at {} ms (reload = {})", period_ms, reload);
        Ok(())
    }

    /// Run the counter for `period_ms` with the interrupt disabled, block
    /// until it expires, and then stop it.
    ///
    /// This spins for the whole period. Don't call it from a context that
    /// can't block.
    ///
    /// Returns [`ConfigError::BadPeriod`] without touching any register if the
    /// period is zero or too long for the 24-bit counter.
    pub fn start_busy_wait(&self, period_ms: u32) -> Result<(), ConfigError> {
        let reload = self.load(period_ms)?;
        self.regs
            .st_ctrl()
            .write(STCTRL::CLK_SRC::SystemClock + STCTRL::ENABLE::SET);
        log::trace!("busy-waiting for {} ms (reload = {})", period_ms, reload);

        // `COUNT` is cleared by reading, so this observes each expiry once
        while !self.regs.st_ctrl().is_set(STCTRL::COUNT) {
            core::hint::spin_loop();
        }

        self.stop();
        Ok(())
    }

    /// Validate `period_ms`, then stop the counter and load the new period.
    fn load(&self, period_ms: u32) -> Result<u32, ConfigError> {
        let reload = reload_for(self.frequency, period_ms).map_err(|e| {
            log::warn!(
                "rejecting a period of {} ms at {} Hz: {}",
                period_ms,
                self.frequency,
                e
            );
            e
        })?;

        self.regs.st_ctrl().set(0);
        self.regs.st_reload().write(STRELOAD::RELOAD.val(reload));
        // Any write clears the counter and `COUNT`
        self.regs.st_current().write(STCURRENT::CURRENT.val(0));
        Ok(reload)
    }

    /// Disable the counter, keeping the rest of the configuration.
    pub fn stop(&self) {
        log::trace!("stop");
        self.regs.st_ctrl().modify(STCTRL::ENABLE::CLEAR);
    }

    /// Re-enable the counter after [`stop`](Self::stop).
    pub fn start(&self) {
        log::trace!("start");
        self.regs.st_ctrl().modify(STCTRL::ENABLE::SET);
    }

    /// Disable the counter and its interrupt. The callback is kept.
    pub fn deinit(&self) {
        self.regs.st_ctrl().set(0);
        log::debug!("SysTick deinitialized");
    }

    /// Get the current reload value.
    pub fn reload(&self) -> u32 {
        self.regs.st_reload().read(STRELOAD::RELOAD)
    }

    /// Get the current counter value.
    pub fn current(&self) -> u32 {
        self.regs.st_current().read(STCURRENT::CURRENT)
    }

    /// Get the state of the timer.
    ///
    /// This reads `STCTRL`, which clears its `COUNT` flag.
    pub fn state(&self) -> TimerState {
        let ctrl = self.regs.st_ctrl().extract();
        if ctrl.is_set(STCTRL::ENABLE) {
            TimerState::Running
        } else if ctrl.is_set(STCTRL::INTEN) || ctrl.is_set(STCTRL::CLK_SRC) {
            TimerState::Stopped
        } else {
            TimerState::Uninitialized
        }
    }

    /// Get the mode the timer is configured in.
    ///
    /// This reads `STCTRL`, which clears its `COUNT` flag.
    pub fn mode(&self) -> TimerMode {
        if self.regs.st_ctrl().is_set(STCTRL::INTEN) {
            TimerMode::Interrupt
        } else {
            TimerMode::BusyWait
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use crate::{regs::Reg, sim::SimRegisterFile, DEFAULT_FREQUENCY};
    use core::sync::atomic::AtomicUsize;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn timer() -> SystemTimer<SimRegisterFile> {
        init_logger();
        SystemTimer::new(SimRegisterFile::new(), DEFAULT_FREQUENCY)
    }

    #[test]
    fn init_programs_the_counter() {
        let timer = timer();
        timer.init(10).unwrap();
        assert_eq!(timer.regs().peek(Reg::StReload), 159_999);
        assert_eq!(timer.regs().peek(Reg::StCurrent), 0);
        assert_eq!(timer.regs().peek(Reg::StCtrl), 0x07);

        timer.init(1).unwrap();
        assert_eq!(timer.reload(), 15_999);
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.mode(), TimerMode::Interrupt);
    }

    #[test]
    fn init_rejects_bad_periods() {
        let timer = timer();
        timer.init(10).unwrap();
        timer.regs().elapse(1234);
        let snapshot = timer.regs().snapshot();

        assert_eq!(timer.init(0), Err(ConfigError::BadPeriod));
        assert_eq!(timer.init(2000), Err(ConfigError::BadPeriod));
        assert_eq!(timer.start_busy_wait(0), Err(ConfigError::BadPeriod));
        assert_eq!(timer.regs().snapshot(), snapshot);
    }

    #[test]
    fn init_clears_a_stale_count_flag() {
        let timer = timer();
        timer.init(1).unwrap();
        timer.regs().elapse(16_000);
        assert!(timer.regs().count_flag());

        timer.init(1).unwrap();
        assert!(!timer.regs().count_flag());
        assert_eq!(timer.current(), 0);
    }

    #[test]
    fn busy_wait() {
        let timer = timer();
        timer.start_busy_wait(5).unwrap();

        // 80,000 cycles at 1,000 cycles per poll
        assert!(timer.regs().st_ctrl_reads() >= 80);
        assert_eq!(timer.regs().expirations(), 1);
        assert_eq!(timer.regs().peek(Reg::StCtrl) & 1, 0);
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.mode(), TimerMode::BusyWait);

        // The interrupt stays disabled throughout
        assert!(!timer.regs().take_pending_systick());
    }

    #[test]
    fn busy_wait_after_init() {
        let timer = timer();
        timer.init(1).unwrap();
        timer.regs().elapse(50_000);

        timer.start_busy_wait(2).unwrap();
        assert_eq!(timer.reload(), 31_999);
        assert_eq!(timer.state(), TimerState::Stopped);
    }

    #[test]
    fn handler_calls_callback_once() {
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        fn on_tick() {
            COUNT.fetch_add(1, Ordering::Relaxed);
        }

        let timer = timer();
        timer.set_callback(on_tick);
        timer.handler();
        assert_eq!(COUNT.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn handler_without_callback() {
        let timer = timer();
        timer.init(10).unwrap();
        let snapshot = timer.regs().snapshot();
        timer.handler();
        assert_eq!(timer.regs().snapshot(), snapshot);
        assert!(timer.callback().is_none());
    }

    #[test]
    fn set_callback_replaces() {
        static FIRST: AtomicUsize = AtomicUsize::new(0);
        static SECOND: AtomicUsize = AtomicUsize::new(0);
        fn first() {
            FIRST.fetch_add(1, Ordering::Relaxed);
        }
        fn second() {
            SECOND.fetch_add(1, Ordering::Relaxed);
        }

        let timer = timer();
        timer.set_callback(first);
        timer.handler();
        timer.set_callback(second);
        timer.handler();
        timer.handler();
        timer.clear_callback();
        timer.handler();

        assert_eq!(FIRST.load(Ordering::Relaxed), 1);
        assert_eq!(SECOND.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn periodic_interrupts() {
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        fn on_tick() {
            COUNT.fetch_add(1, Ordering::Relaxed);
        }

        let timer = timer();
        timer.set_callback(on_tick);
        timer.init(1).unwrap();

        for _ in 0..5 {
            timer.regs().elapse(16_000);
            if timer.regs().take_pending_systick() {
                timer.handler();
            }
        }
        assert_eq!(COUNT.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn stop_and_start() {
        let timer = timer();
        timer.init(1).unwrap();

        timer.stop();
        assert_eq!(timer.regs().peek(Reg::StCtrl), 0x06);
        assert_eq!(timer.regs().elapse(100_000), 0);
        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.mode(), TimerMode::Interrupt);

        timer.start();
        assert_eq!(timer.regs().peek(Reg::StCtrl), 0x07);
        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.reload(), 15_999);
    }

    #[test]
    fn deinit_keeps_callback() {
        static COUNT: AtomicUsize = AtomicUsize::new(0);
        fn on_tick() {
            COUNT.fetch_add(1, Ordering::Relaxed);
        }

        let timer = timer();
        timer.set_callback(on_tick);
        timer.init(1).unwrap();
        timer.deinit();

        assert_eq!(timer.regs().peek(Reg::StCtrl), 0);
        assert_eq!(timer.state(), TimerState::Uninitialized);
        assert_eq!(timer.regs().elapse(100_000), 0);

        timer.init(1).unwrap();
        timer.regs().elapse(16_000);
        assert!(timer.regs().take_pending_systick());
        timer.handler();
        assert_eq!(COUNT.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn uninitialized_by_default() {
        let timer = timer();
        assert_eq!(timer.state(), TimerState::Uninitialized);
        assert_eq!(timer.frequency(), DEFAULT_FREQUENCY);
    }
}
