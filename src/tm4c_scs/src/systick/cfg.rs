use crate::{ConfigError, Priority};

/// The reset-default system clock frequency (the 16-MHz precision internal
/// oscillator).
pub const DEFAULT_FREQUENCY: u32 = 16_000_000;

/// The largest value `STRELOAD` can hold.
pub const MAX_RELOAD: u32 = 0xff_ffff;

/// The configuration of a [`SystemTimer`] instantiated by [`use_systick!`].
///
/// [`SystemTimer`]: crate::SystemTimer
/// [`use_systick!`]: crate::use_systick
pub trait SysTickOptions {
    /// The frequency of the system clock driving SysTick, measured in hertz.
    /// Defaults to [`DEFAULT_FREQUENCY`].
    const FREQUENCY: u32 = DEFAULT_FREQUENCY;

    /// The priority of the SysTick exception. Defaults to
    /// [`Priority::LOWEST`].
    ///
    /// This is applied by [`InterruptController::configure_systick`].
    ///
    /// [`InterruptController::configure_systick`]: crate::InterruptController::configure_systick
    const INTERRUPT_PRIORITY: Priority = Priority::LOWEST;
}

/// The operating mode of a running timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerMode {
    /// The SysTick exception is raised every period.
    Interrupt,
    /// The counter runs with its interrupt disabled. Used by
    /// [`SystemTimer::start_busy_wait`].
    ///
    /// [`SystemTimer::start_busy_wait`]: crate::SystemTimer::start_busy_wait
    BusyWait,
}

/// The state of the timer as derived from `STCTRL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerState {
    /// `STCTRL` is zero (the reset state, or after `deinit`).
    Uninitialized,
    /// The counter is enabled.
    Running,
    /// The counter is configured but disabled.
    Stopped,
}

/// Calculate the reload value for a period of `period_ms` milliseconds on a
/// timer clocked at `frequency` hertz.
///
/// Returns [`ConfigError::BadPeriod`] if the period is zero or the reload value
/// doesn't fit in the 24-bit counter.
///
/// ```
/// use tm4c_scs::{reload_for, ConfigError, DEFAULT_FREQUENCY};
/// assert_eq!(reload_for(DEFAULT_FREQUENCY, 10), Ok(159_999));
/// assert_eq!(reload_for(DEFAULT_FREQUENCY, 2000), Err(ConfigError::BadPeriod));
/// ```
pub const fn reload_for(frequency: u32, period_ms: u32) -> Result<u32, ConfigError> {
    let cycles = match (frequency / 1000).checked_mul(period_ms) {
        Some(x) => x,
        None => return Err(ConfigError::BadPeriod),
    };

    // A reload value of zero would stop the counter
    if cycles < 2 || cycles - 1 > MAX_RELOAD {
        return Err(ConfigError::BadPeriod);
    }

    Ok(cycles - 1)
}

/// Define a [`SystemTimer`] static backed by the memory-mapped register file
/// and bind it to the SysTick exception handler.
///
/// [`SystemTimer`]: crate::SystemTimer
///
/// ```rust,ignore
/// tm4c_scs::use_systick!(unsafe static TIMER for Options);
///
/// struct Options;
/// impl tm4c_scs::SysTickOptions for Options {
///     // PLL output divided by 5
///     const FREQUENCY: u32 = 80_000_000;
/// }
///
/// fn main() {
///     TIMER.set_callback(on_tick);
///     TIMER.init(10).unwrap();
/// }
/// ```
///
/// # Safety
///
///  - The target must really be a TM4C123 or a compatible Cortex-M4.
///  - `::cortex_m_rt` should point to the `cortex-m-rt` crate, and nothing else
///    may define the `SysTick` exception handler.
///
#[cfg(target_os = "none")]
#[macro_export]
macro_rules! use_systick {
    (unsafe $vis:vis static $name:ident for $Options:ty) => {
        $vis static $name: $crate::SystemTimer<$crate::regs::Mmio> =
            $crate::SystemTimer::new(
                // Safety: Upheld by the caller of `use_systick!`
                unsafe { $crate::regs::Mmio::steal() },
                <$Options as $crate::SysTickOptions>::FREQUENCY,
            );

        const _: () = {
            #[$crate::cortex_m_rt::exception]
            fn SysTick() {
                $name.handler();
            }
        };
    };
}
