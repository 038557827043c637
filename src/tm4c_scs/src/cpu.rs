//! Global interrupt and fault masking (`PRIMASK` and `FAULTMASK`).
use core::arch::asm;

/// Clear `PRIMASK`, allowing interrupts and configurable exceptions to be
/// taken.
///
/// # Safety
///
/// This can break critical sections that rely on `PRIMASK` being set.
#[inline(always)]
pub unsafe fn enable_interrupts() {
    // Safety: Upheld by the caller
    unsafe { cortex_m::interrupt::enable() };
}

/// Set `PRIMASK`, masking all exceptions with a configurable priority.
#[inline(always)]
pub fn disable_interrupts() {
    cortex_m::interrupt::disable();
}

/// Clear `FAULTMASK`.
///
/// # Safety
///
/// This can break critical sections that rely on `FAULTMASK` being set.
#[inline(always)]
pub unsafe fn enable_faults() {
    // Safety: Upheld by the caller
    unsafe { asm!("cpsie f", options(nostack, preserves_flags)) };
}

/// Set `FAULTMASK`, masking all exceptions except NMI. Only works in
/// privileged mode.
#[inline(always)]
pub fn disable_faults() {
    // Safety: Only raises the execution priority
    unsafe { asm!("cpsid f", options(nostack, preserves_flags)) };
}
