//! A simulated register file for running the drivers on a hosted target.
//!
//! [`SimRegisterFile`] models the parts of the hardware behaviour that the
//! drivers depend on:
//!
//!  - `EN`/`DIS` share a single enable state per bank. Writing ones to `EN`
//!    enables lines, writing ones to `DIS` disables them, and reading either
//!    returns the enable state.
//!  - `INTCTRL` is write-one-to-act. It reads back as the pending states of
//!    PendSV and SysTick.
//!  - The SysTick counter advances by [`SimRegisterFile::cycles_per_poll`]
//!    cycles every time `STCTRL` is read, and by an arbitrary amount through
//!    [`SimRegisterFile::elapse`]. `STCTRL.COUNT` is cleared by reading.
//!    Writing `STCURRENT` clears the counter and `STCTRL.COUNT`.
//!
//! The priority and system handler registers are plain storage. Unimplemented
//! bits are stored like implemented ones.
use core::cell::Cell;

use crate::regs::{
    Reg, RegisterFile, INTCTRL, NUM_ENABLE_REGS, NUM_PRIORITY_REGS, STCTRL, STRELOAD,
};

/// The default value of [`SimRegisterFile::cycles_per_poll`].
pub const DEFAULT_CYCLES_PER_POLL: u32 = 1000;

const ST_CTRL_WRITABLE: u32 = STCTRL::ENABLE::SET.value
    | STCTRL::INTEN::SET.value
    | STCTRL::CLK_SRC::SystemClock.value;

/// A simulated register file. See [the module documentation](self).
#[derive(Debug)]
pub struct SimRegisterFile {
    enable: [Cell<u32>; NUM_ENABLE_REGS],
    pri: [Cell<u32>; NUM_PRIORITY_REGS],
    sys_pri: [Cell<u32>; 3],
    sys_hnd_ctrl: Cell<u32>,
    pend_sv: Cell<bool>,
    pend_st: Cell<bool>,
    st_ctrl: Cell<u32>,
    st_reload: Cell<u32>,
    st_current: Cell<u32>,
    count_flag: Cell<bool>,
    cycles_per_poll: Cell<u32>,
    st_ctrl_reads: Cell<usize>,
    expirations: Cell<usize>,
}

/// The architecturally visible state of a [`SimRegisterFile`], used to check
/// that an operation did or didn't change anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub enable: [u32; NUM_ENABLE_REGS],
    pub pri: [u32; NUM_PRIORITY_REGS],
    pub sys_pri: [u32; 3],
    pub sys_hnd_ctrl: u32,
    pub pend_sv: bool,
    pub pend_st: bool,
    pub st_ctrl: u32,
    pub st_reload: u32,
    pub st_current: u32,
    pub count_flag: bool,
}

impl Default for SimRegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl SimRegisterFile {
    /// Construct a register file in the reset state.
    pub fn new() -> Self {
        Self {
            enable: core::array::from_fn(|_| Cell::new(0)),
            pri: core::array::from_fn(|_| Cell::new(0)),
            sys_pri: core::array::from_fn(|_| Cell::new(0)),
            sys_hnd_ctrl: Cell::new(0),
            pend_sv: Cell::new(false),
            pend_st: Cell::new(false),
            st_ctrl: Cell::new(0),
            st_reload: Cell::new(0),
            st_current: Cell::new(0),
            count_flag: Cell::new(false),
            cycles_per_poll: Cell::new(DEFAULT_CYCLES_PER_POLL),
            st_ctrl_reads: Cell::new(0),
            expirations: Cell::new(0),
        }
    }

    /// Get the number of SysTick cycles that elapse on every read of `STCTRL`.
    pub fn cycles_per_poll(&self) -> u32 {
        self.cycles_per_poll.get()
    }

    /// Set the number of SysTick cycles that elapse on every read of `STCTRL`.
    pub fn set_cycles_per_poll(&self, cycles: u32) {
        self.cycles_per_poll.set(cycles);
    }

    /// Read the raw storage of `reg` without side effects.
    pub fn peek(&self, reg: Reg) -> u32 {
        match reg {
            Reg::StCtrl => {
                let mut value = self.st_ctrl.get();
                if self.count_flag.get() {
                    value |= STCTRL::COUNT::SET.value;
                }
                value
            }
            Reg::StReload => self.st_reload.get(),
            Reg::StCurrent => self.st_current.get(),
            Reg::En(i) | Reg::Dis(i) => self.enable[i].get(),
            Reg::Pri(i) => self.pri[i].get(),
            Reg::IntCtrl => self.int_ctrl_value(),
            Reg::SysPri1 => self.sys_pri[0].get(),
            Reg::SysPri2 => self.sys_pri[1].get(),
            Reg::SysPri3 => self.sys_pri[2].get(),
            Reg::SysHndCtrl => self.sys_hnd_ctrl.get(),
        }
    }

    /// Overwrite the raw storage of `reg` without side effects. Used to seed
    /// the register file with arbitrary contents.
    pub fn poke(&self, reg: Reg, value: u32) {
        match reg {
            Reg::StCtrl => {
                self.st_ctrl.set(value & ST_CTRL_WRITABLE);
                self.count_flag.set(value & STCTRL::COUNT::SET.value != 0);
            }
            Reg::StReload => self.st_reload.set(value & STRELOAD::RELOAD.mask),
            Reg::StCurrent => self.st_current.set(value & STRELOAD::RELOAD.mask),
            Reg::En(i) | Reg::Dis(i) => self.enable[i].set(value),
            Reg::Pri(i) => self.pri[i].set(value),
            Reg::IntCtrl => {
                self.pend_sv.set(value & INTCTRL::PENDSV::SET.value != 0);
                self.pend_st.set(value & INTCTRL::PENDSTSET::SET.value != 0);
            }
            Reg::SysPri1 => self.sys_pri[0].set(value),
            Reg::SysPri2 => self.sys_pri[1].set(value),
            Reg::SysPri3 => self.sys_pri[2].set(value),
            Reg::SysHndCtrl => self.sys_hnd_ctrl.set(value),
        }
    }

    /// Capture the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            enable: self.enable.each_ref().map(Cell::get),
            pri: self.pri.each_ref().map(Cell::get),
            sys_pri: self.sys_pri.each_ref().map(Cell::get),
            sys_hnd_ctrl: self.sys_hnd_ctrl.get(),
            pend_sv: self.pend_sv.get(),
            pend_st: self.pend_st.get(),
            st_ctrl: self.st_ctrl.get(),
            st_reload: self.st_reload.get(),
            st_current: self.st_current.get(),
            count_flag: self.count_flag.get(),
        }
    }

    /// Get whether the interrupt line `num` is enabled.
    pub fn is_line_enabled(&self, num: u8) -> bool {
        let num = num as usize;
        self.enable[num / 32].get() & (1 << (num % 32)) != 0
    }

    /// Get the state of `STCTRL.COUNT` without clearing it.
    pub fn count_flag(&self) -> bool {
        self.count_flag.get()
    }

    /// Get the number of times `STCTRL` has been read through
    /// [`RegisterFile::read`].
    pub fn st_ctrl_reads(&self) -> usize {
        self.st_ctrl_reads.get()
    }

    /// Get the number of times the counter has reached zero.
    pub fn expirations(&self) -> usize {
        self.expirations.get()
    }

    /// Get and clear the pending state of the SysTick exception. The test
    /// plays the role of the NVIC by calling the handler when this returns
    /// `true`.
    pub fn take_pending_systick(&self) -> bool {
        self.pend_st.replace(false)
    }

    /// Advance the SysTick counter by `cycles` clock cycles. Returns the number
    /// of times the counter reached zero.
    ///
    /// A disabled counter doesn't move. Like the real hardware, a counter at
    /// zero spends one cycle loading `STRELOAD`, and a reload value of zero
    /// stops the counter after that.
    pub fn elapse(&self, mut cycles: u32) -> usize {
        let ctrl = self.st_ctrl.get();
        if ctrl & STCTRL::ENABLE::SET.value == 0 {
            return 0;
        }

        let reload = self.st_reload.get();
        let mut wraps = 0;
        while cycles > 0 {
            let current = self.st_current.get();
            if current == 0 {
                self.st_current.set(reload);
                cycles -= 1;
                if reload == 0 {
                    break;
                }
                continue;
            }

            if cycles < current {
                self.st_current.set(current - cycles);
                break;
            }

            cycles -= current;
            self.st_current.set(0);
            self.count_flag.set(true);
            if ctrl & STCTRL::INTEN::SET.value != 0 {
                self.pend_st.set(true);
            }
            wraps += 1;
        }

        self.expirations.set(self.expirations.get() + wraps);
        wraps
    }

    fn int_ctrl_value(&self) -> u32 {
        let mut value = 0;
        if self.pend_sv.get() {
            value |= INTCTRL::PENDSV::SET.value;
        }
        if self.pend_st.get() {
            value |= INTCTRL::PENDSTSET::SET.value;
        }
        value
    }
}

impl RegisterFile for SimRegisterFile {
    fn read(&self, reg: Reg) -> u32 {
        match reg {
            Reg::StCtrl => {
                self.st_ctrl_reads.set(self.st_ctrl_reads.get() + 1);
                self.elapse(self.cycles_per_poll.get());

                let mut value = self.st_ctrl.get();
                if self.count_flag.replace(false) {
                    value |= STCTRL::COUNT::SET.value;
                }
                value
            }
            _ => self.peek(reg),
        }
    }

    fn write(&self, reg: Reg, value: u32) {
        match reg {
            Reg::StCtrl => self.st_ctrl.set(value & ST_CTRL_WRITABLE),
            Reg::StCurrent => {
                self.st_current.set(0);
                self.count_flag.set(false);
            }
            Reg::En(i) => self.enable[i].set(self.enable[i].get() | value),
            Reg::Dis(i) => self.enable[i].set(self.enable[i].get() & !value),
            Reg::IntCtrl => {
                if value & INTCTRL::PENDSV::SET.value != 0 {
                    self.pend_sv.set(true);
                }
                if value & INTCTRL::UNPENDSV::SET.value != 0 {
                    self.pend_sv.set(false);
                }
                if value & INTCTRL::PENDSTSET::SET.value != 0 {
                    self.pend_st.set(true);
                }
                if value & INTCTRL::PENDSTCLR::SET.value != 0 {
                    self.pend_st.set(false);
                }
            }
            _ => self.poke(reg, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_and_disable_share_state() {
        let sim = SimRegisterFile::new();
        sim.write(Reg::En(1), 0b1010);
        sim.write(Reg::En(1), 0b0001);
        assert_eq!(sim.read(Reg::En(1)), 0b1011);
        assert_eq!(sim.read(Reg::Dis(1)), 0b1011);

        sim.write(Reg::Dis(1), 0b0010);
        assert_eq!(sim.read(Reg::En(1)), 0b1001);
        assert!(sim.is_line_enabled(32));
        assert!(!sim.is_line_enabled(33));
        assert!(sim.is_line_enabled(35));
    }

    #[test]
    fn count_flag_clears_on_read() {
        let sim = SimRegisterFile::new();
        sim.set_cycles_per_poll(0);
        sim.write(Reg::StReload, 9);
        sim.write(Reg::StCtrl, STCTRL::ENABLE::SET.value);

        // One cycle to load the reload value, then 9 to reach zero
        assert_eq!(sim.elapse(10), 1);
        assert!(sim.count_flag());

        assert_ne!(sim.read(Reg::StCtrl) & STCTRL::COUNT::SET.value, 0);
        assert_eq!(sim.read(Reg::StCtrl) & STCTRL::COUNT::SET.value, 0);
        assert_eq!(sim.st_ctrl_reads(), 2);
    }

    #[test]
    fn period_is_reload_plus_one() {
        let sim = SimRegisterFile::new();
        sim.write(Reg::StReload, 99);
        sim.write(Reg::StCtrl, STCTRL::ENABLE::SET.value);

        assert_eq!(sim.elapse(100), 1);
        assert_eq!(sim.elapse(99), 0);
        assert_eq!(sim.elapse(1), 1);
        assert_eq!(sim.elapse(1000), 10);
        assert_eq!(sim.expirations(), 12);
    }

    #[test]
    fn disabled_counter_does_not_move() {
        let sim = SimRegisterFile::new();
        sim.write(Reg::StReload, 99);
        assert_eq!(sim.elapse(1000), 0);
        assert_eq!(sim.peek(Reg::StCurrent), 0);
    }

    #[test]
    fn zero_reload_stops_the_counter() {
        let sim = SimRegisterFile::new();
        sim.write(Reg::StCtrl, STCTRL::ENABLE::SET.value);
        assert_eq!(sim.elapse(u32::MAX), 0);
    }

    #[test]
    fn expiry_pends_systick_only_with_inten() {
        let sim = SimRegisterFile::new();
        sim.write(Reg::StReload, 9);
        sim.write(Reg::StCtrl, STCTRL::ENABLE::SET.value);
        sim.elapse(10);
        assert!(!sim.take_pending_systick());

        sim.write(Reg::StCtrl, (STCTRL::ENABLE::SET + STCTRL::INTEN::SET).value);
        sim.elapse(10);
        assert!(sim.take_pending_systick());
        assert!(!sim.take_pending_systick());
    }

    #[test]
    fn writing_current_clears_counter_and_flag() {
        let sim = SimRegisterFile::new();
        sim.write(Reg::StReload, 9);
        sim.write(Reg::StCtrl, STCTRL::ENABLE::SET.value);
        sim.elapse(15);
        assert_ne!(sim.peek(Reg::StCurrent), 0);
        assert!(sim.count_flag());

        sim.write(Reg::StCurrent, 1234);
        assert_eq!(sim.peek(Reg::StCurrent), 0);
        assert!(!sim.count_flag());
    }

    #[test]
    fn int_ctrl_is_write_one_to_act() {
        let sim = SimRegisterFile::new();
        sim.write(Reg::IntCtrl, INTCTRL::PENDSV::SET.value);
        assert_eq!(sim.read(Reg::IntCtrl), INTCTRL::PENDSV::SET.value);

        // Writing zeros has no effect
        sim.write(Reg::IntCtrl, 0);
        assert_eq!(sim.read(Reg::IntCtrl), INTCTRL::PENDSV::SET.value);

        sim.write(Reg::IntCtrl, INTCTRL::UNPENDSV::SET.value);
        assert_eq!(sim.read(Reg::IntCtrl), 0);
    }
}
