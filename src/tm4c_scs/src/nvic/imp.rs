//! The implementation of the interrupt controller driver.
use tock_registers::{
    fields::Field,
    interfaces::{ReadWriteable, Readable, Writeable},
};

use crate::{
    regs::{RegisterFile, RegisterFileExt, INTCTRL, PRI, SYSHNDCTRL, SYSPRI1, SYSPRI2, SYSPRI3},
    ConfigError, InterruptLine, Priority, SysTickOptions, SystemException,
};

/// The priority field of each of the four lines sharing a `PRI` register.
const PRI_FIELDS: [Field<u32, PRI::Register>; 4] = [PRI::INTA, PRI::INTB, PRI::INTC, PRI::INTD];

/// The driver for the NVIC interrupt lines and the configurable system
/// exceptions.
///
/// All methods take `&self`. Read-modify-write sequences on the priority and
/// `SYSHNDCTRL` registers are not atomic with respect to other writers, so
/// configuration is expected to happen from a single foreground context
/// before the affected interrupts are enabled.
#[derive(Debug)]
pub struct InterruptController<R> {
    regs: R,
}

impl<R> InterruptController<R> {
    /// Construct an `InterruptController` operating on `regs`.
    pub const fn new(regs: R) -> Self {
        Self { regs }
    }

    /// Get a reference to the underlying register file.
    pub fn regs(&self) -> &R {
        &self.regs
    }
}

impl<R: RegisterFile> InterruptController<R> {
    /// Enable the interrupt line `line`. Other lines are not affected.
    pub fn enable_line(&self, line: InterruptLine) {
        log::trace!("enable_line({:?})", line);
        self.regs
            .en(line.enable_reg_index())
            .set(line.enable_bit());
    }

    /// Disable the interrupt line `line`. Other lines are not affected.
    ///
    /// The line is guaranteed to be masked when this method returns.
    pub fn disable_line(&self, line: InterruptLine) {
        log::trace!("disable_line({:?})", line);
        self.regs
            .dis(line.enable_reg_index())
            .set(line.enable_bit());
        self.regs.barrier();
    }

    /// Get a flag indicating whether the interrupt line `line` is enabled.
    pub fn is_line_enabled(&self, line: InterruptLine) -> bool {
        self.regs.en(line.enable_reg_index()).get() & line.enable_bit() != 0
    }

    /// Set the priority of the interrupt line `line`.
    pub fn set_line_priority(&self, line: InterruptLine, priority: Priority) {
        log::trace!("set_line_priority({:?}, {:?})", line, priority);
        let field = PRI_FIELDS[line.get() as usize % 4];
        self.regs
            .pri(line.priority_reg_index())
            .modify(field.val(priority.get() as u32));
    }

    /// Get the priority of the interrupt line `line`.
    pub fn line_priority(&self, line: InterruptLine) -> Priority {
        let field = PRI_FIELDS[line.get() as usize % 4];
        Priority::from_bits(self.regs.pri(line.priority_reg_index()).read(field))
    }

    /// Enable the system exception `kind`.
    ///
    /// Only MemFault, BusFault, and UsageFault have an enable bit. For other
    /// exceptions, this method returns [`ConfigError::NotMaskable`] without
    /// touching any register.
    pub fn enable_exception(&self, kind: SystemException) -> Result<(), ConfigError> {
        self.set_exception_enabled(kind, true)
    }

    /// Disable the system exception `kind`.
    ///
    /// Only MemFault, BusFault, and UsageFault have an enable bit. For other
    /// exceptions, this method returns [`ConfigError::NotMaskable`] without
    /// touching any register.
    pub fn disable_exception(&self, kind: SystemException) -> Result<(), ConfigError> {
        self.set_exception_enabled(kind, false)
    }

    fn set_exception_enabled(&self, kind: SystemException, enable: bool) -> Result<(), ConfigError> {
        let field = match kind {
            SystemException::MemFault => SYSHNDCTRL::MEM,
            SystemException::BusFault => SYSHNDCTRL::BUS,
            SystemException::UsageFault => SYSHNDCTRL::USAGE,
            _ => {
                log::warn!("{:?} can't be enabled or disabled", kind);
                return Err(ConfigError::NotMaskable);
            }
        };

        log::trace!("set_exception_enabled({:?}, {})", kind, enable);
        self.regs.sys_hnd_ctrl().modify(field.val(enable as u32));
        Ok(())
    }

    /// Get a flag indicating whether the system exception `kind` is enabled.
    ///
    /// Returns [`ConfigError::NotMaskable`] for exceptions that don't have an
    /// enable bit.
    pub fn is_exception_enabled(&self, kind: SystemException) -> Result<bool, ConfigError> {
        let field = match kind {
            SystemException::MemFault => SYSHNDCTRL::MEM,
            SystemException::BusFault => SYSHNDCTRL::BUS,
            SystemException::UsageFault => SYSHNDCTRL::USAGE,
            _ => return Err(ConfigError::NotMaskable),
        };
        Ok(self.regs.sys_hnd_ctrl().is_set(field))
    }

    /// Set the priority of the system exception `kind`. The other fields of
    /// the system handler priority register are preserved.
    ///
    /// Returns [`ConfigError::FixedPriority`] for Reset, NMI, and HardFault.
    pub fn set_exception_priority(
        &self,
        kind: SystemException,
        priority: Priority,
    ) -> Result<(), ConfigError> {
        let value = priority.get() as u32;
        match kind {
            SystemException::MemFault => self.regs.sys_pri1().modify(SYSPRI1::MEM.val(value)),
            SystemException::BusFault => self.regs.sys_pri1().modify(SYSPRI1::BUS.val(value)),
            SystemException::UsageFault => self.regs.sys_pri1().modify(SYSPRI1::USAGE.val(value)),
            SystemException::SvCall => self.regs.sys_pri2().modify(SYSPRI2::SVC.val(value)),
            SystemException::DebugMonitor => {
                self.regs.sys_pri3().modify(SYSPRI3::DEBUG.val(value))
            }
            SystemException::PendSv => self.regs.sys_pri3().modify(SYSPRI3::PENDSV.val(value)),
            SystemException::SysTick => self.regs.sys_pri3().modify(SYSPRI3::TICK.val(value)),
            SystemException::Reset | SystemException::Nmi | SystemException::HardFault => {
                log::warn!("{:?} has a fixed priority", kind);
                return Err(ConfigError::FixedPriority);
            }
        }
        log::trace!("set_exception_priority({:?}, {:?})", kind, priority);
        Ok(())
    }

    /// Get the priority of the system exception `kind`.
    ///
    /// Returns [`ConfigError::FixedPriority`] for Reset, NMI, and HardFault,
    /// whose priorities (-3, -2, and -1) are outside the configurable range.
    pub fn exception_priority(&self, kind: SystemException) -> Result<Priority, ConfigError> {
        let bits = match kind {
            SystemException::MemFault => self.regs.sys_pri1().read(SYSPRI1::MEM),
            SystemException::BusFault => self.regs.sys_pri1().read(SYSPRI1::BUS),
            SystemException::UsageFault => self.regs.sys_pri1().read(SYSPRI1::USAGE),
            SystemException::SvCall => self.regs.sys_pri2().read(SYSPRI2::SVC),
            SystemException::DebugMonitor => self.regs.sys_pri3().read(SYSPRI3::DEBUG),
            SystemException::PendSv => self.regs.sys_pri3().read(SYSPRI3::PENDSV),
            SystemException::SysTick => self.regs.sys_pri3().read(SYSPRI3::TICK),
            SystemException::Reset | SystemException::Nmi | SystemException::HardFault => {
                return Err(ConfigError::FixedPriority)
            }
        };
        Ok(Priority::from_bits(bits))
    }

    /// Set the PendSV exception pending.
    pub fn pend_pendsv(&self) {
        log::trace!("pend_pendsv");
        self.regs.int_ctrl().write(INTCTRL::PENDSV::SET);
    }

    /// Remove the pending state of the PendSV exception.
    pub fn unpend_pendsv(&self) {
        log::trace!("unpend_pendsv");
        self.regs.int_ctrl().write(INTCTRL::UNPENDSV::SET);
    }

    /// Get a flag indicating whether the PendSV exception is pending.
    pub fn is_pendsv_pending(&self) -> bool {
        self.regs.int_ctrl().is_set(INTCTRL::PENDSV)
    }

    /// Apply the SysTick exception priority specified by `Options`.
    pub fn configure_systick<Options: SysTickOptions>(&self) {
        // SysTick has a configurable priority, so this never fails
        let _ = self.set_exception_priority(SystemException::SysTick, Options::INTERRUPT_PRIORITY);
    }
}
