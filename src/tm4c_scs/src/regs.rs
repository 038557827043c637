//! The register file of the System Control Space (SysTick, NVIC, and the
//! system handler registers of the SCB) on the TM4C123GH6PM.
//!
//! Drivers don't touch memory directly. They go through a [`RegisterFile`],
//! which moves raw 32-bit values in and out of a register identified by
//! [`Reg`]. [`Mmio`] is the real thing; `sim::SimRegisterFile` stands in for
//! the hardware in tests. [`RegisterFileExt`] wraps each register in an
//! [`Accessor`] implementing the `tock-registers` interfaces so that the
//! drivers can work with typed bit fields on either of them.
#![allow(non_snake_case)]
use core::marker::PhantomData;
use tock_registers::{
    interfaces::{Readable, Writeable},
    registers::ReadWrite,
    RegisterLongName,
};

/// The number of interrupt set-enable (`EN0`–`EN4`) and clear-enable
/// (`DIS0`–`DIS4`) registers.
pub const NUM_ENABLE_REGS: usize = 5;

/// The number of interrupt priority registers (`PRI0`–`PRI34`).
pub const NUM_PRIORITY_REGS: usize = 35;

/// The base address of the SysTick registers (`STCTRL`).
pub const SYSTICK_BASE: usize = 0xe000_e010;

/// The base address of the NVIC registers (`EN0`).
pub const NVIC_BASE: usize = 0xe000_e100;

/// The base address of the system handler registers (`INTCTRL`).
pub const SCB_BASE: usize = 0xe000_ed04;

/// Identifies a register in the register file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg {
    /// SysTick Control and Status Register
    StCtrl,
    /// SysTick Reload Value Register
    StReload,
    /// SysTick Current Value Register
    StCurrent,
    /// Interrupt Set Enable Registers (`EN0`–`EN4`)
    En(usize),
    /// Interrupt Clear Enable Registers (`DIS0`–`DIS4`)
    Dis(usize),
    /// Interrupt Priority Registers (`PRI0`–`PRI34`)
    Pri(usize),
    /// Interrupt Control and State Register
    IntCtrl,
    /// System Handler Priority 1 (MemFault, BusFault, UsageFault)
    SysPri1,
    /// System Handler Priority 2 (SVCall)
    SysPri2,
    /// System Handler Priority 3 (Debug Monitor, PendSV, SysTick)
    SysPri3,
    /// System Handler Control and State Register
    SysHndCtrl,
}

tock_registers::register_bitfields! {u32,
    pub STCTRL [
        /// Set when the counter has counted down to zero since the last time
        /// this register was read. Reading clears it.
        COUNT OFFSET(16) NUMBITS(1) [],
        /// Clock source
        CLK_SRC OFFSET(2) NUMBITS(1) [
            PioscDiv4 = 0,
            SystemClock = 1
        ],
        /// Raise the SysTick exception when the counter reaches zero
        INTEN OFFSET(1) NUMBITS(1) [],
        /// Enables counting
        ENABLE OFFSET(0) NUMBITS(1) []
    ],
    pub STRELOAD [
        /// The value loaded into `STCURRENT` when the counter reaches zero
        RELOAD OFFSET(0) NUMBITS(24) []
    ],
    pub STCURRENT [
        /// The current counter value. Writing any value clears it.
        CURRENT OFFSET(0) NUMBITS(24) []
    ],
    pub PRI [
        /// Priority of the line `4n`
        INTA OFFSET(5) NUMBITS(3) [],
        /// Priority of the line `4n + 1`
        INTB OFFSET(13) NUMBITS(3) [],
        /// Priority of the line `4n + 2`
        INTC OFFSET(21) NUMBITS(3) [],
        /// Priority of the line `4n + 3`
        INTD OFFSET(29) NUMBITS(3) []
    ],
    pub INTCTRL [
        /// Writing 1 pends NMI
        NMISET OFFSET(31) NUMBITS(1) [],
        /// Writing 1 pends PendSV. Reads as the pending state of PendSV.
        PENDSV OFFSET(28) NUMBITS(1) [],
        /// Writing 1 removes the pending state of PendSV
        UNPENDSV OFFSET(27) NUMBITS(1) [],
        /// Writing 1 pends SysTick. Reads as the pending state of SysTick.
        PENDSTSET OFFSET(26) NUMBITS(1) [],
        /// Writing 1 removes the pending state of SysTick
        PENDSTCLR OFFSET(25) NUMBITS(1) []
    ],
    pub SYSPRI1 [
        /// Usage Fault priority
        USAGE OFFSET(21) NUMBITS(3) [],
        /// Bus Fault priority
        BUS OFFSET(13) NUMBITS(3) [],
        /// Memory Management Fault priority
        MEM OFFSET(5) NUMBITS(3) []
    ],
    pub SYSPRI2 [
        /// SVCall priority
        SVC OFFSET(29) NUMBITS(3) []
    ],
    pub SYSPRI3 [
        /// SysTick exception priority
        TICK OFFSET(29) NUMBITS(3) [],
        /// PendSV priority
        PENDSV OFFSET(21) NUMBITS(3) [],
        /// Debug Monitor priority
        DEBUG OFFSET(5) NUMBITS(3) []
    ],
    pub SYSHNDCTRL [
        /// Usage Fault enable
        USAGE OFFSET(18) NUMBITS(1) [],
        /// Bus Fault enable
        BUS OFFSET(17) NUMBITS(1) [],
        /// Memory Management Fault enable
        MEM OFFSET(16) NUMBITS(1) []
    ]
}

/// Raw access to the register file.
///
/// Implementations provide the hardware semantics of each register (e.g.,
/// `EN`/`DIS` are write-one-to-set/clear, reading `STCTRL` clears
/// [`STCTRL::COUNT`]). Callers must not assume that a write can be read back
/// verbatim.
pub trait RegisterFile {
    /// Read the register `reg`.
    fn read(&self, reg: Reg) -> u32;

    /// Write `value` to the register `reg`.
    fn write(&self, reg: Reg, value: u32);

    /// Wait until the effects of the preceding register writes are visible
    /// to the processor. Defaults to a no-op.
    #[inline]
    fn barrier(&self) {}
}

impl<T: RegisterFile + ?Sized> RegisterFile for &T {
    #[inline]
    fn read(&self, reg: Reg) -> u32 {
        (**self).read(reg)
    }

    #[inline]
    fn write(&self, reg: Reg, value: u32) {
        (**self).write(reg, value)
    }

    #[inline]
    fn barrier(&self) {
        (**self).barrier()
    }
}

/// A view of a single register of a [`RegisterFile`], typed with the register's
/// bit field definition `L`.
pub struct Accessor<'a, F: ?Sized, L: RegisterLongName = ()> {
    file: &'a F,
    reg: Reg,
    _phantom: PhantomData<L>,
}

impl<'a, F: RegisterFile + ?Sized, L: RegisterLongName> Accessor<'a, F, L> {
    #[inline]
    pub fn new(file: &'a F, reg: Reg) -> Self {
        Self {
            file,
            reg,
            _phantom: PhantomData,
        }
    }

    /// Get the register this accessor refers to.
    #[inline]
    pub fn reg(&self) -> Reg {
        self.reg
    }
}

impl<F: RegisterFile + ?Sized, L: RegisterLongName> Readable for Accessor<'_, F, L> {
    type T = u32;
    type R = L;

    #[inline]
    fn get(&self) -> u32 {
        self.file.read(self.reg)
    }
}

impl<F: RegisterFile + ?Sized, L: RegisterLongName> Writeable for Accessor<'_, F, L> {
    type T = u32;
    type R = L;

    #[inline]
    fn set(&self, value: u32) {
        self.file.write(self.reg, value)
    }
}

/// Typed accessors for every register of a [`RegisterFile`].
pub trait RegisterFileExt: RegisterFile {
    #[inline]
    fn st_ctrl(&self) -> Accessor<'_, Self, STCTRL::Register> {
        Accessor::new(self, Reg::StCtrl)
    }

    #[inline]
    fn st_reload(&self) -> Accessor<'_, Self, STRELOAD::Register> {
        Accessor::new(self, Reg::StReload)
    }

    #[inline]
    fn st_current(&self) -> Accessor<'_, Self, STCURRENT::Register> {
        Accessor::new(self, Reg::StCurrent)
    }

    #[inline]
    fn en(&self, i: usize) -> Accessor<'_, Self> {
        debug_assert!(i < NUM_ENABLE_REGS);
        Accessor::new(self, Reg::En(i))
    }

    #[inline]
    fn dis(&self, i: usize) -> Accessor<'_, Self> {
        debug_assert!(i < NUM_ENABLE_REGS);
        Accessor::new(self, Reg::Dis(i))
    }

    #[inline]
    fn pri(&self, i: usize) -> Accessor<'_, Self, PRI::Register> {
        debug_assert!(i < NUM_PRIORITY_REGS);
        Accessor::new(self, Reg::Pri(i))
    }

    #[inline]
    fn int_ctrl(&self) -> Accessor<'_, Self, INTCTRL::Register> {
        Accessor::new(self, Reg::IntCtrl)
    }

    #[inline]
    fn sys_pri1(&self) -> Accessor<'_, Self, SYSPRI1::Register> {
        Accessor::new(self, Reg::SysPri1)
    }

    #[inline]
    fn sys_pri2(&self) -> Accessor<'_, Self, SYSPRI2::Register> {
        Accessor::new(self, Reg::SysPri2)
    }

    #[inline]
    fn sys_pri3(&self) -> Accessor<'_, Self, SYSPRI3::Register> {
        Accessor::new(self, Reg::SysPri3)
    }

    #[inline]
    fn sys_hnd_ctrl(&self) -> Accessor<'_, Self, SYSHNDCTRL::Register> {
        Accessor::new(self, Reg::SysHndCtrl)
    }
}
impl<T: RegisterFile + ?Sized> RegisterFileExt for T {}

/// SysTick registers, located at [`SYSTICK_BASE`].
#[repr(C)]
pub struct SysTickRegs {
    pub STCTRL: ReadWrite<u32, STCTRL::Register>,
    pub STRELOAD: ReadWrite<u32, STRELOAD::Register>,
    pub STCURRENT: ReadWrite<u32, STCURRENT::Register>,
}

/// NVIC registers, located at [`NVIC_BASE`].
#[repr(C)]
pub struct NvicRegs {
    /// Interrupt Set Enable Registers
    pub EN: [ReadWrite<u32>; NUM_ENABLE_REGS],
    _reserved1: [u32; 32 - NUM_ENABLE_REGS],
    /// Interrupt Clear Enable Registers
    pub DIS: [ReadWrite<u32>; NUM_ENABLE_REGS],
    // `PEND`, `UNPEND`, and `ACTIVE` live here. We don't use them.
    _reserved2: [u32; 160 - NUM_ENABLE_REGS],
    /// Interrupt Priority Registers
    pub PRI: [ReadWrite<u32, PRI::Register>; NUM_PRIORITY_REGS],
}

/// System handler registers of the SCB, located at [`SCB_BASE`].
#[repr(C)]
pub struct ScbRegs {
    /// Interrupt Control and State Register
    pub INTCTRL: ReadWrite<u32, INTCTRL::Register>,
    // `VTABLE`, `APINT`, `SYSCTRL`, `CFGCTRL`
    _reserved1: [u32; 4],
    /// System Handler Priority 1
    pub SYSPRI1: ReadWrite<u32, SYSPRI1::Register>,
    /// System Handler Priority 2
    pub SYSPRI2: ReadWrite<u32, SYSPRI2::Register>,
    /// System Handler Priority 3
    pub SYSPRI3: ReadWrite<u32, SYSPRI3::Register>,
    /// System Handler Control and State
    pub SYSHNDCTRL: ReadWrite<u32, SYSHNDCTRL::Register>,
}

/// The memory-mapped register file of the target.
#[derive(Debug, Clone, Copy)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Get a handle to the memory-mapped register file.
    ///
    /// # Safety
    ///
    /// The target must really be a TM4C123 (or another Cortex-M4 with the same
    /// System Control Space layout). The caller is responsible for
    /// coordinating with other code that accesses the same registers.
    #[inline]
    pub const unsafe fn steal() -> Self {
        Self { _private: () }
    }

    #[inline(always)]
    fn systick(&self) -> &'static SysTickRegs {
        // Safety: Verified by the caller of `steal`
        unsafe { &*(SYSTICK_BASE as *const SysTickRegs) }
    }

    #[inline(always)]
    fn nvic(&self) -> &'static NvicRegs {
        // Safety: Verified by the caller of `steal`
        unsafe { &*(NVIC_BASE as *const NvicRegs) }
    }

    #[inline(always)]
    fn scb(&self) -> &'static ScbRegs {
        // Safety: Verified by the caller of `steal`
        unsafe { &*(SCB_BASE as *const ScbRegs) }
    }
}

impl RegisterFile for Mmio {
    #[inline]
    fn read(&self, reg: Reg) -> u32 {
        match reg {
            Reg::StCtrl => self.systick().STCTRL.get(),
            Reg::StReload => self.systick().STRELOAD.get(),
            Reg::StCurrent => self.systick().STCURRENT.get(),
            Reg::En(i) => self.nvic().EN[i].get(),
            Reg::Dis(i) => self.nvic().DIS[i].get(),
            Reg::Pri(i) => self.nvic().PRI[i].get(),
            Reg::IntCtrl => self.scb().INTCTRL.get(),
            Reg::SysPri1 => self.scb().SYSPRI1.get(),
            Reg::SysPri2 => self.scb().SYSPRI2.get(),
            Reg::SysPri3 => self.scb().SYSPRI3.get(),
            Reg::SysHndCtrl => self.scb().SYSHNDCTRL.get(),
        }
    }

    #[inline]
    fn write(&self, reg: Reg, value: u32) {
        match reg {
            Reg::StCtrl => self.systick().STCTRL.set(value),
            Reg::StReload => self.systick().STRELOAD.set(value),
            Reg::StCurrent => self.systick().STCURRENT.set(value),
            Reg::En(i) => self.nvic().EN[i].set(value),
            Reg::Dis(i) => self.nvic().DIS[i].set(value),
            Reg::Pri(i) => self.nvic().PRI[i].set(value),
            Reg::IntCtrl => self.scb().INTCTRL.set(value),
            Reg::SysPri1 => self.scb().SYSPRI1.set(value),
            Reg::SysPri2 => self.scb().SYSPRI2.set(value),
            Reg::SysPri3 => self.scb().SYSPRI3.set(value),
            Reg::SysHndCtrl => self.scb().SYSHNDCTRL.set(value),
        }
    }

    #[inline]
    fn barrier(&self) {
        #[cfg(target_os = "none")]
        {
            cortex_m::asm::dsb();
            cortex_m::asm::isb();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimRegisterFile;
    use memoffset::offset_of;
    use tock_registers::interfaces::ReadWriteable;

    /// The register blocks must match the addresses in the data sheet.
    #[test]
    fn layout() {
        assert_eq!(SYSTICK_BASE + offset_of!(SysTickRegs, STRELOAD), 0xe000_e014);
        assert_eq!(SYSTICK_BASE + offset_of!(SysTickRegs, STCURRENT), 0xe000_e018);

        assert_eq!(NVIC_BASE + offset_of!(NvicRegs, EN), 0xe000_e100);
        assert_eq!(NVIC_BASE + offset_of!(NvicRegs, DIS), 0xe000_e180);
        assert_eq!(NVIC_BASE + offset_of!(NvicRegs, PRI), 0xe000_e400);
        assert_eq!(
            NVIC_BASE + core::mem::size_of::<NvicRegs>(),
            0xe000_e400 + 4 * NUM_PRIORITY_REGS
        );

        assert_eq!(SCB_BASE + offset_of!(ScbRegs, SYSPRI1), 0xe000_ed18);
        assert_eq!(SCB_BASE + offset_of!(ScbRegs, SYSPRI2), 0xe000_ed1c);
        assert_eq!(SCB_BASE + offset_of!(ScbRegs, SYSPRI3), 0xe000_ed20);
        assert_eq!(SCB_BASE + offset_of!(ScbRegs, SYSHNDCTRL), 0xe000_ed24);
    }

    #[test]
    fn field_masks() {
        assert_eq!(SYSPRI1::MEM.mask << SYSPRI1::MEM.shift, 0x0000_00e0);
        assert_eq!(SYSPRI1::BUS.mask << SYSPRI1::BUS.shift, 0x0000_e000);
        assert_eq!(SYSPRI1::USAGE.mask << SYSPRI1::USAGE.shift, 0x00e0_0000);
        assert_eq!(SYSPRI2::SVC.mask << SYSPRI2::SVC.shift, 0xe000_0000);
        assert_eq!(SYSPRI3::DEBUG.mask << SYSPRI3::DEBUG.shift, 0x0000_00e0);
        assert_eq!(SYSPRI3::PENDSV.mask << SYSPRI3::PENDSV.shift, 0x00e0_0000);
        assert_eq!(SYSPRI3::TICK.mask << SYSPRI3::TICK.shift, 0xe000_0000);

        assert_eq!(SYSHNDCTRL::MEM::SET.value, 0x0001_0000);
        assert_eq!(SYSHNDCTRL::BUS::SET.value, 0x0002_0000);
        assert_eq!(SYSHNDCTRL::USAGE::SET.value, 0x0004_0000);

        assert_eq!(INTCTRL::PENDSV::SET.value, 0x1000_0000);
        assert_eq!(INTCTRL::UNPENDSV::SET.value, 0x0800_0000);

        assert_eq!(
            (STCTRL::CLK_SRC::SystemClock + STCTRL::INTEN::SET + STCTRL::ENABLE::SET).value,
            0x07
        );
        assert_eq!(STCTRL::COUNT::SET.value, 1 << 16);
    }

    #[test]
    fn accessor_modify_preserves_other_fields() {
        let sim = SimRegisterFile::new();
        sim.poke(Reg::SysPri3, 0x1234_5678);

        sim.sys_pri3().modify(SYSPRI3::PENDSV.val(0b101));

        assert_eq!(sim.peek(Reg::SysPri3), (0x1234_5678 & !0x00e0_0000) | (0b101 << 21));
        assert_eq!(sim.sys_pri3().read(SYSPRI3::PENDSV), 0b101);
    }

    #[test]
    fn shared_reference_is_a_register_file() {
        let sim = SimRegisterFile::new();
        let file = &sim;
        file.sys_pri2().write(SYSPRI2::SVC.val(3));
        assert_eq!(sim.peek(Reg::SysPri2), 3 << 29);
    }
}
