use core::{convert::TryFrom, fmt, ops::Range};

use crate::ConfigError;

/// The number of external interrupt lines implemented by the NVIC of the
/// TM4C123GH6PM.
pub const NUM_LINES: u8 = 138;

/// The range of valid interrupt line numbers.
pub const LINE_RANGE: Range<u8> = 0..NUM_LINES;

/// The largest (least urgent) priority value. The TM4C123 implements three
/// priority bits.
pub const MAX_PRIORITY: u8 = 7;

/// An external interrupt line number in range `0..138`.
///
/// This is the line number as seen by the NVIC, not the exception number.
/// Line `n` is exception `n + 16`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterruptLine(u8);

impl InterruptLine {
    /// Construct an `InterruptLine`, checking the range.
    ///
    /// ```
    /// use tm4c_scs::{ConfigError, InterruptLine};
    /// assert_eq!(InterruptLine::new(137).unwrap().get(), 137);
    /// assert_eq!(InterruptLine::new(138), Err(ConfigError::BadLine));
    /// ```
    pub const fn new(num: u8) -> Result<Self, ConfigError> {
        if num < NUM_LINES {
            Ok(Self(num))
        } else {
            Err(ConfigError::BadLine)
        }
    }

    /// Get the line number.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Get the index of the `EN`/`DIS` register containing this line's bit.
    #[inline]
    pub const fn enable_reg_index(self) -> usize {
        self.0 as usize / 32
    }

    /// Get the mask of this line's bit in the `EN`/`DIS` register.
    #[inline]
    pub const fn enable_bit(self) -> u32 {
        1 << (self.0 % 32)
    }

    /// Get the index of the `PRI` register containing this line's priority.
    #[inline]
    pub const fn priority_reg_index(self) -> usize {
        self.0 as usize / 4
    }

    /// Get the bit offset of this line's priority field in the `PRI`
    /// register. The field is 3 bits wide.
    #[inline]
    pub const fn priority_offset(self) -> usize {
        (self.0 as usize % 4) * 8 + 5
    }

    /// Iterate over all valid interrupt lines in ascending order.
    pub fn all() -> impl Iterator<Item = Self> + Clone {
        LINE_RANGE.map(Self)
    }
}

impl TryFrom<u8> for InterruptLine {
    type Error = ConfigError;

    #[inline]
    fn try_from(num: u8) -> Result<Self, Self::Error> {
        Self::new(num)
    }
}

impl From<InterruptLine> for u8 {
    #[inline]
    fn from(x: InterruptLine) -> Self {
        x.0
    }
}

impl fmt::Debug for InterruptLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InterruptLine({})", self.0)
    }
}

/// An interrupt priority in range `0..=7`. Smaller values are more urgent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Priority(u8);

impl Priority {
    /// The most urgent priority.
    pub const HIGHEST: Self = Self(0);

    /// The least urgent priority.
    pub const LOWEST: Self = Self(MAX_PRIORITY);

    /// Construct a `Priority`, checking the range.
    pub const fn new(value: u8) -> Result<Self, ConfigError> {
        if value <= MAX_PRIORITY {
            Ok(Self(value))
        } else {
            Err(ConfigError::BadPriority)
        }
    }

    /// Get the priority value.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Construct a `Priority` from a field read back from the hardware.
    #[inline]
    pub(crate) const fn from_bits(bits: u32) -> Self {
        Self(bits as u8 & MAX_PRIORITY)
    }
}

impl TryFrom<u8> for Priority {
    type Error = ConfigError;

    #[inline]
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Priority> for u8 {
    #[inline]
    fn from(x: Priority) -> Self {
        x.0
    }
}

impl fmt::Debug for Priority {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Priority({})", self.0)
    }
}

/// A Cortex-M4 system exception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemException {
    Reset,
    Nmi,
    HardFault,
    /// Memory Management Fault
    MemFault,
    BusFault,
    UsageFault,
    SvCall,
    DebugMonitor,
    PendSv,
    SysTick,
}

impl SystemException {
    /// All system exceptions in the order of their exception numbers.
    pub const ALL: [Self; 10] = [
        Self::Reset,
        Self::Nmi,
        Self::HardFault,
        Self::MemFault,
        Self::BusFault,
        Self::UsageFault,
        Self::SvCall,
        Self::DebugMonitor,
        Self::PendSv,
        Self::SysTick,
    ];

    /// Get the exception number (the index into the vector table).
    pub const fn number(self) -> u8 {
        match self {
            Self::Reset => 1,
            Self::Nmi => 2,
            Self::HardFault => 3,
            Self::MemFault => 4,
            Self::BusFault => 5,
            Self::UsageFault => 6,
            Self::SvCall => 11,
            Self::DebugMonitor => 12,
            Self::PendSv => 14,
            Self::SysTick => 15,
        }
    }

    /// Get a flag indicating whether the exception has an enable bit in
    /// `SYSHNDCTRL`.
    pub const fn is_maskable(self) -> bool {
        matches!(self, Self::MemFault | Self::BusFault | Self::UsageFault)
    }

    /// Get a flag indicating whether the exception's priority can be changed.
    pub const fn has_configurable_priority(self) -> bool {
        !matches!(self, Self::Reset | Self::Nmi | Self::HardFault)
    }
}

/// Construct an [`InterruptLine`], rejecting out-of-range values at compile
/// time.
///
/// ```
/// const UART0: tm4c_scs::InterruptLine = tm4c_scs::interrupt_line!(5);
/// assert_eq!(UART0.get(), 5);
/// ```
///
/// ```compile_fail
/// const BAD: tm4c_scs::InterruptLine = tm4c_scs::interrupt_line!(138);
/// ```
#[macro_export]
macro_rules! interrupt_line {
    ($num:expr) => {{
        const LINE: $crate::InterruptLine = match $crate::InterruptLine::new($num) {
            Ok(x) => x,
            Err(e) => e.panic(),
        };
        LINE
    }};
}

/// Construct a [`Priority`], rejecting out-of-range values at compile time.
///
/// ```
/// assert_eq!(tm4c_scs::priority!(3).get(), 3);
/// ```
///
/// ```compile_fail
/// let _ = tm4c_scs::priority!(8);
/// ```
#[macro_export]
macro_rules! priority {
    ($value:expr) => {{
        const PRIORITY: $crate::Priority = match $crate::Priority::new($value) {
            Ok(x) => x,
            Err(e) => e.panic(),
        };
        PRIORITY
    }};
}
