#![deny(unsafe_op_in_unsafe_fn)]
#![doc = include_str!("./lib.md")]
#![no_std]

#[cfg(doc)]
#[doc = include_str!("../CHANGELOG.md")]
pub mod _changelog_ {}

mod error;
pub mod regs;

/// The NVIC driver.
#[doc(hidden)]
pub mod nvic {
    pub mod cfg;
    pub mod imp;
}

/// The SysTick driver.
#[doc(hidden)]
pub mod systick {
    pub mod cfg;
    pub mod imp;
}

#[cfg(target_os = "none")]
pub mod cpu;

#[cfg(any(test, feature = "sim"))]
pub mod sim;

pub use self::{
    error::ConfigError,
    nvic::{cfg::*, imp::InterruptController},
    regs::{Mmio, RegisterFile},
    systick::{
        cfg::*,
        imp::{Callback, SystemTimer},
    },
};

/// Used by `use_systick!`
#[doc(hidden)]
#[cfg(target_os = "none")]
pub use cortex_m_rt;
