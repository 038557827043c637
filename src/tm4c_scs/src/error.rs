use core::fmt;

/// The macro to define [`ConfigError`].
macro_rules! define_config_error {
    (
        $( #[$meta:meta] )*
        pub enum ConfigError {
            $(
                $( #[$vmeta:meta] )*
                $vname:ident => $message:literal
            ),* $(,)*
        }
    ) => {
        $( #[$meta] )*
        pub enum ConfigError {
            $(
                $( #[$vmeta] )*
                $vname
            ),*
        }

        impl ConfigError {
            /// Get the short name of the error.
            ///
            /// # Examples
            ///
            /// ```
            /// use tm4c_scs::ConfigError;
            /// assert_eq!(ConfigError::BadLine.as_str(), "BadLine");
            /// ```
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(
                        Self::$vname => stringify!($vname),
                    )*
                }
            }

            /// Get a human-readable description of the error.
            pub const fn message(self) -> &'static str {
                match self {
                    $(
                        Self::$vname => $message,
                    )*
                }
            }

            /// Panic with the description of the error. Used to reject invalid
            /// configuration values in `const` contexts.
            #[track_caller]
            pub const fn panic(self) -> ! {
                match self {
                    $(
                        Self::$vname => panic!($message),
                    )*
                }
            }
        }
    };
}

define_config_error! {
    /// A configuration request that was rejected because one of its parameters
    /// is outside the range the hardware can represent.
    ///
    /// These are programmer errors, not runtime conditions. Nothing is written
    /// to the register file when one of these is returned.
    #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
    pub enum ConfigError {
        /// The interrupt line number is not in range `0..138`.
        BadLine => "interrupt line out of range `0..138`",
        /// The priority is not in range `0..=7`.
        BadPriority => "priority out of range `0..=7`",
        /// The exception can't be enabled or disabled individually. Only
        /// MemFault, BusFault, and UsageFault have an enable bit.
        NotMaskable => "the exception has no enable bit",
        /// The exception's priority is fixed by the architecture (Reset, NMI,
        /// and HardFault).
        FixedPriority => "the exception has a fixed priority",
        /// The timer period is zero or doesn't fit in the 24-bit counter.
        BadPeriod => "the timer period doesn't fit in the 24-bit counter",
    }
}

impl fmt::Debug for ConfigError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.message())
    }
}
