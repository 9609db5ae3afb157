//! Error types for muxbus-core
//!
//! A no_std compatible error type shared by both transfer engines and the
//! protocol layers built on them.

use core::fmt;

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The slave declined an address or data byte (I2C acknowledgment
    /// failure). Never retried automatically; the caller decides.
    Nack,
    /// A bounded wait expired before the hardware condition arrived.
    Timeout,
    /// No enabled interrupt source can ever fire again; the bus is dead.
    ///
    /// Only a simulated unit can detect this. Real hardware spins until the
    /// configured timeout instead.
    Stalled,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nack => write!(f, "slave did not acknowledge"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::Stalled => write!(f, "bus stalled: no interrupt source can fire"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
