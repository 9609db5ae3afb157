//! muxbus-sim - In-memory board model for testing the driver core
//!
//! This crate simulates the whole board the driver core runs against: the
//! shared serial unit with its two interrupt vectors, the mode line, the
//! NOR flash behind the chip select, and the converter slave on the I2C
//! side. Timing is virtual; blocking driver calls advance a microsecond
//! clock edge by edge, so tests are deterministic and instant while still
//! exercising the interrupt-driven paths byte by byte.
//!
//! Everything observable lands in a [`Trace`] so tests can assert
//! orderings and counts instead of instrumenting the driver.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod clock;
pub mod flash;
pub mod slave;
pub mod trace;
pub mod unit;

pub use clock::SimClock;
pub use flash::SimFlash;
pub use slave::SimSlave;
pub use trace::{Trace, TraceEvent};
pub use unit::SimUnit;
