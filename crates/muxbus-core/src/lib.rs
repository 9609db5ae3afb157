//! Driver core for a mode-multiplexed serial bus
//!
//! One hardware serial unit serves two incompatible roles behind a mode
//! select line: an I2C master talking to an analog converter and an SPI
//! master talking to a NOR flash. This crate owns that multiplexing:
//!
//! - [`mux::BusMux`] claims the unit and rebinds the two shared interrupt
//!   vectors on every mode switch
//! - [`i2c::I2cBus`] and [`spi::SpiBus`] run counter-driven transfers,
//!   serviced byte-at-a-time from the vector handlers
//! - [`flash::Flash`] and [`adac::Adac`] speak the two devices' protocols
//! - [`scores`] persists the game's high-score table in the flash array
//!
//! Everything here is `no_std`. The hardware surface is the
//! [`usci::SerialUnit`] trait, implemented by the board support on real
//! hardware and by the timing-accurate unit in the simulator crate.

#![no_std]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(any(test, feature = "std"))]
extern crate std;

pub mod adac;
pub mod error;
pub mod flash;
pub mod i2c;
pub mod mux;
pub mod scores;
pub mod spi;
pub mod transfer;
pub mod usci;
pub mod vectors;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{Error, Result};
