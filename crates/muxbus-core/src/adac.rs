//! ADC/DAC combo peripheral driver
//!
//! Protocol layer for the analog front end that sits on the I2C side of
//! the bus: two converter channels wired to a joystick, plus one analog
//! output. A control byte written first selects what the following
//! transfers mean.

use crate::error::Result;
use crate::i2c::{I2cBus, SendStop};
use crate::mux::BusMux;
use crate::usci::{I2cConfig, SerialUnit, Timeout};

/// Fixed bus address of the converter.
pub const ADDRESS: u8 = 0x48;

/// Control byte: auto-incrementing conversion reads across both input
/// channels.
pub const CTRL_READ: u8 = 0x44;

/// Control byte: route the next data byte to the analog output.
pub const CTRL_OUTPUT: u8 = 0x40;

/// Exclusive handle to the converter while the unit is in I2C mode.
pub struct Adac<'m, U: SerialUnit> {
    bus: I2cBus<'m, U>,
}

impl<'m, U: SerialUnit> Adac<'m, U> {
    /// Claim the bus for the converter's fixed address.
    pub fn acquire(mux: &'m mut BusMux<U>, timeout: Timeout) -> Self {
        let mut config = I2cConfig::new(ADDRESS);
        config.timeout = timeout;
        Self {
            bus: mux.acquire_i2c(config),
        }
    }

    /// Sample both joystick axes.
    ///
    /// Writes the conversion control byte without a stop, then reads one
    /// byte whose value is the previous conversion and is discarded, then
    /// reads the two fresh channel values.
    pub fn read_joystick(&mut self) -> Result<[u8; 2]> {
        self.bus.write(&[CTRL_READ], SendStop::No)?;
        let mut discard = [0u8; 1];
        self.bus.read(&mut discard)?;
        let mut axes = [0u8; 2];
        self.bus.read(&mut axes)?;
        Ok(axes)
    }

    /// Drive the analog output to `value`.
    pub fn write_output(&mut self, value: u8) -> Result<()> {
        self.bus.write(&[CTRL_OUTPUT, value], SendStop::Yes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::testutil::{Event, TestUnit};
    use std::vec;

    #[test]
    fn joystick_read_follows_the_control_discard_sample_shape() {
        let script = vec![
            Event::tx_ready(), // control byte loads
            Event::tx_ready(), // control write completes
            Event::rx_ready(0xEE),
            Event::rx_ready(0xAB),
            Event::rx_ready(0xCD),
        ];
        let mut mux = BusMux::new(TestUnit::scripted(script));
        let mut adac = Adac::acquire(&mut mux, Timeout::Forever);

        let axes = adac.read_joystick().unwrap();
        assert_eq!(axes, [0xAB, 0xCD]);

        let unit = mux.release();
        assert_eq!(unit.tx_bytes, [CTRL_READ]);
        assert_eq!(unit.starts, 3);
        // no stop after the control write; one per read
        assert_eq!(unit.stops, 2);
        assert_eq!(unit.i2c_address, Some(ADDRESS));
    }

    #[test]
    fn output_write_sends_control_then_value() {
        let script = vec![Event::tx_ready(), Event::tx_ready(), Event::tx_ready()];
        let mut mux = BusMux::new(TestUnit::scripted(script));
        let mut adac = Adac::acquire(&mut mux, Timeout::Forever);

        adac.write_output(0x7F).unwrap();

        let unit = mux.release();
        assert_eq!(unit.tx_bytes, [CTRL_OUTPUT, 0x7F]);
        assert_eq!(unit.starts, 1);
        assert_eq!(unit.stops, 1);
    }

    #[test]
    fn absent_converter_surfaces_nack() {
        let script = vec![Event::nack()];
        let mut mux = BusMux::new(TestUnit::scripted(script));
        let mut adac = Adac::acquire(&mut mux, Timeout::Forever);
        assert_eq!(adac.read_joystick(), Err(Error::Nack));
    }
}
