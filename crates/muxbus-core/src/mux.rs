//! Single-owner switch for the shared serial unit
//!
//! Nothing in hardware stops code from driving the unit under a stale
//! assumption about which protocol it is configured for; whoever
//! reconfigured last wins. [`BusMux`] makes ownership explicit: acquiring a
//! mode reconfigures the unit and hands back a handle that exclusively
//! borrows the mux, so the other mode cannot even be named until the handle
//! is dropped. Re-acquiring after drop is cheap and is the supported way to
//! alternate between the two devices.

use crate::error::Result;
use crate::i2c::{self, I2cBus};
use crate::spi::{self, SpiBus};
use crate::transfer::Transfer;
use crate::usci::{BusMode, I2cConfig, SerialUnit, SpiConfig, Timeout};
use crate::vectors::VectorTable;

/// Owner of the shared unit and the vector registry.
pub struct BusMux<U: SerialUnit> {
    unit: U,
    vectors: VectorTable<U>,
    mode: Option<BusMode>,
}

impl<U: SerialUnit> BusMux<U> {
    /// Take ownership of an unconfigured unit.
    pub fn new(unit: U) -> Self {
        Self {
            unit,
            vectors: VectorTable::new(),
            mode: None,
        }
    }

    /// Configure the unit for I2C and hand out the exclusive handle.
    ///
    /// Full reconfiguration sequence: reset held, master/synchronous I2C at
    /// the fixed rate toward `config.address`, mode line high, reset
    /// released, vectors rebound to the I2C handlers.
    pub fn acquire_i2c(&mut self, config: I2cConfig) -> I2cBus<'_, U> {
        self.unit.set_reset(true);
        self.unit.configure_i2c(&config);
        self.unit.set_mode_line(BusMode::I2c);
        self.unit.set_reset(false);
        self.vectors.bind_tx(i2c::data_vector);
        self.vectors.bind_rx(i2c::status_vector);
        self.mode = Some(BusMode::I2c);
        log::debug!("bus acquired for I2C, slave 0x{:02X}", config.address);
        I2cBus::new(self, config)
    }

    /// Configure the unit for SPI and hand out the exclusive handle.
    ///
    /// Full reconfiguration sequence: reset held, master/synchronous SPI
    /// (capture on first edge, MSB first, 3-pin), mode line low, chip
    /// select idle high, reset released, vectors rebound to the SPI
    /// handlers.
    pub fn acquire_spi(&mut self, config: SpiConfig) -> SpiBus<'_, U> {
        self.unit.set_reset(true);
        self.unit.configure_spi(&config);
        self.unit.set_mode_line(BusMode::Spi);
        self.unit.set_chip_select(false);
        self.unit.set_reset(false);
        self.vectors.bind_tx(spi::tx_vector);
        self.vectors.bind_rx(spi::rx_vector);
        self.mode = Some(BusMode::Spi);
        log::debug!("bus acquired for SPI");
        SpiBus::new(self, config)
    }

    /// What the unit was last configured for, if anything.
    pub fn current_mode(&self) -> Option<BusMode> {
        self.mode
    }

    /// Give the unit back.
    pub fn release(self) -> U {
        self.unit
    }

    /// Block pumping vector events through the registry until the transfer
    /// completes. Each wait is individually bounded by `timeout`.
    pub(crate) fn pump(&mut self, transfer: &mut Transfer<'_>, timeout: Timeout) -> Result<()> {
        while !transfer.is_done() {
            let vector = self.unit.wait_vector(timeout)?;
            self.vectors.dispatch(vector, &mut self.unit, transfer);
        }
        Ok(())
    }

    pub(crate) fn unit(&mut self) -> &mut U {
        &mut self.unit
    }

    pub(crate) fn unit_ref(&self) -> &U {
        &self.unit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::TestUnit;

    #[test]
    fn acquire_i2c_configures_and_claims_the_unit() {
        let mut mux = BusMux::new(TestUnit::new());
        assert_eq!(mux.current_mode(), None);
        let _bus = mux.acquire_i2c(I2cConfig::new(0x48));
        assert_eq!(mux.current_mode(), Some(BusMode::I2c));
        let unit = mux.release();
        assert_eq!(unit.mode_line, Some(BusMode::I2c));
        assert_eq!(unit.i2c_address, Some(0x48));
        assert!(!unit.reset_held);
    }

    #[test]
    fn acquire_spi_leaves_chip_select_idle() {
        let mut mux = BusMux::new(TestUnit::new());
        let _bus = mux.acquire_spi(SpiConfig::default());
        assert_eq!(mux.current_mode(), Some(BusMode::Spi));
        let unit = mux.release();
        assert_eq!(unit.mode_line, Some(BusMode::Spi));
        assert!(unit.spi_configured);
        assert!(!unit.chip_select);
    }

    #[test]
    fn reacquiring_switches_modes() {
        let mut mux = BusMux::new(TestUnit::new());
        {
            let _i2c = mux.acquire_i2c(I2cConfig::new(0x48));
        }
        {
            let _spi = mux.acquire_spi(SpiConfig::default());
        }
        assert_eq!(mux.current_mode(), Some(BusMode::Spi));
        let _i2c_again = mux.acquire_i2c(I2cConfig::new(0x48));
        assert_eq!(mux.current_mode(), Some(BusMode::I2c));
    }
}
