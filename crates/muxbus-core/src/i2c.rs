//! I2C transfer engine
//!
//! Master-mode write and read transactions toward a fixed slave address,
//! serviced byte-at-a-time from the vector handlers. A write blocks until
//! the last byte is acknowledged or the slave declines; a read blocks until
//! the final byte latches, with the stop condition issued one byte early
//! because the hardware shift register already holds the next byte by the
//! time software can react.

use crate::error::{Error, Result};
use crate::mux::BusMux;
use crate::transfer::Transfer;
use crate::usci::{Condition, I2cConfig, Irq, SerialUnit};

/// Whether a write closes the transaction with a stop condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStop {
    /// Issue a stop after the final byte.
    Yes,
    /// Keep the bus claimed so the next transfer begins with a repeated
    /// start.
    No,
}

/// Exclusive handle to the unit while it is configured for I2C.
///
/// Created by [`BusMux::acquire_i2c`]; holding it guarantees the mode line,
/// the vector bindings, and the slave address stay this engine's for as
/// long as it lives.
pub struct I2cBus<'m, U: SerialUnit> {
    mux: &'m mut BusMux<U>,
    config: I2cConfig,
}

impl<'m, U: SerialUnit> I2cBus<'m, U> {
    pub(crate) fn new(mux: &'m mut BusMux<U>, config: I2cConfig) -> Self {
        Self { mux, config }
    }

    /// The configuration this handle was acquired with.
    pub fn config(&self) -> I2cConfig {
        self.config
    }

    /// Master-transmit `data` to the configured slave.
    ///
    /// Blocks until every byte is acknowledged or the slave declines;
    /// `Err(Error::Nack)` reports the latter. With [`SendStop::No`] the bus
    /// stays claimed and the following transfer begins with a repeated
    /// start.
    pub fn write(&mut self, data: &[u8], stop: SendStop) -> Result<()> {
        let timeout = self.config.timeout;

        // a stop from the previous transaction may still be on the wire
        self.mux.unit().wait_until(Condition::StopSent, timeout)?;

        let mut transfer = Transfer::transmit(data);
        let unit = self.mux.unit();
        unit.enable_irq(Irq::TX_READY | Irq::NACK);
        unit.disable_irq(Irq::RX_READY);
        unit.set_transmitter(true);
        unit.signal_start();
        unit.wait_until(Condition::StartSent, timeout)?;
        self.mux.pump(&mut transfer, timeout)?;

        if stop == SendStop::Yes {
            let unit = self.mux.unit();
            unit.signal_stop();
            unit.wait_until(Condition::StopSent, timeout)?;
        }

        if transfer.is_acked() {
            Ok(())
        } else {
            log::debug!("I2C write of {} bytes not acknowledged", data.len());
            Err(Error::Nack)
        }
    }

    /// Master-receive `buf.len()` bytes from the configured slave.
    ///
    /// For a single byte the stop condition must already be latched while
    /// that byte is clocking, so it is issued immediately after the start
    /// completes; for longer reads the handler issues it when exactly one
    /// byte remains. A transfer the slave cuts short reports
    /// `Err(Error::Nack)`. An empty buffer returns without touching the
    /// bus.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let timeout = self.config.timeout;
        let single = buf.len() == 1;

        let mut transfer = Transfer::receive(buf);
        let unit = self.mux.unit();
        unit.disable_irq(Irq::TX_READY);
        unit.enable_irq(Irq::RX_READY | Irq::NACK);
        unit.set_transmitter(false);
        unit.signal_start();
        unit.wait_until(Condition::StartSent, timeout)?;
        if single {
            // one byte-time early: the only byte is already clocking
            let unit = self.mux.unit();
            unit.signal_stop();
            unit.wait_until(Condition::StopSent, timeout)?;
        }
        self.mux.pump(&mut transfer, timeout)?;
        // the handler's stop may still be shifting
        self.mux.unit().wait_until(Condition::StopSent, timeout)?;

        if transfer.remaining() > 0 {
            log::debug!("I2C read ended {} bytes short", transfer.remaining());
            return Err(Error::Nack);
        }
        Ok(())
    }
}

/// Data handler for the transmit-side vector in I2C mode.
///
/// The hardware routes both data directions through this vector; the
/// pending flags pick the path. Receive is checked first because the
/// transmit-ready flag idles set whenever the transmit buffer is free,
/// even mid-read. Receive: store the arrived byte, and pre-issue the stop
/// when exactly one byte is left. Transmit: load the next byte, or mark
/// success and completion once none remain.
pub(crate) fn data_vector<U: SerialUnit>(unit: &mut U, transfer: &mut Transfer<'_>) {
    if unit.irq_pending(Irq::RX_READY) {
        let byte = unit.read_rx();
        transfer.push_in(byte);
        if transfer.remaining() == 0 {
            transfer.finish();
        } else if transfer.remaining() == 1 {
            unit.signal_stop();
        }
    } else if unit.irq_pending(Irq::TX_READY) {
        if transfer.remaining() == 0 {
            transfer.finish_acked();
            unit.disable_irq(Irq::TX_READY);
            unit.clear_irq(Irq::TX_READY);
        } else {
            let byte = transfer.next_out();
            unit.write_tx(byte);
        }
    }
}

/// Status handler for the receive-side vector: a NACK completes the
/// transfer with the ack flag left unset so the blocking call returns
/// promptly.
pub(crate) fn status_vector<U: SerialUnit>(unit: &mut U, transfer: &mut Transfer<'_>) {
    if unit.irq_pending(Irq::NACK) {
        unit.clear_irq(Irq::NACK);
        transfer.finish();
    }
}
