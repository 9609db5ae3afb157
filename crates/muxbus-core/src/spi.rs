//! SPI transfer engine
//!
//! Master-mode full-duplex byte transfer toward the chip-select-gated flash
//! device. Driven purely by a byte counter; there is no acknowledgment
//! concept because every clock produces a byte in both directions. Reads
//! must transmit filler bytes to generate their own clocks.

use crate::error::Result;
use crate::mux::BusMux;
use crate::transfer::Transfer;
use crate::usci::{Condition, Irq, SerialUnit, SpiConfig};

/// Exclusive handle to the unit while it is configured for SPI.
///
/// Created by [`BusMux::acquire_spi`]. The flash protocol layer drives the
/// chip-select line through this handle and brackets its command sequences
/// with it.
pub struct SpiBus<'m, U: SerialUnit> {
    mux: &'m mut BusMux<U>,
    config: SpiConfig,
}

impl<'m, U: SerialUnit> SpiBus<'m, U> {
    pub(crate) fn new(mux: &'m mut BusMux<U>, config: SpiConfig) -> Self {
        Self { mux, config }
    }

    /// The configuration this handle was acquired with.
    pub fn config(&self) -> SpiConfig {
        self.config
    }

    /// Clock `data` out on the wire.
    ///
    /// Blocks until the handler has loaded the final byte; the last byte
    /// may still be shifting when this returns, which is why transfers
    /// guard on the busy flag first and [`drain`](Self::drain) exists for
    /// chip-select edges.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let timeout = self.config.timeout;
        let mut transfer = Transfer::transmit(data);
        let unit = self.mux.unit();
        unit.enable_irq(Irq::TX_READY);
        // previous transfer's final byte may still be draining
        unit.wait_until(Condition::ShiftIdle, timeout)?;
        self.mux.pump(&mut transfer, timeout)
    }

    /// Clock `buf.len()` bytes in, transmitting `0x00` fillers.
    ///
    /// A write is required to generate read clocks in this configuration,
    /// so one filler goes out here and the handler feeds the rest. The
    /// first stored byte is whatever the receive register latched during
    /// the preceding write phase (see the flash layer's stale-byte note).
    /// An empty buffer returns without touching the bus.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<()> {
        if buf.is_empty() {
            return Ok(());
        }
        let timeout = self.config.timeout;
        let mut transfer = Transfer::receive(buf);
        let unit = self.mux.unit();
        unit.enable_irq(Irq::RX_READY);
        unit.wait_until(Condition::ShiftIdle, timeout)?;
        // kick the clock; timing of this first filler matters
        unit.write_tx(0x00);
        self.mux.pump(&mut transfer, timeout)
    }

    /// Non-blocking query of the hardware busy flag.
    ///
    /// A pre-transfer guard, never a completion signal; completion belongs
    /// to the vector handlers.
    pub fn busy(&self) -> bool {
        self.mux.unit_ref().busy()
    }

    /// Wait for the shift register to go idle.
    pub fn drain(&mut self) -> Result<()> {
        let timeout = self.config.timeout;
        self.mux.unit().wait_until(Condition::ShiftIdle, timeout)
    }

    /// Drive the flash chip-select line; `true` selects the chip.
    pub fn set_chip_select(&mut self, asserted: bool) {
        self.mux.unit().set_chip_select(asserted);
    }

    /// Busy-wait helper; with a simulated unit this advances virtual time.
    pub fn delay_us(&mut self, us: u32) {
        self.mux.unit().delay_us(us);
    }
}

/// Transmit handler: load the next byte, or mark completion and disable
/// the source once none remain.
pub(crate) fn tx_vector<U: SerialUnit>(unit: &mut U, transfer: &mut Transfer<'_>) {
    if transfer.remaining() == 0 {
        transfer.finish();
        unit.disable_irq(Irq::TX_READY);
    } else {
        let byte = transfer.next_out();
        unit.write_tx(byte);
    }
}

/// Receive handler: write a filler to keep the clock running, store the
/// arrived byte, and mark completion once the counter hits zero. The final
/// invocation performs both actions too, which leaves one extra byte
/// clocking after the transfer ends.
pub(crate) fn rx_vector<U: SerialUnit>(unit: &mut U, transfer: &mut Transfer<'_>) {
    unit.write_tx(0x00);
    let byte = unit.read_rx();
    transfer.push_in(byte);
    if transfer.remaining() == 0 {
        transfer.finish();
        unit.disable_irq(Irq::RX_READY);
    }
}
