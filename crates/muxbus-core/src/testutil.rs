//! Scripted serial unit for in-crate engine tests.
//!
//! Register-shaped state plus a queue of interrupt events to deliver; each
//! `wait_vector` pops one, raises its flags, and reports the vector. The
//! full timing-accurate model lives in the simulator crate; this is just
//! enough hardware for the handlers and blocking paths.

use crate::error::{Error, Result};
use crate::usci::{BusMode, Condition, I2cConfig, Irq, SerialUnit, SpiConfig, Timeout, Vector};
use std::collections::VecDeque;
use std::vec::Vec;

/// One scripted interrupt delivery.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Event {
    pub vector: Vector,
    pub raise: Irq,
    pub rx: u8,
}

impl Event {
    pub(crate) fn tx_ready() -> Self {
        Self {
            vector: Vector::Transmit,
            raise: Irq::TX_READY,
            rx: 0,
        }
    }

    pub(crate) fn rx_ready(byte: u8) -> Self {
        Self {
            vector: Vector::Transmit,
            raise: Irq::RX_READY,
            rx: byte,
        }
    }

    pub(crate) fn spi_rx(byte: u8) -> Self {
        Self {
            vector: Vector::Receive,
            raise: Irq::RX_READY,
            rx: byte,
        }
    }

    pub(crate) fn nack() -> Self {
        Self {
            vector: Vector::Receive,
            raise: Irq::NACK,
            rx: 0,
        }
    }
}

pub(crate) struct TestUnit {
    pub ie: Irq,
    pub ifg: Irq,
    pub transmitter: bool,
    pub reset_held: bool,
    pub mode_line: Option<BusMode>,
    pub chip_select: bool,
    pub i2c_address: Option<u8>,
    pub spi_configured: bool,
    pub starts: usize,
    pub stops: usize,
    pub tx_bytes: Vec<u8>,
    pub rx_next: u8,
    pub script: VecDeque<Event>,
    pub delays_us: u64,
}

impl TestUnit {
    pub(crate) fn new() -> Self {
        Self {
            ie: Irq::empty(),
            ifg: Irq::empty(),
            transmitter: false,
            reset_held: false,
            mode_line: None,
            chip_select: false,
            i2c_address: None,
            spi_configured: false,
            starts: 0,
            stops: 0,
            tx_bytes: Vec::new(),
            rx_next: 0,
            script: VecDeque::new(),
            delays_us: 0,
        }
    }

    pub(crate) fn scripted(events: impl IntoIterator<Item = Event>) -> Self {
        let mut unit = Self::new();
        unit.script = events.into_iter().collect();
        unit
    }

    pub(crate) fn set_pending(&mut self, irq: Irq) {
        self.ifg |= irq;
    }
}

impl SerialUnit for TestUnit {
    fn set_reset(&mut self, held: bool) {
        self.reset_held = held;
    }

    fn configure_i2c(&mut self, config: &I2cConfig) {
        self.i2c_address = Some(config.address);
        self.spi_configured = false;
    }

    fn configure_spi(&mut self, _config: &SpiConfig) {
        self.spi_configured = true;
        self.i2c_address = None;
    }

    fn set_mode_line(&mut self, mode: BusMode) {
        self.mode_line = Some(mode);
    }

    fn set_chip_select(&mut self, asserted: bool) {
        self.chip_select = asserted;
    }

    fn enable_irq(&mut self, irq: Irq) {
        self.ie |= irq;
    }

    fn disable_irq(&mut self, irq: Irq) {
        self.ie &= !irq;
    }

    fn irq_pending(&self, irq: Irq) -> bool {
        self.ifg.intersects(irq)
    }

    fn clear_irq(&mut self, irq: Irq) {
        self.ifg &= !irq;
    }

    fn set_transmitter(&mut self, transmit: bool) {
        self.transmitter = transmit;
    }

    fn signal_start(&mut self) {
        self.starts += 1;
    }

    fn signal_stop(&mut self) {
        self.stops += 1;
    }

    fn write_tx(&mut self, byte: u8) {
        self.tx_bytes.push(byte);
        self.ifg &= !Irq::TX_READY;
    }

    fn read_rx(&mut self) -> u8 {
        self.ifg &= !Irq::RX_READY;
        self.rx_next
    }

    fn busy(&self) -> bool {
        false
    }

    fn wait_until(&mut self, _condition: Condition, _timeout: Timeout) -> Result<()> {
        Ok(())
    }

    fn wait_vector(&mut self, _timeout: Timeout) -> Result<Vector> {
        match self.script.pop_front() {
            Some(event) => {
                self.ifg |= event.raise;
                self.rx_next = event.rx;
                Ok(event.vector)
            }
            None => Err(Error::Stalled),
        }
    }

    fn delay_us(&mut self, us: u32) {
        self.delays_us += u64::from(us);
    }
}
