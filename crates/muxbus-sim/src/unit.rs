//! The simulated serial communication unit.
//!
//! Models the register surface the driver core programs: interrupt
//! enables and flags, transmit/receive buffers, start/stop latches, the
//! mode line and the chip select, plus one in-flight bus activity at a
//! time as a scheduled edge on the virtual clock. The blocking waits
//! advance time edge by edge until the requested condition or an enabled
//! interrupt source arrives, honoring the caller's timeout.
//!
//! Vector aliasing matches the real unit: in I2C mode both data
//! directions raise the transmit-side vector and only the NACK status
//! raises the receive-side one; in SPI mode the pair is plain
//! transmit-ready / receive-ready. Every SPI byte is full duplex, so the
//! receive register and flag update on every byte clocked out; that is
//! what makes the first byte of every flash read stale.

use muxbus_core::error::{Error, Result};
use muxbus_core::usci::{
    BusMode, Condition, I2cConfig, Irq, SerialUnit, SpiConfig, Timeout, Vector, BIT_RATE_HZ,
};

use crate::clock::SimClock;
use crate::flash::SimFlash;
use crate::slave::SimSlave;
use crate::trace::{Trace, TraceEvent};

const BIT_TIME_US: u64 = 1_000_000 / BIT_RATE_HZ as u64;
const SPI_BYTE_US: u64 = 8 * BIT_TIME_US;
// eight data bits plus the acknowledge slot
const I2C_BYTE_US: u64 = 9 * BIT_TIME_US;
const I2C_ADDRESS_US: u64 = BIT_TIME_US + I2C_BYTE_US;
const I2C_STOP_US: u64 = BIT_TIME_US;

#[derive(Debug, Clone, Copy)]
enum Activity {
    Address { read: bool },
    ByteOut(u8),
    ByteIn,
    StopOut,
}

/// The board: the serial unit with the converter on its I2C side and the
/// NOR flash behind the chip select.
pub struct SimUnit {
    clock: SimClock,
    trace: Trace,
    flash: SimFlash,
    slave: SimSlave,

    reset_held: bool,
    protocol: Option<BusMode>,
    mode_line: Option<BusMode>,
    i2c_address: u8,
    transmitter: bool,
    ie: Irq,
    ifg: Irq,
    tx_buf: Option<u8>,
    rx_buf: u8,
    shifting: Option<(Activity, u64)>,
    start_pending: bool,
    stop_pending: bool,
    receiving: bool,
    halted: bool,
    chip_select: bool,
}

impl Default for SimUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl SimUnit {
    /// Fresh board: erased flash, converter slave at its fixed address,
    /// clock at zero.
    pub fn new() -> Self {
        Self {
            clock: SimClock::new(),
            trace: Trace::new(),
            flash: SimFlash::new(),
            slave: SimSlave::new(muxbus_core::adac::ADDRESS),
            reset_held: false,
            protocol: None,
            mode_line: None,
            i2c_address: 0,
            transmitter: false,
            ie: Irq::empty(),
            ifg: Irq::empty(),
            tx_buf: None,
            rx_buf: 0xFF,
            shifting: None,
            start_pending: false,
            stop_pending: false,
            receiving: false,
            halted: false,
            chip_select: false,
        }
    }

    /// Current virtual time.
    pub fn now_us(&self) -> u64 {
        self.clock.now_us()
    }

    /// The recorded bus activity.
    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Mutable trace access, for clearing between scenario phases.
    pub fn trace_mut(&mut self) -> &mut Trace {
        &mut self.trace
    }

    /// The flash chip.
    pub fn flash(&self) -> &SimFlash {
        &self.flash
    }

    /// Mutable flash access, for preloading contents.
    pub fn flash_mut(&mut self) -> &mut SimFlash {
        &mut self.flash
    }

    /// The I2C slave.
    pub fn slave(&self) -> &SimSlave {
        &self.slave
    }

    /// Mutable slave access, for scripting responses and NACKs.
    pub fn slave_mut(&mut self) -> &mut SimSlave {
        &mut self.slave
    }

    /// Whether any of the given interrupt sources is currently enabled.
    pub fn irq_enabled(&self, irq: Irq) -> bool {
        self.ie.intersects(irq)
    }

    fn deadline(&self, timeout: Timeout) -> Option<u64> {
        match timeout {
            Timeout::Forever => None,
            Timeout::Micros(us) => Some(self.clock.now_us() + u64::from(us)),
        }
    }

    fn raised_vector(&self) -> Option<Vector> {
        let pending = self.ifg & self.ie;
        if pending.is_empty() {
            return None;
        }
        match self.protocol? {
            BusMode::I2c => {
                // status beats data; both data directions share Transmit
                if pending.contains(Irq::NACK) {
                    Some(Vector::Receive)
                } else {
                    Some(Vector::Transmit)
                }
            }
            BusMode::Spi => {
                if pending.contains(Irq::RX_READY) {
                    Some(Vector::Receive)
                } else {
                    Some(Vector::Transmit)
                }
            }
        }
    }

    fn condition_holds(&self, condition: Condition) -> bool {
        match condition {
            Condition::StartSent => !self.start_pending,
            Condition::StopSent => !self.stop_pending,
            Condition::ShiftIdle => self.shifting.is_none() && self.tx_buf.is_none(),
        }
    }

    /// Move simulated time forward by one observable step: complete the
    /// in-flight activity, or begin one. `Ok(false)` means nothing can
    /// ever make progress again.
    fn step(&mut self, deadline: Option<u64>) -> Result<bool> {
        if let Some((activity, ends_at)) = self.shifting {
            if let Some(limit) = deadline {
                if ends_at > limit {
                    self.clock.advance_to(limit);
                    return Err(Error::Timeout);
                }
            }
            self.clock.advance_to(ends_at);
            self.shifting = None;
            self.complete(activity);
            self.begin_next();
            return Ok(true);
        }
        Ok(self.begin_next())
    }

    /// Begin the next activity the register state calls for. Moving a
    /// byte out of the transmit buffer raises the transmit flag at that
    /// moment, which is what lets software refill during the shift.
    fn begin_next(&mut self) -> bool {
        if self.shifting.is_some() || self.reset_held {
            return false;
        }
        match self.protocol {
            Some(BusMode::Spi) => {
                if let Some(byte) = self.tx_buf.take() {
                    self.ifg |= Irq::TX_READY;
                    self.begin(Activity::ByteOut(byte), SPI_BYTE_US);
                    return true;
                }
                false
            }
            Some(BusMode::I2c) => {
                if self.start_pending {
                    let read = !self.transmitter;
                    self.begin(Activity::Address { read }, I2C_ADDRESS_US);
                    true
                } else if self.tx_buf.is_some() && !self.halted {
                    if let Some(byte) = self.tx_buf.take() {
                        self.ifg |= Irq::TX_READY;
                        self.begin(Activity::ByteOut(byte), I2C_BYTE_US);
                    }
                    true
                } else if self.stop_pending {
                    self.begin(Activity::StopOut, I2C_STOP_US);
                    true
                } else if self.receiving && !self.halted {
                    self.begin(Activity::ByteIn, I2C_BYTE_US);
                    true
                } else {
                    false
                }
            }
            None => false,
        }
    }

    fn begin(&mut self, activity: Activity, duration_us: u64) {
        self.shifting = Some((activity, self.clock.now_us() + duration_us));
    }

    fn complete(&mut self, activity: Activity) {
        let now = self.clock.now_us();
        match activity {
            Activity::Address { read } => {
                self.start_pending = false;
                let acked = self.mode_line == Some(BusMode::I2c)
                    && self.slave.address_phase(self.i2c_address, read);
                self.trace.push(
                    now,
                    TraceEvent::AddressSent {
                        address: self.i2c_address,
                        read,
                        acked,
                    },
                );
                if !acked {
                    self.ifg |= Irq::NACK;
                    self.halted = true;
                } else if read {
                    self.receiving = true;
                }
            }
            Activity::ByteOut(byte) => match self.protocol {
                Some(BusMode::Spi) => {
                    let miso = if self.mode_line == Some(BusMode::Spi) && self.chip_select {
                        self.flash.exchange(now, byte)
                    } else {
                        0xFF
                    };
                    self.trace.push(now, TraceEvent::TxByte(byte));
                    self.rx_buf = miso;
                    self.ifg |= Irq::RX_READY;
                    self.trace.push(now, TraceEvent::RxByte(miso));
                }
                Some(BusMode::I2c) => {
                    self.trace.push(now, TraceEvent::TxByte(byte));
                    let acked =
                        self.mode_line == Some(BusMode::I2c) && self.slave.accept(byte);
                    if !acked {
                        self.ifg |= Irq::NACK;
                        self.halted = true;
                        self.tx_buf = None;
                    }
                }
                None => {}
            },
            Activity::ByteIn => {
                let byte = if self.mode_line == Some(BusMode::I2c) {
                    self.slave.produce()
                } else {
                    0xFF
                };
                self.rx_buf = byte;
                self.ifg |= Irq::RX_READY;
                self.trace.push(now, TraceEvent::RxByte(byte));
            }
            Activity::StopOut => {
                self.stop_pending = false;
                self.receiving = false;
                if self.mode_line == Some(BusMode::I2c) {
                    self.slave.stop();
                }
                self.trace.push(now, TraceEvent::StopCompleted);
            }
        }
    }
}

impl SerialUnit for SimUnit {
    fn set_reset(&mut self, held: bool) {
        if held && !self.reset_held {
            // reset aborts any in-flight activity and the engine state
            self.shifting = None;
            self.start_pending = false;
            self.stop_pending = false;
            self.receiving = false;
            self.halted = false;
            self.tx_buf = None;
        }
        if !held && self.reset_held {
            // the unit comes out of reset with an empty transmit buffer
            self.ifg = Irq::TX_READY;
        }
        self.reset_held = held;
    }

    fn configure_i2c(&mut self, config: &I2cConfig) {
        debug_assert!(self.reset_held, "reconfiguration requires reset held");
        self.protocol = Some(BusMode::I2c);
        self.i2c_address = config.address;
        self.trace
            .push(self.clock.now_us(), TraceEvent::Configured(BusMode::I2c));
    }

    fn configure_spi(&mut self, _config: &SpiConfig) {
        debug_assert!(self.reset_held, "reconfiguration requires reset held");
        self.protocol = Some(BusMode::Spi);
        self.trace
            .push(self.clock.now_us(), TraceEvent::Configured(BusMode::Spi));
    }

    fn set_mode_line(&mut self, mode: BusMode) {
        self.mode_line = Some(mode);
    }

    fn set_chip_select(&mut self, asserted: bool) {
        if asserted == self.chip_select {
            return;
        }
        self.chip_select = asserted;
        self.trace
            .push(self.clock.now_us(), TraceEvent::ChipSelect(asserted));
        if asserted {
            self.flash.select();
        } else {
            self.flash.deselect(self.clock.now_us());
        }
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
        self.start_pending = true;
        self.halted = false;
        if self.transmitter {
            // a start in transmitter mode raises the transmit flag too;
            // the first data byte loads while the address shifts
            self.ifg |= Irq::TX_READY;
        }
        self.trace.push(self.clock.now_us(), TraceEvent::StartIssued);
    }

    fn signal_stop(&mut self) {
        self.stop_pending = true;
        self.trace.push(self.clock.now_us(), TraceEvent::StopIssued);
    }

    fn write_tx(&mut self, byte: u8) {
        self.tx_buf = Some(byte);
        self.ifg &= !Irq::TX_READY;
    }

    fn read_rx(&mut self) -> u8 {
        self.ifg &= !Irq::RX_READY;
        self.rx_buf
    }

    fn busy(&self) -> bool {
        self.shifting.is_some()
    }

    fn wait_until(&mut self, condition: Condition, timeout: Timeout) -> Result<()> {
        let deadline = self.deadline(timeout);
        loop {
            if self.condition_holds(condition) {
                return Ok(());
            }
            if !self.step(deadline)? {
                return Err(Error::Stalled);
            }
        }
    }

    fn wait_vector(&mut self, timeout: Timeout) -> Result<Vector> {
        let deadline = self.deadline(timeout);
        loop {
            if let Some(vector) = self.raised_vector() {
                self.trace
                    .push(self.clock.now_us(), TraceEvent::VectorRaised(vector));
                return Ok(vector);
            }
            if !self.step(deadline)? {
                return Err(Error::Stalled);
            }
        }
    }

    fn delay_us(&mut self, us: u32) {
        let target = self.clock.now_us() + u64::from(us);
        while let Some((activity, ends_at)) = self.shifting {
            if ends_at > target {
                break;
            }
            self.clock.advance_to(ends_at);
            self.shifting = None;
            self.complete(activity);
            self.begin_next();
        }
        self.clock.advance_to(target);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i2c_unit() -> SimUnit {
        let mut unit = SimUnit::new();
        unit.set_reset(true);
        unit.configure_i2c(&I2cConfig::new(0x48));
        unit.set_mode_line(BusMode::I2c);
        unit.set_reset(false);
        unit
    }

    #[test]
    fn i2c_data_rides_the_transmit_vector() {
        let mut unit = i2c_unit();
        unit.enable_irq(Irq::TX_READY | Irq::NACK);
        unit.set_transmitter(true);
        unit.signal_start();
        unit.wait_until(Condition::StartSent, Timeout::Forever).unwrap();

        assert_eq!(unit.wait_vector(Timeout::Forever), Ok(Vector::Transmit));
        unit.write_tx(0x55);
        assert_eq!(unit.wait_vector(Timeout::Forever), Ok(Vector::Transmit));

        unit.signal_stop();
        unit.wait_until(Condition::StopSent, Timeout::Forever).unwrap();
        assert_eq!(unit.slave().received(), [0x55]);
        assert_eq!(unit.slave().stops_seen(), 1);
    }

    #[test]
    fn declined_address_raises_the_receive_vector() {
        let mut unit = i2c_unit();
        unit.slave_mut().set_ack_address(false);
        unit.enable_irq(Irq::TX_READY | Irq::NACK);
        unit.set_transmitter(true);
        unit.signal_start();
        unit.wait_until(Condition::StartSent, Timeout::Forever).unwrap();
        assert_eq!(unit.wait_vector(Timeout::Forever), Ok(Vector::Receive));
        assert!(unit.irq_pending(Irq::NACK));
    }

    #[test]
    fn transmitter_start_reraises_the_transmit_flag() {
        let mut unit = i2c_unit();
        unit.set_transmitter(true);
        unit.clear_irq(Irq::TX_READY);
        unit.signal_start();
        assert!(unit.irq_pending(Irq::TX_READY));

        // a receiver-mode start must not; incoming bytes drive that path
        unit.set_transmitter(false);
        unit.clear_irq(Irq::TX_READY);
        unit.signal_start();
        assert!(!unit.irq_pending(Irq::TX_READY));
    }

    #[test]
    fn spi_byte_is_full_duplex() {
        let mut unit = SimUnit::new();
        unit.set_reset(true);
        unit.configure_spi(&SpiConfig::default());
        unit.set_mode_line(BusMode::Spi);
        unit.set_reset(false);
        unit.set_chip_select(true);

        unit.enable_irq(Irq::RX_READY);
        unit.write_tx(0x05);
        assert_eq!(unit.wait_vector(Timeout::Forever), Ok(Vector::Receive));
        let _ = unit.read_rx();
        // the byte really reached the chip
        assert_eq!(unit.now_us(), 80);
    }

    #[test]
    fn bounded_wait_expires_at_the_deadline() {
        let mut unit = SimUnit::new();
        unit.set_reset(true);
        unit.configure_spi(&SpiConfig::default());
        unit.set_mode_line(BusMode::Spi);
        unit.set_reset(false);

        unit.enable_irq(Irq::RX_READY);
        unit.write_tx(0x00);
        // a byte needs 80 us; give it 5
        assert_eq!(unit.wait_vector(Timeout::Micros(5)), Err(Error::Timeout));
        assert_eq!(unit.now_us(), 5);
    }

    #[test]
    fn dead_bus_is_reported_stalled() {
        let mut unit = SimUnit::new();
        unit.set_reset(true);
        unit.configure_spi(&SpiConfig::default());
        unit.set_mode_line(BusMode::Spi);
        unit.set_reset(false);

        unit.clear_irq(Irq::TX_READY);
        unit.enable_irq(Irq::RX_READY);
        // nothing buffered, nothing shifting: no source can ever fire
        assert_eq!(unit.wait_vector(Timeout::Forever), Err(Error::Stalled));
    }
}
