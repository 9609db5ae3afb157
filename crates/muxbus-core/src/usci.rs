//! Hardware seam for the shared serial communication unit
//!
//! One physical unit serves both wire protocols; its registers are reached
//! through the [`SerialUnit`] trait so the transfer engines run unchanged
//! against the simulator in tests and against a real MCU port in firmware.
//! Methods mirror the unit's register interface; transaction logic stays in
//! the engines.

use crate::error::Result;
use bitflags::bitflags;

/// Fixed bus bit rate for both modes (16 MHz source clock / 160 divider).
pub const BIT_RATE_HZ: u32 = 100_000;

bitflags! {
    /// Interrupt sources of the shared unit
    ///
    /// Enable bits and pending flags use the same set; which hardware
    /// vector a pending source raises depends on the configured mode (see
    /// [`Vector`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Irq: u8 {
        /// Transmit buffer ready for the next byte
        const TX_READY = 1 << 0;
        /// Receive buffer holds a fresh byte
        const RX_READY = 1 << 1;
        /// Slave declined an address or data byte (I2C only)
        const NACK     = 1 << 2;
    }
}

/// The two hardware interrupt vectors exported by the unit.
///
/// Both protocols alias the same pair. In I2C mode data interrupts for both
/// directions raise the transmit-side vector while status interrupts (NACK)
/// raise the receive-side one; in SPI mode the pair carries plain
/// transmit-ready / receive-ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vector {
    /// Transmit-side vector.
    Transmit,
    /// Receive-side vector.
    Receive,
}

/// Which protocol the shared pins are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusMode {
    /// Two-wire mode; the mode line is driven high.
    I2c,
    /// Three-wire mode; the mode line is driven low.
    Spi,
}

/// Hardware conditions the engines wait on outside vector dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Start condition and address fully sent.
    StartSent,
    /// Stop condition fully sent.
    StopSent,
    /// Shift register idle; the previous byte has fully clocked out.
    ShiftIdle,
}

/// Bound for a single blocking wait.
///
/// `Forever` spins until the condition arrives, however long that takes; a
/// finite bound turns a stalled bus into [`Error::Timeout`] so tests never
/// hang.
///
/// [`Error::Timeout`]: crate::Error::Timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Timeout {
    /// Wait indefinitely.
    #[default]
    Forever,
    /// Fail after this many microseconds.
    Micros(u32),
}

/// I2C engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct I2cConfig {
    /// 7-bit address of the peer device.
    pub address: u8,
    /// Bound applied to each blocking wait.
    pub timeout: Timeout,
}

impl I2cConfig {
    /// Configuration for a fixed slave address with the default timeout.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            timeout: Timeout::default(),
        }
    }
}

/// SPI engine configuration.
///
/// Clock polarity/phase (data captured on the first edge, changed on the
/// following), bit order (MSB first), pin count (3) and bit rate are fixed
/// properties of this bus, not configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpiConfig {
    /// Bound applied to each blocking wait.
    pub timeout: Timeout,
}

/// Register-level operations of the shared serial communication unit.
///
/// Implementations: the simulator crate for tests, a port talking to the
/// real registers for firmware. The blocking primitives carry the caller's
/// [`Timeout`]; on hardware they spin on flag registers, in the simulator
/// they advance virtual time.
pub trait SerialUnit {
    /// Hold or release the software reset latch. The unit only accepts
    /// reconfiguration while held.
    fn set_reset(&mut self, held: bool);

    /// Program the unit for single-master synchronous I2C at the fixed bit
    /// rate, targeting `config.address`.
    fn configure_i2c(&mut self, config: &I2cConfig);

    /// Program the unit for single-master synchronous SPI at the fixed bit
    /// rate: data captured on the first clock edge, MSB first, 3-pin mode.
    fn configure_spi(&mut self, config: &SpiConfig);

    /// Drive the shared mode line.
    fn set_mode_line(&mut self, mode: BusMode);

    /// Drive the flash chip-select line; `true` selects the chip (low).
    fn set_chip_select(&mut self, asserted: bool);

    /// Enable the given interrupt sources.
    fn enable_irq(&mut self, irq: Irq);

    /// Disable the given interrupt sources. Pending flags are unaffected.
    fn disable_irq(&mut self, irq: Irq);

    /// Whether any of the given sources has a pending flag.
    fn irq_pending(&self, irq: Irq) -> bool;

    /// Clear pending flags for the given sources.
    fn clear_irq(&mut self, irq: Irq);

    /// Select the transmitter (`true`) or receiver role for I2C.
    fn set_transmitter(&mut self, transmit: bool);

    /// Latch a start condition toward the configured slave address.
    fn signal_start(&mut self);

    /// Latch a stop condition.
    fn signal_stop(&mut self);

    /// Write one byte into the transmit buffer.
    fn write_tx(&mut self, byte: u8);

    /// Read the last received byte, clearing the receive flag.
    fn read_rx(&mut self) -> u8;

    /// Whether the shift register is still clocking a byte.
    fn busy(&self) -> bool;

    /// Block until `condition` holds.
    fn wait_until(&mut self, condition: Condition, timeout: Timeout) -> Result<()>;

    /// Block until an enabled interrupt source raises one of the two
    /// vectors, and report which one fired.
    fn wait_vector(&mut self, timeout: Timeout) -> Result<Vector>;

    /// Busy-wait for `us` microseconds.
    fn delay_us(&mut self, us: u32);
}
