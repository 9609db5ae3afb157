//! SPI NOR flash protocol layer
//!
//! Command sequences for a small-sector NOR part (M25P-class opcodes)
//! driven over [`SpiBus`]. Every command is bracketed by the chip-select
//! line, and the shift register is drained before each deassert edge so
//! the final byte is never truncated.
//!
//! # The stale first byte
//!
//! The receive register still holds a byte latched during the preceding
//! command phase when a read begins, and the receive handler stores it
//! first. Every buffer handed to a read therefore carries one leading
//! stale byte: ask for `n + 1` bytes and take the payload from index 1.
//! The helpers here ([`Flash::read_id`], [`Flash::busy`]) already account
//! for it; callers of [`Flash::read`] size their own buffers.

pub mod opcodes;

use crate::error::Result;
use crate::spi::SpiBus;
use crate::usci::SerialUnit;

pub use opcodes::Status;

/// 24-bit byte address inside the flash array. Bits above 23 are ignored
/// on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlashAddress(pub u32);

impl FlashAddress {
    /// Wire form: three bytes, most significant first.
    pub fn to_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

/// Identification bytes returned by the read-ID command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JedecId {
    /// JEDEC manufacturer code.
    pub manufacturer: u8,
    /// Device memory type.
    pub memory_type: u8,
    /// Device capacity code.
    pub capacity: u8,
}

/// Fixed wait applied after issuing a sector erase when not polling,
/// sized for the slowest erase the targeted parts specify.
pub const ERASE_DELAY_US: u32 = 750_000;

/// How to wait out an erase cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseWait {
    /// Busy-wait a fixed number of microseconds without touching the bus.
    FixedDelay {
        /// Length of the wait.
        us: u32,
    },
    /// Poll the status register until the write-in-progress bit clears.
    Poll {
        /// Pause between status reads.
        interval_us: u32,
        /// Give up after this much waiting.
        timeout_us: u32,
    },
}

impl Default for EraseWait {
    fn default() -> Self {
        EraseWait::FixedDelay { us: ERASE_DELAY_US }
    }
}

/// Flash driver configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlashConfig {
    /// Erase completion strategy.
    pub erase_wait: EraseWait,
}

/// Command-level driver for the chip-select-gated NOR device.
pub struct Flash<'m, U: SerialUnit> {
    bus: SpiBus<'m, U>,
    config: FlashConfig,
}

impl<'m, U: SerialUnit> Flash<'m, U> {
    /// Wrap an acquired SPI handle.
    pub fn new(bus: SpiBus<'m, U>, config: FlashConfig) -> Self {
        Self { bus, config }
    }

    /// Give the SPI handle back, for raw command sequences.
    pub fn release(self) -> SpiBus<'m, U> {
        self.bus
    }

    /// Read the identification bytes.
    pub fn read_id(&mut self) -> Result<JedecId> {
        let mut id = [0u8; 4];
        self.selected(|bus| {
            bus.write(&[opcodes::READ_ID])?;
            bus.read(&mut id)
        })?;
        Ok(JedecId {
            manufacturer: id[1],
            memory_type: id[2],
            capacity: id[3],
        })
    }

    /// Read `buf.len()` bytes starting at `address`.
    ///
    /// `buf[0]` comes back stale; the payload starts at `buf[1]`.
    pub fn read(&mut self, address: FlashAddress, buf: &mut [u8]) -> Result<()> {
        let [a, b, c] = address.to_bytes();
        self.selected(|bus| {
            bus.write(&[opcodes::READ, a, b, c])?;
            bus.read(buf)
        })
    }

    /// Erase the sector containing `address` and wait for it to finish.
    pub fn erase(&mut self, address: FlashAddress) -> Result<()> {
        log::debug!("erasing sector at 0x{:06X}", address.0);
        let [a, b, c] = address.to_bytes();
        self.write_enable()?;
        self.selected(|bus| bus.write(&[opcodes::SECTOR_ERASE, a, b, c]))?;
        self.wait_erase()
    }

    /// Erase the containing sector, then program `data` at `address`.
    ///
    /// Programming wraps within the device's 256-byte page if `data` runs
    /// past a page boundary.
    pub fn write(&mut self, address: FlashAddress, data: &[u8]) -> Result<()> {
        log::debug!("programming {} bytes at 0x{:06X}", data.len(), address.0);
        let [a, b, c] = address.to_bytes();
        self.erase(address)?;
        self.write_enable()?;
        self.selected(|bus| {
            bus.write(&[opcodes::PAGE_PROGRAM, a, b, c])?;
            bus.write(data)
        })
    }

    /// Whether a program or erase cycle is still running.
    pub fn busy(&mut self) -> Result<bool> {
        let mut status = [0u8; 2];
        self.selected(|bus| {
            bus.write(&[opcodes::READ_STATUS])?;
            bus.read(&mut status)
        })?;
        Ok(Status::from_bits_truncate(status[1]).contains(Status::WIP))
    }

    /// Busy-wait helper; with a simulated unit this advances virtual time.
    pub fn delay_us(&mut self, us: u32) {
        self.bus.delay_us(us);
    }

    fn write_enable(&mut self) -> Result<()> {
        self.selected(|bus| bus.write(&[opcodes::WRITE_ENABLE]))
    }

    fn wait_erase(&mut self) -> Result<()> {
        match self.config.erase_wait {
            EraseWait::FixedDelay { us } => {
                self.bus.delay_us(us);
                Ok(())
            }
            EraseWait::Poll {
                interval_us,
                timeout_us,
            } => {
                let mut waited = 0u32;
                while self.busy()? {
                    if waited >= timeout_us {
                        return Err(crate::error::Error::Timeout);
                    }
                    self.bus.delay_us(interval_us);
                    waited = waited.saturating_add(interval_us);
                }
                Ok(())
            }
        }
    }

    /// Run one command sequence with the chip selected, draining the
    /// shift register before the deassert edge.
    fn selected<T>(&mut self, f: impl FnOnce(&mut SpiBus<'m, U>) -> Result<T>) -> Result<T> {
        self.bus.set_chip_select(true);
        let result = f(&mut self.bus);
        let drained = self.bus.drain();
        self.bus.set_chip_select(false);
        result.and_then(|value| drained.map(|_| value))
    }
}
