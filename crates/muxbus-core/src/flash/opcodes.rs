//! SPI NOR command opcodes and status register layout.

/// Write Enable. Sets the write enable latch; required before any program
/// or erase command.
pub const WRITE_ENABLE: u8 = 0x06;

/// Read Status Register.
pub const READ_STATUS: u8 = 0x05;

/// Read Identification. Returns manufacturer and device identification
/// bytes.
pub const READ_ID: u8 = 0x9F;

/// Read Data Bytes. Followed by a 3-byte big-endian address.
pub const READ: u8 = 0x03;

/// Page Program. Followed by a 3-byte big-endian address and up to a page
/// of data.
pub const PAGE_PROGRAM: u8 = 0x02;

/// Sector Erase. Followed by a 3-byte big-endian address anywhere inside
/// the sector.
pub const SECTOR_ERASE: u8 = 0xD8;

bitflags::bitflags! {
    /// Status register bits returned by [`READ_STATUS`].
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status: u8 {
        /// Write in progress. Set while a program or erase cycle runs.
        const WIP = 0x01;
        /// Write enable latch. Set by [`WRITE_ENABLE`], cleared when a
        /// program or erase cycle completes.
        const WEL = 0x02;
    }
}
