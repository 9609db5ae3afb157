//! Byte-at-a-time model of the SPI NOR flash chip.
//!
//! Geometry and identification follow the M25P16: 2 MiB array, 64 KiB
//! sectors, 256-byte pages, JEDEC id `20 20 15`. Commands decode one byte
//! per exchange; erase and program take effect on the deselect edge, the
//! way the real part latches them. Erase holds the write-in-progress bit
//! for a window shorter than the driver's fixed wait; program completes
//! instantly so verification reads right after are deterministic.

use muxbus_core::flash::opcodes::{self, Status};

/// JEDEC manufacturer byte.
pub const JEDEC_MANUFACTURER: u8 = 0x20;
/// JEDEC memory type byte.
pub const JEDEC_MEMORY_TYPE: u8 = 0x20;
/// JEDEC capacity byte.
pub const JEDEC_CAPACITY: u8 = 0x15;

/// Total array size in bytes (2 MiB).
pub const ARRAY_SIZE: usize = 2 * 1024 * 1024;
/// Erase granularity in bytes.
pub const SECTOR_SIZE: u32 = 64 * 1024;
/// Program granularity in bytes; writes wrap within a page.
pub const PAGE_SIZE: u32 = 256;
/// Value every byte of an erased sector reads as.
pub const ERASED: u8 = 0xFF;

/// How long the write-in-progress bit stays set after a sector erase.
pub const ERASE_BUSY_US: u64 = 600_000;

#[derive(Debug)]
enum Decoder {
    Deselected,
    Command,
    Address { op: u8, bytes: [u8; 3], got: usize },
    ReadData { address: u32 },
    ReadStatus,
    ReadId { index: usize },
    Program { page: u32, offset: u32, bytes: Vec<u8> },
    EraseLatched { address: u32 },
    WriteEnableLatched,
    Ignored,
}

/// The flash chip: array contents, write-enable latch, busy window, and
/// the per-selection command decoder.
pub struct SimFlash {
    array: Vec<u8>,
    wel: bool,
    busy_until_us: u64,
    decoder: Decoder,
}

impl Default for SimFlash {
    fn default() -> Self {
        Self::new()
    }
}

impl SimFlash {
    /// Fully erased chip.
    pub fn new() -> Self {
        Self {
            array: vec![ERASED; ARRAY_SIZE],
            wel: false,
            busy_until_us: 0,
            decoder: Decoder::Deselected,
        }
    }

    /// Write `bytes` straight into the array, bypassing the protocol.
    /// Test setup only.
    pub fn preload(&mut self, address: u32, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            let index = (address as usize + i) % ARRAY_SIZE;
            self.array[index] = byte;
        }
    }

    /// Read one array byte directly, bypassing the protocol.
    pub fn peek(&self, address: u32) -> u8 {
        self.array[address as usize % ARRAY_SIZE]
    }

    /// Whether a program or erase cycle is still running at `now_us`.
    pub fn is_busy(&self, now_us: u64) -> bool {
        now_us < self.busy_until_us
    }

    /// Whether the write enable latch is set.
    pub fn write_enabled(&self) -> bool {
        self.wel
    }

    pub(crate) fn select(&mut self) {
        self.decoder = Decoder::Command;
    }

    /// Clock one byte in and out while selected.
    pub(crate) fn exchange(&mut self, now_us: u64, mosi: u8) -> u8 {
        match core::mem::replace(&mut self.decoder, Decoder::Ignored) {
            Decoder::Deselected => {
                self.decoder = Decoder::Deselected;
                ERASED
            }
            Decoder::Command => {
                self.decoder = self.decode(now_us, mosi);
                ERASED
            }
            Decoder::Address { op, mut bytes, got } => {
                bytes[got] = mosi;
                let got = got + 1;
                if got < 3 {
                    self.decoder = Decoder::Address { op, bytes, got };
                } else {
                    // address bits above the array size alias, as on the part
                    let address =
                        u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]) % ARRAY_SIZE as u32;
                    self.decoder = match op {
                        opcodes::READ => Decoder::ReadData { address },
                        opcodes::PAGE_PROGRAM => Decoder::Program {
                            page: address & !(PAGE_SIZE - 1),
                            offset: address & (PAGE_SIZE - 1),
                            bytes: Vec::new(),
                        },
                        opcodes::SECTOR_ERASE => Decoder::EraseLatched { address },
                        _ => Decoder::Ignored,
                    };
                }
                ERASED
            }
            Decoder::ReadData { address } => {
                let out = self.array[address as usize % ARRAY_SIZE];
                self.decoder = Decoder::ReadData {
                    address: address.wrapping_add(1),
                };
                out
            }
            Decoder::ReadStatus => {
                self.decoder = Decoder::ReadStatus;
                self.status(now_us).bits()
            }
            Decoder::ReadId { index } => {
                let out = match index {
                    0 => JEDEC_MANUFACTURER,
                    1 => JEDEC_MEMORY_TYPE,
                    2 => JEDEC_CAPACITY,
                    _ => 0x00,
                };
                self.decoder = Decoder::ReadId { index: index + 1 };
                out
            }
            Decoder::Program {
                page,
                offset,
                mut bytes,
            } => {
                bytes.push(mosi);
                self.decoder = Decoder::Program {
                    page,
                    offset,
                    bytes,
                };
                ERASED
            }
            state @ (Decoder::EraseLatched { .. }
            | Decoder::WriteEnableLatched
            | Decoder::Ignored) => {
                // trailing bytes carry no meaning for these commands
                self.decoder = state;
                ERASED
            }
        }
    }

    /// Deselect edge: reset the decoder and execute whatever it latched.
    pub(crate) fn deselect(&mut self, now_us: u64) {
        match core::mem::replace(&mut self.decoder, Decoder::Deselected) {
            Decoder::WriteEnableLatched => {
                self.wel = true;
            }
            Decoder::EraseLatched { address } if self.wel => {
                let base = (address & !(SECTOR_SIZE - 1)) as usize;
                log::trace!("flash: sector erase at 0x{:06X}", base);
                self.array[base..base + SECTOR_SIZE as usize].fill(ERASED);
                self.wel = false;
                self.busy_until_us = now_us + ERASE_BUSY_US;
            }
            Decoder::Program {
                page,
                offset,
                bytes,
            } if self.wel => {
                log::trace!(
                    "flash: programming {} bytes at 0x{:06X}",
                    bytes.len(),
                    page + offset
                );
                for (i, byte) in bytes.into_iter().enumerate() {
                    let target = page + (offset + i as u32) % PAGE_SIZE;
                    // programming only clears bits
                    self.array[target as usize] &= byte;
                }
                self.wel = false;
            }
            _ => {}
        }
    }

    fn decode(&mut self, now_us: u64, opcode: u8) -> Decoder {
        if self.is_busy(now_us) && opcode != opcodes::READ_STATUS {
            return Decoder::Ignored;
        }
        match opcode {
            opcodes::READ_STATUS => Decoder::ReadStatus,
            opcodes::WRITE_ENABLE => Decoder::WriteEnableLatched,
            opcodes::READ_ID => Decoder::ReadId { index: 0 },
            opcodes::READ | opcodes::PAGE_PROGRAM | opcodes::SECTOR_ERASE => Decoder::Address {
                op: opcode,
                bytes: [0; 3],
                got: 0,
            },
            other => {
                log::trace!("flash: unrecognized opcode 0x{:02X}", other);
                Decoder::Ignored
            }
        }
    }

    fn status(&self, now_us: u64) -> Status {
        let mut status = Status::empty();
        if self.is_busy(now_us) {
            status |= Status::WIP;
        }
        if self.wel {
            status |= Status::WEL;
        }
        status
    }
}
