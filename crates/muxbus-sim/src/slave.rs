//! Programmable I2C slave for converter-side tests.
//!
//! ACKs its fixed address, hands out scripted response bytes, and can be
//! told to decline the address or to stop acknowledging after a number of
//! data bytes. Received bytes and bus conditions are logged for
//! assertions.

use std::collections::VecDeque;

/// Scriptable single-address I2C slave.
pub struct SimSlave {
    address: u8,
    ack_address: bool,
    nack_after: Option<usize>,
    responses: VecDeque<u8>,
    received: Vec<u8>,
    starts_seen: usize,
    stops_seen: usize,
    accepted_this_transaction: usize,
}

impl SimSlave {
    /// Slave that ACKs `address` and answers reads with idle-high bytes
    /// until given responses.
    pub fn new(address: u8) -> Self {
        Self {
            address,
            ack_address: true,
            nack_after: None,
            responses: VecDeque::new(),
            received: Vec::new(),
            starts_seen: 0,
            stops_seen: 0,
            accepted_this_transaction: 0,
        }
    }

    /// Queue bytes to answer subsequent read transactions with.
    pub fn respond(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    /// Whether to acknowledge the address byte at all.
    pub fn set_ack_address(&mut self, ack: bool) {
        self.ack_address = ack;
    }

    /// Decline the data byte after `count` accepted ones in a
    /// transaction.
    pub fn set_nack_after(&mut self, count: usize) {
        self.nack_after = Some(count);
    }

    /// Every data byte this slave has acknowledged.
    pub fn received(&self) -> &[u8] {
        &self.received
    }

    /// Start conditions addressed to this slave (repeated starts
    /// included).
    pub fn starts_seen(&self) -> usize {
        self.starts_seen
    }

    /// Stop conditions observed.
    pub fn stops_seen(&self) -> usize {
        self.stops_seen
    }

    /// Address byte on the wire; returns the ACK decision.
    pub(crate) fn address_phase(&mut self, address: u8, read: bool) -> bool {
        if address != self.address || !self.ack_address {
            log::trace!("slave: declining address 0x{:02X}", address);
            return false;
        }
        let _ = read;
        self.starts_seen += 1;
        self.accepted_this_transaction = 0;
        true
    }

    /// Data byte written to the slave; returns the ACK decision.
    pub(crate) fn accept(&mut self, byte: u8) -> bool {
        if let Some(limit) = self.nack_after {
            if self.accepted_this_transaction >= limit {
                log::trace!("slave: declining data byte 0x{:02X}", byte);
                return false;
            }
        }
        self.accepted_this_transaction += 1;
        self.received.push(byte);
        true
    }

    /// Data byte for a master read.
    pub(crate) fn produce(&mut self) -> u8 {
        self.responses.pop_front().unwrap_or(0xFF)
    }

    pub(crate) fn stop(&mut self) {
        self.stops_seen += 1;
    }
}
