//! Per-transfer state shared by both engines
//!
//! Each blocking call owns one [`Transfer`] on its stack and hands it
//! `&mut` into the vector handlers. Nothing about a transfer is ambient
//! state: no globals for the handlers to race on, and the engines run
//! hardware-free in tests.

/// Direction of an in-flight transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// The master sends bytes to the peer.
    Transmit,
    /// The master clocks bytes in from the peer.
    Receive,
}

/// Caller buffer for one transfer.
pub enum Payload<'b> {
    /// Bytes going out.
    Out(&'b [u8]),
    /// Room for bytes coming in.
    In(&'b mut [u8]),
}

/// Bookkeeping for a single blocking transfer.
///
/// Holds the remaining byte count, the cursor into the caller's buffer, the
/// completion flag only a handler may set, and the I2C
/// acknowledgment-success flag. Created fresh at the start of each
/// `write`/`read` call and dropped when it returns.
pub struct Transfer<'b> {
    payload: Payload<'b>,
    remaining: usize,
    cursor: usize,
    done: bool,
    acked: bool,
}

impl<'b> Transfer<'b> {
    /// Fresh transmit transfer over `data`.
    pub fn transmit(data: &'b [u8]) -> Self {
        Self {
            remaining: data.len(),
            payload: Payload::Out(data),
            cursor: 0,
            done: false,
            acked: false,
        }
    }

    /// Fresh receive transfer into `buf`.
    pub fn receive(buf: &'b mut [u8]) -> Self {
        Self {
            remaining: buf.len(),
            payload: Payload::In(buf),
            cursor: 0,
            done: false,
            acked: false,
        }
    }

    /// Direction of this transfer.
    pub fn direction(&self) -> Direction {
        match self.payload {
            Payload::Out(_) => Direction::Transmit,
            Payload::In(_) => Direction::Receive,
        }
    }

    /// Bytes not yet handled.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Completion flag; set only from a handler.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Whether the peer acknowledged the whole transfer (I2C transmit only;
    /// stays `false` for everything else).
    pub fn is_acked(&self) -> bool {
        self.acked
    }

    /// Mark the transfer complete.
    pub fn finish(&mut self) {
        self.done = true;
    }

    /// Mark the transfer complete and fully acknowledged.
    pub fn finish_acked(&mut self) {
        self.done = true;
        self.acked = true;
    }

    /// Take the next outgoing byte, advancing the cursor and dropping the
    /// remaining count. Handlers check `remaining()` before calling.
    pub fn next_out(&mut self) -> u8 {
        debug_assert!(self.remaining > 0);
        let byte = match self.payload {
            Payload::Out(data) => data[self.cursor],
            Payload::In(_) => 0,
        };
        self.cursor += 1;
        self.remaining -= 1;
        byte
    }

    /// Record an arrived byte at the cursor, advancing and dropping the
    /// remaining count. Handlers check `remaining()` before calling.
    pub fn push_in(&mut self, byte: u8) {
        debug_assert!(self.remaining > 0);
        if let Payload::In(buf) = &mut self.payload {
            buf[self.cursor] = byte;
        }
        self.cursor += 1;
        self.remaining -= 1;
    }
}
