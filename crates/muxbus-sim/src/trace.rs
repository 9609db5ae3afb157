//! Timestamped record of everything observable on the simulated bus.
//!
//! Property tests assert ordering ("the stop was issued before the final
//! byte latched") and counts ("the transmit vector fired N+1 times")
//! against this record instead of instrumenting the driver.

use muxbus_core::usci::{BusMode, Vector};

/// One observable action on the simulated bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    /// The unit was reconfigured for a protocol.
    Configured(BusMode),
    /// A start condition was latched by software.
    StartIssued,
    /// The address byte finished clocking.
    AddressSent {
        /// 7-bit address that went on the wire.
        address: u8,
        /// Read (`true`) or write transaction.
        read: bool,
        /// Whether a slave acknowledged.
        acked: bool,
    },
    /// A stop condition was latched by software.
    StopIssued,
    /// The stop condition finished on the wire.
    StopCompleted,
    /// An enabled interrupt source was delivered to software.
    VectorRaised(Vector),
    /// A byte finished clocking out.
    TxByte(u8),
    /// A byte latched into the receive register.
    RxByte(u8),
    /// The flash chip-select line changed; `true` selects.
    ChipSelect(bool),
}

/// Append-only event log with virtual timestamps.
#[derive(Debug, Default)]
pub struct Trace {
    events: Vec<(u64, TraceEvent)>,
}

impl Trace {
    /// Empty trace.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, at_us: u64, event: TraceEvent) {
        self.events.push((at_us, event));
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> &[(u64, TraceEvent)] {
        &self.events
    }

    /// Index of the first event matching `pred`.
    pub fn position(&self, pred: impl Fn(&TraceEvent) -> bool) -> Option<usize> {
        self.events.iter().position(|(_, event)| pred(event))
    }

    /// Indices of every event matching `pred`.
    pub fn positions(&self, pred: impl Fn(&TraceEvent) -> bool) -> Vec<usize> {
        self.events
            .iter()
            .enumerate()
            .filter(|(_, (_, event))| pred(event))
            .map(|(index, _)| index)
            .collect()
    }

    /// How many events match `pred`.
    pub fn count(&self, pred: impl Fn(&TraceEvent) -> bool) -> usize {
        self.events.iter().filter(|(_, event)| pred(event)).count()
    }

    /// Timestamp of the event at `index`.
    pub fn at(&self, index: usize) -> u64 {
        self.events[index].0
    }

    /// Forget everything recorded so far.
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
