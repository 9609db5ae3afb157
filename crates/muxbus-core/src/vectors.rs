//! The shared interrupt vector pair and its handler registry
//!
//! Both protocols are serviced through the same two hardware vectors, so
//! whichever engine the bus was last acquired for must own the dispatch.
//! The registry is a slot pair of plain function pointers: binding replaces
//! the previous owner silently, and the mux rebinds both slots on every
//! mode switch.

use crate::transfer::Transfer;
use crate::usci::{SerialUnit, Vector};

/// Handler bound into one vector slot.
pub type Handler<U> = fn(&mut U, &mut Transfer<'_>);

/// Safe default for an unbound slot; dispatching through it does nothing.
fn unbound<U: SerialUnit>(_unit: &mut U, _transfer: &mut Transfer<'_>) {}

/// Routing table for the two hardware vectors shared by both engines.
pub struct VectorTable<U: SerialUnit> {
    tx: Handler<U>,
    rx: Handler<U>,
}

impl<U: SerialUnit> VectorTable<U> {
    /// Table with both slots unbound.
    pub fn new() -> Self {
        Self {
            tx: unbound,
            rx: unbound,
        }
    }

    /// Route the transmit-side vector to `handler`, evicting the previous
    /// binding.
    pub fn bind_tx(&mut self, handler: Handler<U>) {
        self.tx = handler;
    }

    /// Route the receive-side vector to `handler`, evicting the previous
    /// binding.
    pub fn bind_rx(&mut self, handler: Handler<U>) {
        self.rx = handler;
    }

    /// Invoke the handler bound to `vector`.
    pub fn dispatch(&self, vector: Vector, unit: &mut U, transfer: &mut Transfer<'_>) {
        match vector {
            Vector::Transmit => (self.tx)(unit, transfer),
            Vector::Receive => (self.rx)(unit, transfer),
        }
    }
}

impl<U: SerialUnit> Default for VectorTable<U> {
    fn default() -> Self {
        Self::new()
    }
}
