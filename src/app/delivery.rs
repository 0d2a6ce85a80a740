//! Event delivery from the hardware driver's task to the receiver process.
//!
//! The driver calls the handler on its own task, concurrently with the
//! port loop.  The handler therefore owns nothing but the bus, the
//! receiver pid and a [`DeliveryGate`]; it never touches the driver.
//!
//! ```text
//!  rc522 task                       port loop
//!  ──────────                       ─────────
//!  event ─▶ gate.pass(|| send)      stop ─▶ gate.close() ─▶ driver.destroy()
//!               │                               │
//!               └── holds read side ◀── waits ──┘
//! ```
//!
//! Closing the gate waits for any delivery in flight, so once
//! [`DeliveryGate::close`] returns no message can reach the receiver from a
//! driver that is being torn down.

use std::sync::{Arc, PoisonError, RwLock};

use log::{trace, warn};

use super::events::ReaderEvent;
use super::ports::{BusError, EventHandler, MessageBus};
use crate::term::{atoms, Pid, Term};

// ───────────────────────────────────────────────────────────────
// DeliveryGate
// ───────────────────────────────────────────────────────────────

/// Fence between event delivery and driver teardown.
#[derive(Debug, Clone)]
pub struct DeliveryGate {
    open: Arc<RwLock<bool>>,
}

impl DeliveryGate {
    pub fn new() -> Self {
        Self {
            open: Arc::new(RwLock::new(true)),
        }
    }

    /// Run `deliver` if the gate is open, keeping it open until `deliver`
    /// returns.  Returns whether it ran.
    pub fn pass(&self, deliver: impl FnOnce()) -> bool {
        let open = self.open.read().unwrap_or_else(PoisonError::into_inner);
        if *open {
            deliver();
        }
        *open
    }

    /// Close the gate, waiting for in-flight deliveries.  Idempotent.
    pub fn close(&self) {
        *self.open.write().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_open(&self) -> bool {
        *self.open.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for DeliveryGate {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Sending with the out-of-memory fallback
// ───────────────────────────────────────────────────────────────

/// Send `msg` to `to`.  When the message cannot be allocated, `to` gets the
/// bare `out_of_memory` atom instead.  Other failures drop the message.
pub fn send_or_signal<B: MessageBus + ?Sized>(bus: &B, to: Pid, msg: Term) {
    match bus.send(to, msg) {
        Ok(()) => {}
        Err(BusError::OutOfMemory) => {
            warn!("out of memory building message for {}", to);
            if let Err(e) = bus.send(to, Term::Atom(atoms::OUT_OF_MEMORY)) {
                warn!("could not signal out_of_memory to {}: {}", to, e);
            }
        }
        Err(e) => warn!("dropping message for {}: {}", to, e),
    }
}

// ───────────────────────────────────────────────────────────────
// EventForwarder
// ───────────────────────────────────────────────────────────────

/// Turns hardware events into receiver messages.
pub struct EventForwarder<B: MessageBus> {
    bus: Arc<B>,
    receiver: Pid,
    gate: DeliveryGate,
}

impl<B: MessageBus> EventForwarder<B> {
    pub fn new(bus: Arc<B>, receiver: Pid, gate: DeliveryGate) -> Self {
        Self { bus, receiver, gate }
    }

    /// Deliver one event.  Returns `false` if the gate was already closed
    /// and the event was dropped.
    pub fn forward(&self, event: ReaderEvent) -> bool {
        self.gate.pass(|| {
            trace!("rc522 event {:?} -> {}", event, self.receiver);
            send_or_signal(self.bus.as_ref(), self.receiver, event.to_message());
        })
    }

    /// Box the forwarder as a driver callback.
    pub fn into_handler(self) -> EventHandler {
        Box::new(move |event| {
            self.forward(event);
        })
    }
}
