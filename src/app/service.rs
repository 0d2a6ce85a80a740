//! The RFID port — the hexagonal core.
//!
//! [`RfidPort`] owns the hardware driver and its own mailbox.  It is
//! created from the VM options term, forwards hardware events to the
//! receiver through an [`EventForwarder`], and answers requests from its
//! mailbox one at a time.
//!
//! ```text
//!  ReaderDriver ──events──▶ EventForwarder ──▶ receiver
//!       ▲
//!       │ enable/disable/destroy
//!  ┌────┴───────────┐
//!  │    RfidPort     │◀── {Pid, Ref, Request}
//!  │  (port loop)    │──▶ {Ref, ok | error}
//!  └────────────────┘
//! ```

use std::sync::Arc;

use log::{error, info, trace, warn};

use super::commands::{Request, RequestEnvelope};
use super::delivery::{send_or_signal, DeliveryGate, EventForwarder};
use super::ports::{DriverError, Inbox, MessageBus, ReaderBackend, ReaderDriver};
use crate::config::PortOptions;
use crate::error::Result;
use crate::term::{atoms, Atom, Pid, Term};

/// What the port loop does after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Terminate,
}

/// A running RFID port.
pub struct RfidPort<D: ReaderDriver, B: MessageBus> {
    pid: Pid,
    receiver: Pid,
    /// `None` once stopped.
    driver: Option<D>,
    bus: Arc<B>,
    inbox: B::Inbox,
    gate: DeliveryGate,
}

impl<D: ReaderDriver, B: MessageBus> RfidPort<D, B> {
    // ── Lifecycle ─────────────────────────────────────────────

    /// Create and start a port from the VM options term.
    ///
    /// On any failure everything allocated so far (mailbox, driver) is
    /// released before the error is returned.
    pub fn create<R>(bus: Arc<B>, backend: &mut R, opts: &Term) -> Result<Self>
    where
        R: ReaderBackend<Driver = D>,
    {
        let options = PortOptions::from_term(opts).inspect_err(|e| {
            error!("Error: invalid rfid port options: {}", e);
        })?;

        let (pid, inbox) = bus.spawn_mailbox()?;

        let mut driver = match backend.create(&options.reader) {
            Ok(driver) => driver,
            Err(e) => {
                bus.release(pid);
                error!("Error: Unable to initialize rc522 driver: {}", e);
                return Err(e.into());
            }
        };

        let gate = DeliveryGate::new();
        let forwarder = EventForwarder::new(bus.clone(), options.receiver, gate.clone());
        let started = match driver.register_events(forwarder.into_handler()) {
            Ok(()) => driver.start().inspect_err(|e| {
                error!("Error: Unable to start rc522 driver: {}", e);
            }),
            Err(e) => {
                error!("Error: Unable to add rc522 handler: {}", e);
                Err(e)
            }
        };
        if let Err(e) = started {
            gate.close();
            driver.destroy();
            bus.release(pid);
            return Err(e.into());
        }

        info!(
            "rfid port {} started (receiver={}, pins={:?})",
            pid, options.receiver, options.reader.spi
        );

        Ok(Self {
            pid,
            receiver: options.receiver,
            driver: Some(driver),
            bus,
            inbox,
            gate,
        })
    }

    /// Drain the mailbox until a `stop` request terminates the port.
    pub async fn run(mut self) {
        loop {
            let msg = self.inbox.recv().await;
            if self.handle_message(&msg) == Flow::Terminate {
                break;
            }
        }
        info!("rfid port {} terminated", self.pid);
    }

    /// Handle the next queued message, if any.
    pub fn consume_mailbox(&mut self) -> Option<Flow> {
        let msg = self.inbox.try_recv()?;
        Some(self.handle_message(&msg))
    }

    // ── Request handling ──────────────────────────────────────

    /// Handle one raw mailbox message.
    pub fn handle_message(&mut self, msg: &Term) -> Flow {
        match RequestEnvelope::from_term(msg) {
            Some(envelope) => self.handle_request(envelope),
            None => {
                warn!("rfid port {}: dropping malformed message {}", self.pid, msg);
                Flow::Continue
            }
        }
    }

    /// Run a request and reply `{Ref, Result}` to its sender.
    pub fn handle_request(&mut self, envelope: RequestEnvelope) -> Flow {
        trace!("rfid port {}: {:?} from {}", self.pid, envelope.request, envelope.from);

        let (result, flow) = match envelope.request {
            Request::Stop => {
                self.shutdown();
                (atoms::OK, Flow::Terminate)
            }
            Request::DisableWrite => (
                self.with_driver(|driver| driver.disable_write_mode()),
                Flow::Continue,
            ),
            Request::EnableWrite(key) => (
                self.with_driver(|driver| driver.enable_write_mode(key)),
                Flow::Continue,
            ),
            Request::Unknown => (atoms::ERROR, Flow::Continue),
        };

        let reply = Term::tuple2(Term::Ref(envelope.reference), Term::Atom(result));
        send_or_signal(self.bus.as_ref(), envelope.from, reply);
        flow
    }

    fn with_driver(&mut self, call: impl FnOnce(&mut D) -> core::result::Result<(), DriverError>) -> Atom {
        let Some(driver) = self.driver.as_mut() else {
            return atoms::ERROR;
        };
        match call(driver) {
            Ok(()) => atoms::OK,
            Err(e) => {
                warn!("rfid port {}: {}", self.pid, e);
                atoms::ERROR
            }
        }
    }

    /// Fence event delivery, destroy the driver and release the mailbox.
    /// Returns `false` if the port was already stopped.
    fn shutdown(&mut self) -> bool {
        let Some(driver) = self.driver.take() else {
            return false;
        };
        trace!("rfid port {}: stopping", self.pid);
        self.gate.close();
        driver.destroy();
        self.bus.release(self.pid);
        true
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn receiver(&self) -> Pid {
        self.receiver
    }

    pub fn is_running(&self) -> bool {
        self.driver.is_some()
    }
}

impl<D: ReaderDriver, B: MessageBus> Drop for RfidPort<D, B> {
    fn drop(&mut self) {
        if self.shutdown() {
            warn!("rfid port {} dropped without stop", self.pid);
        }
    }
}
