//! Caller side of the port protocol.
//!
//! A [`PortClient`] is a process that talks to a port: it wraps each
//! request in `{Self, Ref, Request}` and picks the matching `{Ref, Result}`
//! out of its mailbox, stashing anything else for later.

use std::collections::VecDeque;
use std::sync::Arc;

use super::commands::RequestEnvelope;
use super::ports::{BusError, Inbox, MessageBus};
use crate::term::{atoms, Pid, Ref, Term};

pub struct PortClient<B: MessageBus> {
    bus: Arc<B>,
    pid: Pid,
    inbox: B::Inbox,
    stash: VecDeque<Term>,
}

impl<B: MessageBus> PortClient<B> {
    /// Spawn a client process on `bus`.
    pub fn spawn(bus: Arc<B>) -> Result<Self, BusError> {
        let (pid, inbox) = bus.spawn_mailbox()?;
        Ok(Self {
            bus,
            pid,
            inbox,
            stash: VecDeque::new(),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Send `request` to `port` without waiting.
    pub fn send_request(&self, port: Pid, request: Term) -> Result<Ref, BusError> {
        let reference = self.bus.make_ref();
        self.bus
            .send(port, RequestEnvelope::to_term(self.pid, reference, request))?;
        Ok(reference)
    }

    /// Reply to `reference` if it has arrived.  An `out_of_memory` signal
    /// counts as the reply: the port sends it in place of one.
    ///
    /// The signal carries no ref, so it answers whichever call looks first.
    /// With several requests in flight, or when this client is also the
    /// event receiver and an event could not be allocated, it may be
    /// attributed to the wrong call.  Keep one request outstanding per
    /// client where that matters.
    pub fn take_reply(&mut self, reference: Ref) -> Option<Term> {
        while let Some(msg) = self.inbox.try_recv() {
            self.stash.push_back(msg);
        }
        let at = self.stash.iter().position(|m| is_reply_to(m, reference))?;
        self.stash.remove(at).map(reply_result)
    }

    /// Send `request` to `port` and wait for its reply.
    pub async fn call(&mut self, port: Pid, request: Term) -> Result<Term, BusError> {
        let reference = self.send_request(port, request)?;
        if let Some(result) = self.take_reply(reference) {
            return Ok(result);
        }
        loop {
            let msg = self.inbox.recv().await;
            if is_reply_to(&msg, reference) {
                return Ok(reply_result(msg));
            }
            self.stash.push_back(msg);
        }
    }

    /// Next non-reply message (tag events when the client is also the
    /// receiver).
    pub fn next_message(&mut self) -> Option<Term> {
        self.stash.pop_front().or_else(|| self.inbox.try_recv())
    }

    /// Release the client's process.
    pub fn exit(self) {
        self.bus.release(self.pid);
    }
}

fn is_reply_to(msg: &Term, reference: Ref) -> bool {
    if msg.is_atom(&atoms::OUT_OF_MEMORY) {
        return true;
    }
    matches!(msg.as_tuple(), Some([r, _]) if r.as_reference() == Some(reference))
}

fn reply_result(msg: Term) -> Term {
    match msg {
        Term::Tuple(mut items) if items.len() == 2 => items.swap_remove(1),
        other => other,
    }
}
