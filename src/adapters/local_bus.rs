//! In-process message bus: a bounded process table with one
//! `embassy-sync` channel per mailbox.
//!
//! Implements [`MessageBus`] for firmware that hosts the port and its
//! receiver as plain tasks, and for host-side tests.  Allocation
//! accounting is per message: a message whose [`Term::heap_size`] exceeds
//! the configured limit fails with [`BusError::OutOfMemory`], which is how
//! the port's out-of-memory fallback is exercised.
//!
//! ```text
//!  send(pid, msg) ──▶ processes[pid] ──▶ Channel<Term, MAILBOX_DEPTH> ──▶ LocalInbox
//! ```

use std::sync::atomic::{AtomicU32, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::FnvIndexMap;
use log::trace;

use crate::app::ports::{BusError, Inbox, MessageBus};
use crate::term::{Pid, Ref, Term};

/// Maximum live processes.  Power of 2 (FnvIndexMap requirement).
pub const MAX_PROCESSES: usize = 16;

/// Messages a mailbox holds before senders see [`BusError::MailboxFull`].
pub const MAILBOX_DEPTH: usize = 16;

/// Default per-message heap limit, in words.  A tag reading needs 62.
pub const DEFAULT_HEAP_WORDS: usize = 256;

type Mailbox = Channel<CriticalSectionRawMutex, Term, MAILBOX_DEPTH>;

// ───────────────────────────────────────────────────────────────
// LocalInbox
// ───────────────────────────────────────────────────────────────

/// Receiving end of a [`LocalBus`] mailbox.
pub struct LocalInbox {
    mailbox: Arc<Mailbox>,
}

impl LocalInbox {
    /// Number of queued messages.
    pub fn len(&self) -> usize {
        self.mailbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mailbox.is_empty()
    }
}

impl Inbox for LocalInbox {
    fn recv(&mut self) -> impl core::future::Future<Output = Term> {
        self.mailbox.receive()
    }

    fn try_recv(&mut self) -> Option<Term> {
        self.mailbox.try_receive().ok()
    }
}

// ───────────────────────────────────────────────────────────────
// LocalBus
// ───────────────────────────────────────────────────────────────

/// Bounded in-process process table.
pub struct LocalBus {
    processes: Mutex<FnvIndexMap<Pid, Arc<Mailbox>, MAX_PROCESSES>>,
    next_pid: AtomicU32,
    next_ref: AtomicU64,
    heap_words: AtomicUsize,
}

impl LocalBus {
    pub fn new() -> Self {
        Self::with_heap_limit(DEFAULT_HEAP_WORDS)
    }

    pub fn with_heap_limit(words: usize) -> Self {
        Self {
            processes: Mutex::new(FnvIndexMap::new()),
            next_pid: AtomicU32::new(1),
            next_ref: AtomicU64::new(1),
            heap_words: AtomicUsize::new(words),
        }
    }

    /// Change the per-message heap limit (memory pressure simulation).
    pub fn set_heap_limit(&self, words: usize) {
        self.heap_words.store(words, Ordering::Relaxed);
    }

    /// Whether `pid` names a live process.
    pub fn is_alive(&self, pid: Pid) -> bool {
        self.table().contains_key(&pid)
    }

    /// Number of live processes.
    pub fn process_count(&self) -> usize {
        self.table().len()
    }

    fn table(&self) -> MutexGuard<'_, FnvIndexMap<Pid, Arc<Mailbox>, MAX_PROCESSES>> {
        self.processes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for LocalBus {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageBus for LocalBus {
    type Inbox = LocalInbox;

    fn spawn_mailbox(&self) -> Result<(Pid, LocalInbox), BusError> {
        let mailbox = Arc::new(Mailbox::new());
        let mut table = self.table();
        // Pids are never reused.
        let pid = Pid(self.next_pid.fetch_add(1, Ordering::Relaxed));
        table
            .insert(pid, mailbox.clone())
            .map_err(|_| BusError::ProcessTableFull)?;
        trace!("bus: spawned {}", pid);
        Ok((pid, LocalInbox { mailbox }))
    }

    fn release(&self, pid: Pid) {
        if self.table().remove(&pid).is_some() {
            trace!("bus: released {}", pid);
        }
    }

    fn send(&self, to: Pid, msg: Term) -> Result<(), BusError> {
        if msg.heap_size() > self.heap_words.load(Ordering::Relaxed) {
            return Err(BusError::OutOfMemory);
        }
        let mailbox = self.table().get(&to).cloned().ok_or(BusError::NoProcess(to))?;
        mailbox.try_send(msg).map_err(|_| BusError::MailboxFull(to))
    }

    fn make_ref(&self) -> Ref {
        Ref(self.next_ref.fetch_add(1, Ordering::Relaxed))
    }
}
