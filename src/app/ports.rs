//! Port traits — the hexagonal boundary between the port core and the outside world.
//!
//! ```text
//!   ReaderBackend ──▶ ReaderDriver ──▶ RfidPort ──▶ MessageBus
//!   (rc522 / sim)     (hardware)       (core)       (VM mailboxes)
//! ```
//!
//! Two collaborators sit outside this crate: the RC522 hardware driver
//! library and the VM's process/mailbox primitives.  The core reaches both
//! only through these traits, so it is fully testable on the host.

use core::fmt;
use core::future::Future;

use crate::app::events::ReaderEvent;
use crate::config::ReaderConfig;
use crate::term::{Pid, Ref, Term};

// ───────────────────────────────────────────────────────────────
// Hardware driver port (driven adapter: port ↔ RC522 library)
// ───────────────────────────────────────────────────────────────

/// Callback the hardware driver invokes, on its own task, for every event.
pub type EventHandler = Box<dyn FnMut(ReaderEvent) + Send + 'static>;

/// Factory for hardware driver instances.
pub trait ReaderBackend {
    type Driver: ReaderDriver;

    /// Create (but do not start) a driver bound to `config`'s pins.
    fn create(&mut self, config: &ReaderConfig) -> Result<Self::Driver, DriverError>;
}

/// A live hardware driver instance.
///
/// Only the port's own request loop calls these methods; the event
/// handler never touches the driver.
pub trait ReaderDriver: Send {
    /// Install the event handler.  Called once, before [`start`](Self::start).
    fn register_events(&mut self, handler: EventHandler) -> Result<(), DriverError>;

    /// Begin scanning.
    fn start(&mut self) -> Result<(), DriverError>;

    /// Put the reader in write mode, authenticating with `key`.
    fn enable_write_mode(&mut self, key: u8) -> Result<(), DriverError>;

    /// Leave write mode.  Succeeds whatever the current mode.
    fn disable_write_mode(&mut self) -> Result<(), DriverError>;

    /// Stop scanning and release the peripheral.  The handler is dropped.
    fn destroy(self)
    where
        Self: Sized;
}

// ───────────────────────────────────────────────────────────────
// Message bus port (driven adapter: port ↔ VM process table)
// ───────────────────────────────────────────────────────────────

/// Receiving end of a process mailbox.
pub trait Inbox {
    /// Wait for the next message.
    fn recv(&mut self) -> impl Future<Output = Term>;

    /// Take the next message if one is queued.
    fn try_recv(&mut self) -> Option<Term>;
}

/// The VM's process table, as far as the port needs it.
///
/// `send` copies the message into the target's heap; it fails with
/// [`BusError::OutOfMemory`] when that allocation cannot be made.
/// Implementations must be callable from the hardware driver's event task
/// and the port loop at the same time.
pub trait MessageBus: Send + Sync + 'static {
    type Inbox: Inbox + Send + 'static;

    /// Allocate a new process context and return its pid and mailbox.
    fn spawn_mailbox(&self) -> Result<(Pid, Self::Inbox), BusError>;

    /// Release a process context.  Unknown pids are ignored.
    fn release(&self, pid: Pid);

    /// Deliver `msg` to `to`.
    fn send(&self, to: Pid, msg: Term) -> Result<(), BusError>;

    /// Mint a fresh reference.
    fn make_ref(&self) -> Ref;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ReaderBackend`] / [`ReaderDriver`].  Codes are the
/// driver library's `esp_err_t` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverError {
    /// Driver instance could not be created.
    Create(i32),
    /// Event handler registration failed.
    Register(i32),
    /// Scanning could not be started.
    Start(i32),
    /// A runtime command (write mode on/off) failed.
    Command(i32),
}

/// Errors from [`MessageBus`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The message could not be allocated on the target's heap.
    OutOfMemory,
    /// No live process has this pid.
    NoProcess(Pid),
    /// The target's mailbox is at capacity.
    MailboxFull(Pid),
    /// No free slot for a new process.
    ProcessTableFull,
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(rc) => write!(f, "rc522 create failed (rc={})", rc),
            Self::Register(rc) => write!(f, "rc522 event registration failed (rc={})", rc),
            Self::Start(rc) => write!(f, "rc522 start failed (rc={})", rc),
            Self::Command(rc) => write!(f, "rc522 command failed (rc={})", rc),
        }
    }
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::NoProcess(pid) => write!(f, "no process {}", pid),
            Self::MailboxFull(pid) => write!(f, "mailbox of {} full", pid),
            Self::ProcessTableFull => write!(f, "process table full"),
        }
    }
}
