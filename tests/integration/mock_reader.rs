//! Mock reader adapter and fixtures for integration tests.
//!
//! Records every driver call so tests can assert on the full call history,
//! and keeps the event handler alive after `destroy` so a late event from
//! the driver task can be replayed against a stopped port.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, Once, PoisonError};
use std::thread::{self, ThreadId};

use log::{Level, LevelFilter, Log, Metadata, Record};

use rfid_port::adapters::local_bus::{LocalBus, LocalInbox};
use rfid_port::app::commands::RequestEnvelope;
use rfid_port::app::events::ReaderEvent;
use rfid_port::app::ports::{DriverError, EventHandler, Inbox, MessageBus, ReaderBackend, ReaderDriver};
use rfid_port::config::ReaderConfig;
use rfid_port::term::{atoms, Pid, Ref, Term};

/// `ESP_FAIL`
const MOCK_FAIL: i32 = -1;

// ── Driver call record ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverCall {
    Create,
    RegisterEvents,
    Start,
    EnableWrite(u8),
    DisableWrite,
    Destroy,
}

#[derive(Default)]
struct Shared {
    calls: Vec<DriverCall>,
    config: Option<ReaderConfig>,
    handler: Option<EventHandler>,
}

// ── MockReaderBackend ─────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockReaderBackend {
    shared: Arc<Mutex<Shared>>,
    fail: Option<DriverCall>,
}

#[allow(dead_code)]
impl MockReaderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call of the same kind as `step` fails.
    pub fn failing_at(step: DriverCall) -> Self {
        Self {
            fail: Some(step),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn config(&self) -> Option<ReaderConfig> {
        self.lock().config
    }

    /// Invoke the registered handler as the driver task would, whether or
    /// not the driver has been destroyed.  `false` if none was registered.
    pub fn fire(&self, event: ReaderEvent) -> bool {
        let Some(mut handler) = self.lock().handler.take() else {
            return false;
        };
        handler(event);
        self.lock().handler = Some(handler);
        true
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: DriverCall) -> Result<(), i32> {
        self.lock().calls.push(call);
        match self.fail {
            Some(step) if mem::discriminant(&step) == mem::discriminant(&call) => Err(MOCK_FAIL),
            _ => Ok(()),
        }
    }
}

impl ReaderBackend for MockReaderBackend {
    type Driver = MockReader;

    fn create(&mut self, config: &ReaderConfig) -> Result<MockReader, DriverError> {
        self.record(DriverCall::Create).map_err(DriverError::Create)?;
        self.lock().config = Some(*config);
        Ok(MockReader { backend: self.clone() })
    }
}

// ── MockReader ────────────────────────────────────────────────

pub struct MockReader {
    backend: MockReaderBackend,
}

impl ReaderDriver for MockReader {
    fn register_events(&mut self, handler: EventHandler) -> Result<(), DriverError> {
        self.backend
            .record(DriverCall::RegisterEvents)
            .map_err(DriverError::Register)?;
        self.backend.lock().handler = Some(handler);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        self.backend.record(DriverCall::Start).map_err(DriverError::Start)
    }

    fn enable_write_mode(&mut self, key: u8) -> Result<(), DriverError> {
        self.backend
            .record(DriverCall::EnableWrite(key))
            .map_err(DriverError::Command)
    }

    fn disable_write_mode(&mut self) -> Result<(), DriverError> {
        self.backend
            .record(DriverCall::DisableWrite)
            .map_err(DriverError::Command)
    }

    fn destroy(self) {
        // Destroy never fails; the handler is kept for late-event replay.
        let _ = self.backend.record(DriverCall::Destroy);
    }
}

// ── Fixtures ──────────────────────────────────────────────────

/// A bus with one receiver process already spawned.
pub fn bus_with_receiver() -> (Arc<LocalBus>, Pid, LocalInbox) {
    let bus = Arc::new(LocalBus::new());
    let (receiver, inbox) = bus.spawn_mailbox().unwrap();
    (bus, receiver, inbox)
}

/// `#{receiver => Receiver}`, every pin at its default.
pub fn port_options(receiver: Pid) -> Term {
    Term::Map(vec![(Term::Atom(atoms::RECEIVER), Term::Pid(receiver))])
}

/// Post `{Caller, Ref, Request}` to `port` and return the ref.
pub fn post(bus: &LocalBus, port: Pid, caller: Pid, request: Term) -> Ref {
    let reference = bus.make_ref();
    bus.send(port, RequestEnvelope::to_term(caller, reference, request))
        .unwrap();
    reference
}

/// Next message in `inbox`, decoded as `{Ref, Result}`.
pub fn reply(inbox: &mut LocalInbox) -> Option<(Ref, Term)> {
    match inbox.try_recv()? {
        Term::Tuple(items) => match items.as_slice() {
            [Term::Ref(r), result] => Some((*r, result.clone())),
            _ => None,
        },
        _ => None,
    }
}

pub fn enable_write(key: i64) -> Term {
    Term::tuple2(Term::Atom(atoms::ENABLE_WRITE), Term::Int(key))
}

// ── Log capture ───────────────────────────────────────────────

/// Records every log line together with the thread that emitted it, so
/// tests running in parallel only see their own output.
struct CaptureLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((thread::current().id(), record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

/// Start capturing log output.  Idempotent.
pub fn capture_logs() {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Error-level lines logged so far by the calling thread.
#[allow(dead_code)]
pub fn errors_logged_here() -> Vec<String> {
    let me = thread::current().id();
    LOGGER
        .records
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .filter(|(thread, level, _)| *thread == me && *level == Level::Error)
        .map(|(_, _, line)| line.clone())
        .collect()
}
