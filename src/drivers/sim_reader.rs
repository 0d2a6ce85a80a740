//! Simulated RC522 reader.
//!
//! Stands in for the hardware driver on the host: tracks driver state
//! in-memory and lets the caller inject tag events through a
//! [`SimReaderHandle`], which invokes the registered handler synchronously
//! on the calling thread (the simulation's "driver task").
//!
//! Failures can be injected at each creation step to exercise the port's
//! cleanup paths.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;

use crate::app::events::{ReaderEvent, TagReading};
use crate::app::ports::{DriverError, EventHandler, ReaderBackend, ReaderDriver};
use crate::config::ReaderConfig;

/// Error code reported by injected failures (`ESP_FAIL`).
const SIM_FAIL: i32 = -1;

/// Creation step to fail on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFailure {
    Create,
    Register,
    Start,
    /// Runtime write-mode commands fail.
    Command,
}

#[derive(Default)]
struct SimState {
    config: Option<ReaderConfig>,
    handler: Option<EventHandler>,
    started: bool,
    destroyed: bool,
    write_key: Option<u8>,
    fail_commands: bool,
}

// ───────────────────────────────────────────────────────────────
// Handle
// ───────────────────────────────────────────────────────────────

/// Test/simulation access to a [`SimReader`].
#[derive(Clone)]
pub struct SimReaderHandle {
    state: Arc<Mutex<SimState>>,
}

impl SimReaderHandle {
    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: ReaderEvent) -> bool {
        let mut state = self.lock();
        if !state.started || state.destroyed {
            return false;
        }
        match state.handler.as_mut() {
            Some(handler) => {
                handler(event);
                true
            }
            None => false,
        }
    }

    /// A tag entered the field.  Returns `false` if the reader is not
    /// scanning.
    pub fn request(&self) -> bool {
        self.emit(ReaderEvent::TagRequested)
    }

    /// A tag was scanned.  Returns `false` if the reader is not scanning.
    pub fn scan(&self, reading: TagReading) -> bool {
        self.emit(ReaderEvent::TagScanned(reading))
    }

    /// Scan a tag with the given serial; the write-mode flag reflects the
    /// reader's current mode.
    pub fn scan_serial(&self, serial_number: u64) -> bool {
        let write_mode = self.write_key().is_some();
        self.scan(TagReading {
            serial_number,
            read_data: 0,
            write_data: 0,
            write_mode,
        })
    }

    /// Key of the active write mode, `None` when in read mode.
    pub fn write_key(&self) -> Option<u8> {
        self.lock().write_key
    }

    pub fn config(&self) -> Option<ReaderConfig> {
        self.lock().config
    }

    pub fn has_handler(&self) -> bool {
        self.lock().handler.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.lock().started
    }

    pub fn is_destroyed(&self) -> bool {
        self.lock().destroyed
    }
}

// ───────────────────────────────────────────────────────────────
// Driver
// ───────────────────────────────────────────────────────────────

/// Simulated driver instance.
pub struct SimReader {
    handle: SimReaderHandle,
    fail: Option<SimFailure>,
}

impl ReaderDriver for SimReader {
    fn register_events(&mut self, handler: EventHandler) -> Result<(), DriverError> {
        if self.fail == Some(SimFailure::Register) {
            return Err(DriverError::Register(SIM_FAIL));
        }
        self.handle.lock().handler = Some(handler);
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        if self.fail == Some(SimFailure::Start) {
            return Err(DriverError::Start(SIM_FAIL));
        }
        self.handle.lock().started = true;
        info!("rc522(sim): scanning");
        Ok(())
    }

    fn enable_write_mode(&mut self, key: u8) -> Result<(), DriverError> {
        let mut state = self.handle.lock();
        if state.fail_commands {
            return Err(DriverError::Command(SIM_FAIL));
        }
        state.write_key = Some(key);
        Ok(())
    }

    fn disable_write_mode(&mut self) -> Result<(), DriverError> {
        let mut state = self.handle.lock();
        if state.fail_commands {
            return Err(DriverError::Command(SIM_FAIL));
        }
        state.write_key = None;
        Ok(())
    }

    fn destroy(self) {
        let mut state = self.handle.lock();
        state.handler = None;
        state.started = false;
        state.destroyed = true;
        info!("rc522(sim): destroyed");
    }
}

// ───────────────────────────────────────────────────────────────
// Backend
// ───────────────────────────────────────────────────────────────

/// Creates [`SimReader`]s and keeps a handle to the last one.
#[derive(Default)]
pub struct SimReaderBackend {
    fail: Option<SimFailure>,
    last: Option<SimReaderHandle>,
}

impl SimReaderBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every driver created from now on fail at `step`.
    pub fn fail_at(step: SimFailure) -> Self {
        Self {
            fail: Some(step),
            last: None,
        }
    }

    /// Handle to the most recently created driver.
    pub fn last_handle(&self) -> Option<SimReaderHandle> {
        self.last.clone()
    }
}

impl ReaderBackend for SimReaderBackend {
    type Driver = SimReader;

    fn create(&mut self, config: &ReaderConfig) -> Result<SimReader, DriverError> {
        if self.fail == Some(SimFailure::Create) {
            return Err(DriverError::Create(SIM_FAIL));
        }
        let handle = SimReaderHandle {
            state: Arc::new(Mutex::new(SimState {
                config: Some(*config),
                fail_commands: self.fail == Some(SimFailure::Command),
                ..SimState::default()
            })),
        };
        self.last = Some(handle.clone());
        info!("rc522(sim): created with {:?}", config.spi);
        Ok(SimReader {
            handle,
            fail: self.fail,
        })
    }
}
