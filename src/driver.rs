//! Port driver entrypoints.
//!
//! What the host firmware calls: [`init`] once at boot, then
//! [`create_port`] (or [`spawn_port`]) for each `open_port` of
//! [`DRIVER_NAME`].

use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::app::ports::{MessageBus, ReaderBackend};
use crate::app::service::RfidPort;
use crate::drivers::task_pin::{spawn_on_core, Core, TaskSpec};
use crate::error::{Error, Result};
use crate::term::{Pid, Term};

/// Name the port is opened by.
pub const DRIVER_NAME: &str = "atomvm_rfid";

/// Placement of the port loop.  The rc522 scan task lives on the PRO core.
pub const PORT_TASK: TaskSpec = TaskSpec {
    core: Core::App,
    priority: 5,
    stack_kb: 8,
    name: "rfid-port\0",
};

/// One-time driver initialisation.
pub fn init() {
    #[cfg(target_os = "espidf")]
    // SAFETY: tag is a static C string.
    unsafe {
        esp_idf_svc::sys::esp_log_level_set(
            c"rc522".as_ptr(),
            esp_idf_svc::sys::esp_log_level_t_ESP_LOG_VERBOSE,
        );
    }
    info!("RFID driver initialized.");
}

/// Create and start a port from the VM options term.  On error nothing is
/// left allocated.
pub fn create_port<B, R>(bus: Arc<B>, backend: &mut R, opts: &Term) -> Result<RfidPort<R::Driver, B>>
where
    B: MessageBus,
    R: ReaderBackend,
{
    let port = RfidPort::create(bus, backend, opts)?;
    info!("{} started.", DRIVER_NAME);
    Ok(port)
}

/// A port running on its own task.
pub struct PortHandle {
    pid: Pid,
    task: JoinHandle<()>,
}

impl PortHandle {
    /// Pid requests are sent to.
    pub fn pid(&self) -> Pid {
        self.pid
    }

    /// Wait for the port to terminate (after `stop`).
    pub fn join(self) {
        if self.task.join().is_err() {
            error!("{}: port task panicked", DRIVER_NAME);
        }
    }
}

/// Create a port and run its loop on a dedicated task.
pub fn spawn_port<B, R>(bus: Arc<B>, backend: &mut R, opts: &Term) -> Result<PortHandle>
where
    B: MessageBus,
    R: ReaderBackend,
    R::Driver: 'static,
{
    let port = create_port(bus, backend, opts)?;
    let pid = port.pid();
    let task = spawn_on_core(PORT_TASK, move || futures_lite::future::block_on(port.run()))
        .map_err(|e| {
            error!("{}: unable to spawn port task: {}", DRIVER_NAME, e);
            Error::Spawn
        })?;
    Ok(PortHandle { pid, task })
}
