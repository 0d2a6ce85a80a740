//! Core-pinned task spawning for the ESP32 dual-core.
//!
//! The port loop and the receiver run as `std::thread`s, which ESP-IDF
//! implements as FreeRTOS tasks via pthreads.  `esp_pthread_set_cfg()`
//! applies to the *next* `pthread_create()` on the calling thread, so the
//! config→spawn pair must not be interleaved with other thread creation.
//! On non-ESP targets the core and priority are ignored.

use std::io;
use std::thread::JoinHandle;

/// CPU core identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Core {
    /// Core 0 (PRO_CPU): protocol stacks and the rc522 scan task.
    Pro = 0,
    /// Core 1 (APP_CPU): port loop and receivers.
    App = 1,
}

/// Placement of a spawned task.
#[derive(Debug, Clone, Copy)]
pub struct TaskSpec {
    pub core: Core,
    pub priority: u8,
    pub stack_kb: usize,
    /// Null-terminated, e.g. `"rfid-port\0"`.
    pub name: &'static str,
}

impl TaskSpec {
    fn display_name(&self) -> &'static str {
        self.name.trim_end_matches('\0')
    }
}

/// Spawn `f` as a task placed according to `spec`.
#[cfg(target_os = "espidf")]
pub fn spawn_on_core(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    // SAFETY: the config struct is fully initialised by the IDF helper and
    // `name` is null-terminated and 'static.
    let ret = unsafe {
        let mut cfg = esp_idf_svc::sys::esp_create_default_pthread_config();
        cfg.pin_to_core = spec.core as i32;
        cfg.prio = spec.priority as i32;
        cfg.stack_size = (spec.stack_kb * 1024) as i32;
        cfg.thread_name = spec.name.as_ptr() as *const _;
        esp_idf_svc::sys::esp_pthread_set_cfg(&cfg)
    };
    if ret != esp_idf_svc::sys::ESP_OK as i32 {
        return Err(io::Error::other(format!("esp_pthread_set_cfg failed: {ret}")));
    }

    log::info!(
        "Spawning '{}' on {:?} (pri={}, stack={}KB)",
        spec.display_name(),
        spec.core,
        spec.priority,
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .spawn(f)
}

/// Simulation fallback. Ignores core affinity and priority.
#[cfg(not(target_os = "espidf"))]
pub fn spawn_on_core(spec: TaskSpec, f: impl FnOnce() + Send + 'static) -> io::Result<JoinHandle<()>> {
    log::info!(
        "Spawning '{}' (sim, no core pinning, stack={}KB)",
        spec.display_name(),
        spec.stack_kb
    );

    std::thread::Builder::new()
        .name(spec.display_name().into())
        .stack_size(spec.stack_kb * 1024)
        .spawn(f)
}
