//! RC522 hardware driver: FFI to the ESP-IDF `rc522` component.
//!
//! The component owns the SPI transaction timing, the RC522 register
//! protocol, anti-collision and MIFARE authentication, and runs its own
//! scan task.  This module only marshals: [`ReaderConfig`] into the
//! component's config, its `esp_event` callbacks into [`ReaderEvent`]s, and
//! [`ReaderDriver`] calls into component calls.
//!
//! All component types and calls come from the bindings `esp-idf-sys`
//! generates from `rc522.h` (module `esp_idf_sys::rc522`).  The config
//! union and the event enum are reached through the `rfid_port_glue`
//! component, which is compiled against the same header.
//!
//! ## Handler lifetime
//!
//! The boxed [`EventHandler`] is leaked into the component as the event
//! handler argument and reclaimed in `Drop`, after `rc522_destroy` has
//! stopped the scan task and unregistered the handler.

use core::ffi::{c_int, c_void};
use core::ptr;

use esp_idf_sys::rc522::{
    esp_err_t, esp_event_base_t, rc522_destroy, rc522_disable_write_mode,
    rc522_enable_write_mode, rc522_handle_t, rc522_start, rfid_port_event_kind,
    rfid_port_event_tag, rfid_port_rc522_create, rfid_port_rc522_register,
    RFID_PORT_EVENT_TAG_REQUESTED, RFID_PORT_EVENT_TAG_SCANNED, RFID_PORT_SPI_HOST_HSPI,
    RFID_PORT_SPI_HOST_VSPI,
};
use log::{info, warn};

use crate::app::events::{ReaderEvent, TagReading};
use crate::app::ports::{DriverError, EventHandler, ReaderBackend, ReaderDriver};
use crate::config::{ReaderConfig, SpiHost};

fn check(rc: esp_err_t, wrap: fn(i32) -> DriverError) -> Result<(), DriverError> {
    if rc == esp_idf_sys::ESP_OK as esp_err_t {
        Ok(())
    } else {
        Err(wrap(rc))
    }
}

// ── Event trampoline ──────────────────────────────────────────

/// Runs on the component's scan task.
unsafe extern "C" fn on_rc522_event(
    arg: *mut c_void,
    _base: esp_event_base_t,
    id: i32,
    data: *mut c_void,
) {
    // SAFETY: pure mapping of the event id.
    let kind = unsafe { rfid_port_event_kind(id) } as u32;
    let event = match kind {
        RFID_PORT_EVENT_TAG_REQUESTED => ReaderEvent::TagRequested,
        RFID_PORT_EVENT_TAG_SCANNED => {
            // SAFETY: for TAG_SCANNED the component passes event data whose
            // tag stays valid for the duration of the callback.
            let Some(tag) = (unsafe { rfid_port_event_tag(data).as_ref() }) else {
                return;
            };
            ReaderEvent::TagScanned(TagReading {
                serial_number: tag.serial_number,
                read_data: tag.read_data,
                write_data: tag.write_data,
                write_mode: tag.write_mode,
            })
        }
        _ => return,
    };

    // SAFETY: `arg` is the Box<EventHandler> leaked in `register_events`.
    // It is only reclaimed after rc522_destroy, which joins the scan task,
    // and the scan task is the only caller of this function.
    let handler = unsafe { &mut *arg.cast::<EventHandler>() };
    handler(event);
}

// ── Driver ────────────────────────────────────────────────────

/// A live `rc522` component instance.
pub struct Rc522Driver {
    handle: rc522_handle_t,
    handler: *mut EventHandler,
}

// SAFETY: the component handle is an opaque pointer the component
// synchronises internally; the handler box is only touched by the scan
// task (through the trampoline) and by Drop after the task is gone.
unsafe impl Send for Rc522Driver {}

impl ReaderDriver for Rc522Driver {
    fn register_events(&mut self, handler: EventHandler) -> Result<(), DriverError> {
        let arg = Box::into_raw(Box::new(handler));
        // SAFETY: handle is live; arg stays valid until Drop.
        let rc = unsafe { rfid_port_rc522_register(self.handle, Some(on_rc522_event), arg.cast()) };
        if let Err(e) = check(rc, DriverError::Register) {
            // SAFETY: registration failed, so the component holds no copy.
            drop(unsafe { Box::from_raw(arg) });
            return Err(e);
        }
        self.handler = arg;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DriverError> {
        // SAFETY: handle is live.
        check(unsafe { rc522_start(self.handle) }, DriverError::Start)
    }

    fn enable_write_mode(&mut self, key: u8) -> Result<(), DriverError> {
        log::trace!("rc522: enable write mode");
        // SAFETY: handle is live.
        check(unsafe { rc522_enable_write_mode(self.handle, key) }, DriverError::Command)
    }

    fn disable_write_mode(&mut self) -> Result<(), DriverError> {
        log::trace!("rc522: disable write mode");
        // SAFETY: handle is live.
        check(unsafe { rc522_disable_write_mode(self.handle) }, DriverError::Command)
    }

    fn destroy(self) {
        drop(self);
    }
}

impl Drop for Rc522Driver {
    fn drop(&mut self) {
        // SAFETY: handle is live and not used again.
        let rc = unsafe { rc522_destroy(self.handle) };
        if rc != esp_idf_sys::ESP_OK as esp_err_t {
            warn!("rc522: destroy returned {}", rc);
        }
        if !self.handler.is_null() {
            // SAFETY: the scan task is stopped; nothing else references the box.
            drop(unsafe { Box::from_raw(self.handler) });
            self.handler = ptr::null_mut();
        }
        info!("rc522: destroyed");
    }
}

// ── Backend ───────────────────────────────────────────────────

/// Creates `rc522` component instances.  Pins are passed through as
/// configured, the `-1` sentinel included.
pub struct Rc522Backend;

impl ReaderBackend for Rc522Backend {
    type Driver = Rc522Driver;

    fn create(&mut self, config: &ReaderConfig) -> Result<Rc522Driver, DriverError> {
        let host = match config.host {
            SpiHost::Hspi => RFID_PORT_SPI_HOST_HSPI,
            SpiHost::Vspi => RFID_PORT_SPI_HOST_VSPI,
        } as c_int;

        let mut handle: rc522_handle_t = ptr::null_mut();
        // SAFETY: handle outlives the call.
        let rc = unsafe {
            rfid_port_rc522_create(
                host,
                config.spi.miso_gpio,
                config.spi.mosi_gpio,
                config.spi.sck_gpio,
                config.spi.sda_gpio,
                &mut handle,
            )
        };
        check(rc, DriverError::Create)?;
        if handle.is_null() {
            return Err(DriverError::Create(rc));
        }
        Ok(Rc522Driver {
            handle,
            handler: ptr::null_mut(),
        })
    }
}
