//! RC522 RFID reader port.
//!
//! Bridges an RC522 reader on SPI to a message-passing VM: configuration
//! terms in, tag events out to a receiver process, write-mode and stop
//! requests in with correlated replies.  All ESP-IDF-specific code is
//! guarded by `#[cfg(target_os = "espidf")]` within each module; the rest
//! runs on the host against the simulated reader and the local bus.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
#[cfg(feature = "rfid")]
pub mod driver;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod term;

pub use error::{Error, Result};
