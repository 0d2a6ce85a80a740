//! Port core: request handling and event translation, zero I/O.
//!
//! All interaction with the reader hardware and the VM happens through
//! the **port traits** defined in [`ports`], keeping this layer fully
//! testable without a reader or a VM.

pub mod client;
pub mod commands;
pub mod delivery;
pub mod events;
pub mod ports;
pub mod service;
