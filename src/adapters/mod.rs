//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements   | Connects to                     |
//! |----------------|--------------|---------------------------------|
//! | `local_bus`    | MessageBus   | In-process mailboxes            |
//! |                | Inbox        |                                 |
//! | `log_receiver` | (receiver)   | Serial log output               |
//!
//! The reader side (`ReaderBackend` / `ReaderDriver`) lives in
//! [`drivers`](crate::drivers).

pub mod local_bus;
pub mod log_receiver;
