//! Unified error type for the RFID port.
//!
//! Every fallible step of port creation funnels into [`Error`], so the
//! `create_port` entrypoint has one thing to log and report.  All variants
//! are `Copy`; they cross the event-callback boundary without allocation.

use core::fmt;

use crate::app::ports::{BusError, DriverError};
use crate::config::ConfigError;

/// Every fallible operation in the port funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The options term could not be used.
    Config(ConfigError),
    /// The hardware driver failed to come up.
    Driver(DriverError),
    /// The VM side refused an allocation or delivery.
    Bus(BusError),
    /// The port task could not be spawned.
    Spawn,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Driver(e) => write!(f, "driver: {e}"),
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Spawn => write!(f, "port task spawn failed"),
        }
    }
}

impl std::error::Error for Error {}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
