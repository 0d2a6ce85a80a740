//! Port configuration.
//!
//! The port is configured once, at creation, from the options term the VM
//! hands to `create_port`:
//!
//! ```text
//! #{receiver => Pid,
//!   config   => #{miso_gpio => 19, mosi_gpio => 23, sck_gpio => 18, sda_gpio => 5}}
//! ```
//!
//! Every pin is optional and falls back to the board wiring in
//! [`pins`](crate::pins).  A pin that is present but not an integer is
//! logged and replaced by [`INVALID_GPIO`](crate::pins::INVALID_GPIO), which
//! goes to the hardware driver unchanged.

use core::fmt;

use log::error;
use serde::{Deserialize, Serialize};

use crate::pins;
use crate::term::{atoms, Atom, Pid, Term};

/// SPI host peripheral the reader is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpiHost {
    /// SPI2.
    Hspi,
    /// SPI3.
    Vspi,
}

/// GPIO assignment of the four SPI lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpiPins {
    pub miso_gpio: i32,
    pub mosi_gpio: i32,
    pub sck_gpio: i32,
    pub sda_gpio: i32,
}

impl Default for SpiPins {
    fn default() -> Self {
        Self {
            miso_gpio: pins::RC522_MISO_GPIO,
            mosi_gpio: pins::RC522_MOSI_GPIO,
            sck_gpio: pins::RC522_SCK_GPIO,
            sda_gpio: pins::RC522_SDA_GPIO,
        }
    }
}

/// Everything the hardware driver needs to come up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReaderConfig {
    pub host: SpiHost,
    pub spi: SpiPins,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            host: SpiHost::Vspi,
            spi: SpiPins::default(),
        }
    }
}

impl ReaderConfig {
    /// Build the reader configuration from the `config` sub-map.  `None`
    /// (key absent) yields the defaults.
    pub fn from_term(config: Option<&Term>) -> Self {
        let Some(config) = config else {
            return Self::default();
        };
        let defaults = SpiPins::default();
        Self {
            host: SpiHost::Vspi,
            spi: SpiPins {
                miso_gpio: integer_value(config, atoms::MISO_GPIO, defaults.miso_gpio),
                mosi_gpio: integer_value(config, atoms::MOSI_GPIO, defaults.mosi_gpio),
                sck_gpio: integer_value(config, atoms::SCK_GPIO, defaults.sck_gpio),
                sda_gpio: integer_value(config, atoms::SDA_GPIO, defaults.sda_gpio),
            },
        }
    }
}

fn integer_value(config: &Term, key: Atom, default: i32) -> i32 {
    let name = key.as_str().to_owned();
    match config.option(&Term::Atom(key)) {
        None => default,
        Some(Term::Int(value)) => i32::try_from(*value).unwrap_or_else(|_| {
            error!("Invalid integer value for {}: {} out of range", name, value);
            pins::INVALID_GPIO
        }),
        Some(other) => {
            error!("Invalid integer value for {}: {}", name, other);
            pins::INVALID_GPIO
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Port options
// ───────────────────────────────────────────────────────────────

/// Parsed `create_port` options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortOptions {
    /// Process that receives tag events.
    pub receiver: Pid,
    pub reader: ReaderConfig,
}

impl PortOptions {
    /// Parse the options term.  Accepts a map or a proplist.
    pub fn from_term(opts: &Term) -> Result<Self, ConfigError> {
        let receiver = match opts.option(&Term::Atom(atoms::RECEIVER)) {
            None => return Err(ConfigError::MissingReceiver),
            Some(term) => term.as_pid().ok_or(ConfigError::InvalidReceiver)?,
        };
        let reader = ReaderConfig::from_term(opts.option(&Term::Atom(atoms::CONFIG)));
        Ok(Self { receiver, reader })
    }
}

/// Errors from [`PortOptions::from_term`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No `receiver` option.
    MissingReceiver,
    /// `receiver` is not a local pid.
    InvalidReceiver,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingReceiver => write!(f, "missing receiver option"),
            Self::InvalidReceiver => write!(f, "receiver is not a local pid"),
        }
    }
}
