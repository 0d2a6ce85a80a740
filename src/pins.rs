//! Default SPI pin assignments for the RC522 reader on the ESP32 DevKit.
//!
//! Single source of truth for the wiring the port falls back to when the
//! options term leaves a pin out.  The reader sits on the VSPI host.

// ---------------------------------------------------------------------------
// RC522 on VSPI
// ---------------------------------------------------------------------------

/// MISO (reader → ESP32).
pub const RC522_MISO_GPIO: i32 = 19;
/// MOSI (ESP32 → reader).
pub const RC522_MOSI_GPIO: i32 = 23;
/// SPI clock.
pub const RC522_SCK_GPIO: i32 = 18;
/// SDA / chip select.
pub const RC522_SDA_GPIO: i32 = 5;

/// Substituted for a pin whose configured value is not an integer.  Passed
/// to the hardware driver as is; ESP-IDF reads it as "not connected".
pub const INVALID_GPIO: i32 = -1;
