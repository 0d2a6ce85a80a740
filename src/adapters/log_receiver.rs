//! Log-based receiver process.
//!
//! Drains a receiver mailbox and writes every tag event to the logger
//! (UART / USB-CDC in production).  Readings are rendered as JSON so they
//! can be scraped off the serial console.

use log::{info, warn};

use crate::app::events::PortMessage;
use crate::app::ports::Inbox;
use crate::term::Term;

/// Receiver that logs every message it gets.
pub struct LogReceiver<I: Inbox> {
    inbox: I,
    readings: u64,
}

impl<I: Inbox> LogReceiver<I> {
    pub fn new(inbox: I) -> Self {
        Self { inbox, readings: 0 }
    }

    /// Log one message.
    pub fn handle(&mut self, msg: &Term) {
        match PortMessage::from_term(msg) {
            PortMessage::TagRequested => info!("RFID | tag requested"),
            PortMessage::Reading(reading) => {
                self.readings += 1;
                match serde_json::to_string(&reading) {
                    Ok(json) => info!("RFID | reading #{} {}", self.readings, json),
                    Err(_) => info!("RFID | reading #{} {:?}", self.readings, reading),
                }
            }
            PortMessage::OutOfMemory => warn!("RFID | port out of memory, event dropped"),
            PortMessage::Other(term) => info!("RFID | {}", term),
        }
    }

    /// Readings seen so far.
    pub fn readings(&self) -> u64 {
        self.readings
    }

    /// Log messages forever.
    pub async fn run(mut self) {
        loop {
            let msg = self.inbox.recv().await;
            self.handle(&msg);
        }
    }
}
