//! Hardware events and the VM messages built from them.
//!
//! The hardware driver raises [`ReaderEvent`]s on its own task.  Each one
//! becomes exactly one message for the receiver process:
//!
//! | Event            | Message                                   |
//! |------------------|-------------------------------------------|
//! | `TagRequested`   | `{rc522_request, []}`                     |
//! | `TagScanned(r)`  | `{rc522_reading, #{serial_number => ..}}` |

use serde::{Deserialize, Serialize};

use crate::term::{atoms, Term};

/// A single tag scan, as reported by the hardware driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagReading {
    pub serial_number: u64,
    pub read_data: u64,
    pub write_data: u64,
    pub write_mode: bool,
}

impl TagReading {
    /// The reading as a four-entry map; 64-bit fields are 8-byte lists,
    /// least-significant byte first.
    pub fn to_term(&self) -> Term {
        Term::Map(vec![
            (Term::Atom(atoms::SERIAL_NUMBER), Term::le_bytes(self.serial_number)),
            (Term::Atom(atoms::READ_DATA), Term::le_bytes(self.read_data)),
            (Term::Atom(atoms::WRITE_DATA), Term::le_bytes(self.write_data)),
            (Term::Atom(atoms::WRITE_MODE), Term::boolean(self.write_mode)),
        ])
    }

    /// Decode a reading map produced by [`to_term`](Self::to_term).
    pub fn from_term(term: &Term) -> Option<Self> {
        let field = |key| term.map_get(&Term::Atom(key));
        let write_mode = match field(atoms::WRITE_MODE)? {
            t if t.is_atom(&atoms::TRUE) => true,
            t if t.is_atom(&atoms::FALSE) => false,
            _ => return None,
        };
        Some(Self {
            serial_number: field(atoms::SERIAL_NUMBER)?.to_le_u64()?,
            read_data: field(atoms::READ_DATA)?.to_le_u64()?,
            write_data: field(atoms::WRITE_DATA)?.to_le_u64()?,
            write_mode,
        })
    }
}

/// Events raised by the hardware driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A tag entered the field and the reader is about to scan it.
    TagRequested,
    /// A tag was scanned.
    TagScanned(TagReading),
}

impl ReaderEvent {
    /// The message delivered to the receiver for this event.
    pub fn to_message(&self) -> Term {
        match self {
            Self::TagRequested => Term::tuple2(Term::Atom(atoms::RC522_REQUEST), Term::nil()),
            Self::TagScanned(reading) => {
                Term::tuple2(Term::Atom(atoms::RC522_READING), reading.to_term())
            }
        }
    }
}

/// A message the port delivers to its receiver, decoded.  This is the
/// receiver-side view of [`ReaderEvent::to_message`] plus the memory
/// pressure signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortMessage {
    TagRequested,
    Reading(TagReading),
    /// The port could not allocate an event message.
    OutOfMemory,
    /// Not a port message.
    Other(Term),
}

impl PortMessage {
    pub fn from_term(msg: &Term) -> Self {
        if msg.is_atom(&atoms::OUT_OF_MEMORY) {
            return Self::OutOfMemory;
        }
        match msg.as_tuple() {
            Some([tag, payload]) if tag.is_atom(&atoms::RC522_REQUEST) && payload == &Term::nil() => {
                Self::TagRequested
            }
            Some([tag, payload]) if tag.is_atom(&atoms::RC522_READING) => {
                TagReading::from_term(payload).map_or_else(|| Self::Other(msg.clone()), Self::Reading)
            }
            _ => Self::Other(msg.clone()),
        }
    }
}
