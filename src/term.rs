//! VM term model.
//!
//! The port only ever reads and writes a small slice of the VM's value
//! space: atoms, small integers, lists, tuples, maps, local pids and
//! references.  [`Term`] models exactly that slice, plus the heap cost of
//! each value so a [`MessageBus`](crate::app::ports::MessageBus) can do
//! allocation accounting the way the VM does when a message is built.
//!
//! ```text
//! {rc522_reading, #{serial_number => [136,119,...], write_mode => false}}
//! └─ Tuple ──────┘  └─ Map ──────────────────────────────────────────┘
//! ```

use std::borrow::Cow;
use std::fmt;

// ───────────────────────────────────────────────────────────────
// Identities
// ───────────────────────────────────────────────────────────────

/// Local process identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pid(pub u32);

/// Reference, used as a request/reply correlation token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ref(pub u64);

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<0.{}.0>", self.0)
    }
}

impl fmt::Display for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#Ref<0.{}>", self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Atoms
// ───────────────────────────────────────────────────────────────

/// An atom name.  Static names cost nothing to build; names coming in from
/// the outside are owned.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Atom(Cow<'static, str>);

impl Atom {
    pub const fn new(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn owned(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Atom names the port speaks.
pub mod atoms {
    use super::Atom;

    // Requests
    pub const STOP: Atom = Atom::new("stop");
    pub const ENABLE_WRITE: Atom = Atom::new("enable_write");
    pub const DISABLE_WRITE: Atom = Atom::new("disable_write");

    // Options
    pub const RECEIVER: Atom = Atom::new("receiver");
    pub const CONFIG: Atom = Atom::new("config");
    pub const MISO_GPIO: Atom = Atom::new("miso_gpio");
    pub const MOSI_GPIO: Atom = Atom::new("mosi_gpio");
    pub const SCK_GPIO: Atom = Atom::new("sck_gpio");
    pub const SDA_GPIO: Atom = Atom::new("sda_gpio");

    // Readings
    pub const SERIAL_NUMBER: Atom = Atom::new("serial_number");
    pub const READ_DATA: Atom = Atom::new("read_data");
    pub const WRITE_DATA: Atom = Atom::new("write_data");
    pub const WRITE_MODE: Atom = Atom::new("write_mode");
    pub const RC522_READING: Atom = Atom::new("rc522_reading");
    pub const RC522_REQUEST: Atom = Atom::new("rc522_request");

    // Results
    pub const OK: Atom = Atom::new("ok");
    pub const ERROR: Atom = Atom::new("error");
    pub const OUT_OF_MEMORY: Atom = Atom::new("out_of_memory");
    pub const TRUE: Atom = Atom::new("true");
    pub const FALSE: Atom = Atom::new("false");
}

// ───────────────────────────────────────────────────────────────
// Terms
// ───────────────────────────────────────────────────────────────

/// Words taken by a boxed reference (header + 64-bit ticks on a 32-bit VM).
const REF_WORDS: usize = 3;
/// Words taken by a boxed 64-bit integer on a 32-bit VM.
const BOXED_INT_WORDS: usize = 3;
/// Small integers are immediates: 28 payload bits on a 32-bit VM.
const SMALL_INT_BITS: u32 = 27;

/// A VM value.  The empty list is nil.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Atom(Atom),
    Int(i64),
    List(Vec<Term>),
    Tuple(Vec<Term>),
    Map(Vec<(Term, Term)>),
    Pid(Pid),
    Ref(Ref),
}

impl Term {
    pub const fn atom(name: &'static str) -> Self {
        Self::Atom(Atom::new(name))
    }

    pub const fn nil() -> Self {
        Self::List(Vec::new())
    }

    pub fn tuple2(first: Term, second: Term) -> Self {
        Self::Tuple(vec![first, second])
    }

    pub fn boolean(b: bool) -> Self {
        Self::Atom(if b { atoms::TRUE } else { atoms::FALSE })
    }

    /// Encode a `u64` as a list of 8 small integers, least-significant byte
    /// first.
    pub fn le_bytes(value: u64) -> Self {
        Self::List(
            value
                .to_le_bytes()
                .iter()
                .map(|b| Self::Int(i64::from(*b)))
                .collect(),
        )
    }

    /// Inverse of [`Term::le_bytes`].  `None` unless the term is a list of
    /// exactly 8 integers in `0..=255`.
    pub fn to_le_u64(&self) -> Option<u64> {
        let items = self.as_list()?;
        if items.len() != 8 {
            return None;
        }
        let mut bytes = [0u8; 8];
        for (slot, item) in bytes.iter_mut().zip(items) {
            *slot = u8::try_from(item.as_int()?).ok()?;
        }
        Some(u64::from_le_bytes(bytes))
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn is_atom(&self, atom: &Atom) -> bool {
        matches!(self, Self::Atom(a) if a == atom)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_pid(&self) -> Option<Pid> {
        match self {
            Self::Pid(p) => Some(*p),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<Ref> {
        match self {
            Self::Ref(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Term]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Term]> {
        match self {
            Self::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Look `key` up in a map.
    pub fn map_get(&self, key: &Term) -> Option<&Term> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Look `key` up in a proplist (`[{Key, Value} | _]`).  Bare atoms in the
    /// list are shorthand for `{Atom, true}` and are not matched here.
    pub fn proplist_get(&self, key: &Term) -> Option<&Term> {
        self.as_list()?.iter().find_map(|item| match item.as_tuple() {
            Some([k, v]) if k == key => Some(v),
            _ => None,
        })
    }

    /// Look `key` up in either a map or a proplist.
    pub fn option(&self, key: &Term) -> Option<&Term> {
        match self {
            Self::Map(_) => self.map_get(key),
            Self::List(_) => self.proplist_get(key),
            _ => None,
        }
    }

    // ── Heap accounting ───────────────────────────────────────

    /// Heap words needed to copy this term into a process mailbox.
    /// Immediates (atoms, small integers, local pids, nil) are free.
    pub fn heap_size(&self) -> usize {
        match self {
            Self::Atom(_) | Self::Pid(_) => 0,
            Self::Int(i) => {
                let limit = 1i64 << SMALL_INT_BITS;
                if (-limit..limit).contains(i) {
                    0
                } else {
                    BOXED_INT_WORDS
                }
            }
            Self::Ref(_) => REF_WORDS,
            Self::List(items) => items.iter().map(|t| 2 + t.heap_size()).sum(),
            Self::Tuple(items) => 1 + items.len() + items.iter().map(Term::heap_size).sum::<usize>(),
            // Header + values, plus the keys tuple.
            Self::Map(entries) => {
                let n = entries.len();
                let nested: usize = entries
                    .iter()
                    .map(|(k, v)| k.heap_size() + v.heap_size())
                    .sum();
                2 + n + (1 + n) + nested
            }
        }
    }
}

impl From<Atom> for Term {
    fn from(a: Atom) -> Self {
        Self::Atom(a)
    }
}

impl From<Pid> for Term {
    fn from(p: Pid) -> Self {
        Self::Pid(p)
    }
}

impl From<Ref> for Term {
    fn from(r: Ref) -> Self {
        Self::Ref(r)
    }
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Term]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(a) => f.write_str(a.as_str()),
            Self::Int(i) => write!(f, "{i}"),
            Self::List(items) => {
                f.write_str("[")?;
                write_seq(f, items)?;
                f.write_str("]")
            }
            Self::Tuple(items) => {
                f.write_str("{")?;
                write_seq(f, items)?;
                f.write_str("}")
            }
            Self::Map(entries) => {
                f.write_str("#{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                f.write_str("}")
            }
            Self::Pid(p) => write!(f, "{p}"),
            Self::Ref(r) => write!(f, "{r}"),
        }
    }
}
