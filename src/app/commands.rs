//! Inbound requests to the port.
//!
//! Requests arrive in the port's mailbox wrapped in the VM's call envelope
//! `{FromPid, Ref, Request}`.  The reply `{Ref, Result}` goes back to
//! `FromPid`.

use crate::term::{atoms, Pid, Ref, Term};

/// Requests the port understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// `stop`: tear down the reader and terminate the port.
    Stop,
    /// `disable_write`
    DisableWrite,
    /// `{enable_write, Key}` with `Key` in `0..=255`.
    EnableWrite(u8),
    /// Anything else.  Answered with `error`.
    Unknown,
}

impl Request {
    pub fn from_term(req: &Term) -> Self {
        match req {
            Term::Atom(_) if req.is_atom(&atoms::STOP) => Self::Stop,
            Term::Atom(_) if req.is_atom(&atoms::DISABLE_WRITE) => Self::DisableWrite,
            Term::Tuple(items) => match items.as_slice() {
                [cmd, Term::Int(key)] if cmd.is_atom(&atoms::ENABLE_WRITE) => {
                    u8::try_from(*key).map_or(Self::Unknown, Self::EnableWrite)
                }
                _ => Self::Unknown,
            },
            _ => Self::Unknown,
        }
    }
}

/// A request together with its return address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub from: Pid,
    pub reference: Ref,
    pub request: Request,
}

impl RequestEnvelope {
    /// Unwrap `{Pid, Ref, Request}`.  `None` when the envelope itself is
    /// malformed, in which case there is nobody to reply to.
    pub fn from_term(msg: &Term) -> Option<Self> {
        let [from, reference, request] = msg.as_tuple()? else {
            return None;
        };
        Some(Self {
            from: from.as_pid()?,
            reference: reference.as_reference()?,
            request: Request::from_term(request),
        })
    }

    /// Build the wire form of a request, as a VM-side caller would.
    pub fn to_term(from: Pid, reference: Ref, request: Term) -> Term {
        Term::Tuple(vec![Term::Pid(from), Term::Ref(reference), request])
    }
}
