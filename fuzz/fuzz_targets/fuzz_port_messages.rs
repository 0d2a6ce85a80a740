//! Fuzz target: `RfidPort::handle_message` and `PortOptions::from_term`
//!
//! Decodes arbitrary bytes into VM terms and feeds them to a live port as
//! mailbox messages and as creation options.  Asserts that nothing panics,
//! that no message produces more than one reply, and that only a
//! well-formed `stop` terminates the port.
//!
//! cargo fuzz run fuzz_port_messages

#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use rfid_port::adapters::local_bus::LocalBus;
use rfid_port::app::commands::{Request, RequestEnvelope};
use rfid_port::app::ports::{Inbox, MessageBus};
use rfid_port::app::service::{Flow, RfidPort};
use rfid_port::config::PortOptions;
use rfid_port::drivers::sim_reader::SimReaderBackend;
use rfid_port::term::{atoms, Atom, Pid, Ref, Term};

const ATOMS: [Atom; 6] = [
    atoms::STOP,
    atoms::ENABLE_WRITE,
    atoms::DISABLE_WRITE,
    atoms::RECEIVER,
    atoms::CONFIG,
    atoms::SCK_GPIO,
];

/// Prefix-coded term decoder.  Runs out of input gracefully.
fn decode(data: &mut &[u8], depth: u8) -> Term {
    let Some((&tag, rest)) = data.split_first() else {
        return Term::nil();
    };
    *data = rest;
    match tag % 7 {
        0 => Term::Atom(ATOMS[usize::from(tag / 7) % ATOMS.len()].clone()),
        1 => Term::Int(i64::from(tag as i8) * 3),
        2 => Term::Pid(Pid(u32::from(tag / 7))),
        3 => Term::Ref(Ref(u64::from(tag))),
        4 | 5 if depth < 4 => {
            let len = usize::from(tag / 7) % 4;
            let items = (0..len).map(|_| decode(data, depth + 1)).collect();
            if tag % 7 == 4 { Term::Tuple(items) } else { Term::List(items) }
        }
        6 if depth < 4 => {
            let len = usize::from(tag / 7) % 3;
            Term::Map((0..len).map(|_| (decode(data, depth + 1), decode(data, depth + 1))).collect())
        }
        _ => Term::nil(),
    }
}

fuzz_target!(|data: &[u8]| {
    let mut input = data;

    // Options parsing never panics; a parsed receiver is always a pid.
    let opts = decode(&mut input, 0);
    if let Ok(parsed) = PortOptions::from_term(&opts) {
        assert_eq!(
            opts.option(&Term::Atom(atoms::RECEIVER)).and_then(Term::as_pid),
            Some(parsed.receiver)
        );
    }

    let bus = Arc::new(LocalBus::new());
    let Ok((caller, mut inbox)) = bus.spawn_mailbox() else {
        return;
    };
    let port_opts = Term::Map(vec![(Term::Atom(atoms::RECEIVER), Term::Pid(caller))]);
    let Ok(mut port) = RfidPort::create(bus.clone(), &mut SimReaderBackend::new(), &port_opts) else {
        return;
    };

    while !input.is_empty() {
        let msg = decode(&mut input, 0);
        let stops = RequestEnvelope::from_term(&msg).is_some_and(|e| e.request == Request::Stop);
        let flow = port.handle_message(&msg);
        assert_eq!(flow == Flow::Terminate, stops);

        let _ = inbox.try_recv();
        assert!(inbox.try_recv().is_none(), "at most one reply per message");
        if flow == Flow::Terminate {
            break;
        }
    }
});
