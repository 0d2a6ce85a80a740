//! Request handling: every well-formed request gets exactly one
//! `{Ref, Result}` reply.

use rfid_port::app::ports::{Inbox, MessageBus};
use rfid_port::app::service::{Flow, RfidPort};
use rfid_port::drivers::sim_reader::{SimFailure, SimReaderBackend};
use rfid_port::term::{atoms, Term};

use super::mock_reader::{bus_with_receiver, enable_write, port_options, post, reply, DriverCall, MockReaderBackend};

#[test]
fn enable_write_applies_key_and_replies_ok() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = SimReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();
    let reader = backend.last_handle().unwrap();

    let r = post(&bus, port.pid(), receiver, enable_write(0x2A));
    assert_eq!(port.consume_mailbox(), Some(Flow::Continue));

    assert_eq!(reply(&mut inbox), Some((r, Term::atom("ok"))));
    assert_eq!(reader.write_key(), Some(0x2A));
}

#[test]
fn enable_write_accepts_both_key_bounds() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = MockReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();

    for key in [0, 255] {
        let r = post(&bus, port.pid(), receiver, enable_write(key));
        port.consume_mailbox();
        assert_eq!(reply(&mut inbox), Some((r, Term::atom("ok"))));
    }
    assert_eq!(
        &backend.calls()[3..],
        &[DriverCall::EnableWrite(0), DriverCall::EnableWrite(255)]
    );
}

#[test]
fn disable_write_is_ok_in_any_mode() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = SimReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();
    let reader = backend.last_handle().unwrap();

    // Already in read mode.
    let r1 = post(&bus, port.pid(), receiver, Term::Atom(atoms::DISABLE_WRITE));
    port.consume_mailbox();
    assert_eq!(reply(&mut inbox), Some((r1, Term::atom("ok"))));

    post(&bus, port.pid(), receiver, enable_write(7));
    port.consume_mailbox();
    reply(&mut inbox);

    let r2 = post(&bus, port.pid(), receiver, Term::Atom(atoms::DISABLE_WRITE));
    port.consume_mailbox();
    assert_eq!(reply(&mut inbox), Some((r2, Term::atom("ok"))));
    assert_eq!(reader.write_key(), None);
}

#[test]
fn unrecognised_requests_reply_error_and_keep_running() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = MockReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();

    let requests = [
        Term::atom("reboot"),
        Term::Int(42),
        Term::nil(),
        enable_write(256),
        enable_write(-1),
        Term::tuple2(Term::Atom(atoms::ENABLE_WRITE), Term::atom("key")),
        Term::Tuple(vec![Term::Atom(atoms::ENABLE_WRITE)]),
        Term::tuple2(Term::Atom(atoms::STOP), Term::Int(1)),
    ];
    for request in requests {
        let r = post(&bus, port.pid(), receiver, request.clone());
        assert_eq!(port.consume_mailbox(), Some(Flow::Continue), "{request}");
        assert_eq!(reply(&mut inbox), Some((r, Term::atom("error"))), "{request}");
    }

    assert!(port.is_running());
    assert_eq!(backend.calls().len(), 3, "no driver call for unknown requests");
}

#[test]
fn driver_command_failure_replies_error() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = SimReaderBackend::fail_at(SimFailure::Command);
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();

    let r1 = post(&bus, port.pid(), receiver, enable_write(1));
    let r2 = post(&bus, port.pid(), receiver, Term::Atom(atoms::DISABLE_WRITE));
    port.consume_mailbox();
    port.consume_mailbox();

    assert_eq!(reply(&mut inbox), Some((r1, Term::atom("error"))));
    assert_eq!(reply(&mut inbox), Some((r2, Term::atom("error"))));
    assert!(port.is_running());
}

#[test]
fn malformed_envelopes_are_dropped_without_reply() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = MockReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();

    let junk = [
        Term::Atom(atoms::STOP),
        Term::tuple2(Term::Pid(receiver), Term::Atom(atoms::STOP)),
        Term::Tuple(vec![Term::Pid(receiver), Term::Int(1), Term::Atom(atoms::STOP)]),
        Term::Tuple(vec![Term::Int(1), Term::Ref(bus.make_ref()), Term::Atom(atoms::STOP)]),
    ];
    for msg in junk {
        bus.send(port.pid(), msg).unwrap();
        assert_eq!(port.consume_mailbox(), Some(Flow::Continue));
    }

    assert!(inbox.is_empty());
    assert!(port.is_running(), "a malformed stop must not stop the port");
    assert_eq!(port.consume_mailbox(), None);
}

#[test]
fn unallocatable_reply_signals_out_of_memory() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = MockReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();

    post(&bus, port.pid(), receiver, enable_write(9));
    // A `{Ref, ok}` reply needs 6 words.
    bus.set_heap_limit(5);
    port.consume_mailbox();

    assert_eq!(inbox.try_recv(), Some(Term::atom("out_of_memory")));
    assert!(inbox.is_empty());
    assert!(backend.calls().contains(&DriverCall::EnableWrite(9)));
}

#[test]
fn reply_goes_to_the_caller_not_the_receiver() {
    let (bus, receiver, mut receiver_inbox) = bus_with_receiver();
    let (caller, mut caller_inbox) = bus.spawn_mailbox().unwrap();
    let mut backend = MockReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();

    let r = post(&bus, port.pid(), caller, Term::Atom(atoms::DISABLE_WRITE));
    port.consume_mailbox();

    assert_eq!(reply(&mut caller_inbox), Some((r, Term::atom("ok"))));
    assert!(receiver_inbox.is_empty());
}
