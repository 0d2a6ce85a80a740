//! Event delivery from the reader to the receiver process.

use rfid_port::app::events::{PortMessage, ReaderEvent, TagReading};
use rfid_port::app::ports::{Inbox, MessageBus};
use rfid_port::app::service::RfidPort;
use rfid_port::drivers::sim_reader::SimReaderBackend;
use rfid_port::term::{atoms, Term};

use super::mock_reader::{bus_with_receiver, enable_write, port_options, post, reply, MockReaderBackend};

fn bytes(list: &[i64]) -> Term {
    Term::List(list.iter().map(|b| Term::Int(*b)).collect())
}

#[test]
fn tag_request_becomes_rc522_request() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = SimReaderBackend::new();
    let _port = RfidPort::create(bus, &mut backend, &port_options(receiver)).unwrap();

    assert!(backend.last_handle().unwrap().request());

    assert_eq!(
        inbox.try_recv(),
        Some(Term::tuple2(Term::Atom(atoms::RC522_REQUEST), Term::nil()))
    );
}

#[test]
fn scan_delivers_reading_least_significant_byte_first() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = SimReaderBackend::new();
    let _port = RfidPort::create(bus, &mut backend, &port_options(receiver)).unwrap();

    let reading = TagReading {
        serial_number: 0x1122_3344_5566_7788,
        read_data: 0xFF,
        write_data: 0,
        write_mode: false,
    };
    assert!(backend.last_handle().unwrap().scan(reading));

    let msg = inbox.try_recv().unwrap();
    let [tag, payload] = msg.as_tuple().unwrap() else {
        panic!("not a 2-tuple: {msg}");
    };
    assert!(tag.is_atom(&atoms::RC522_READING));
    assert_eq!(
        payload.map_get(&Term::Atom(atoms::SERIAL_NUMBER)),
        Some(&bytes(&[0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]))
    );
    assert_eq!(
        payload.map_get(&Term::Atom(atoms::READ_DATA)),
        Some(&bytes(&[0xFF, 0, 0, 0, 0, 0, 0, 0]))
    );
    assert_eq!(
        payload.map_get(&Term::Atom(atoms::WRITE_DATA)),
        Some(&bytes(&[0; 8]))
    );
    assert_eq!(
        payload.map_get(&Term::Atom(atoms::WRITE_MODE)),
        Some(&Term::atom("false"))
    );
    assert_eq!(PortMessage::from_term(&msg), PortMessage::Reading(reading));
}

#[test]
fn reading_reports_active_write_mode() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = SimReaderBackend::new();
    let mut port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();
    let reader = backend.last_handle().unwrap();

    post(&bus, port.pid(), receiver, enable_write(0x10));
    port.consume_mailbox();
    reply(&mut inbox);

    reader.scan_serial(1);
    match PortMessage::from_term(&inbox.try_recv().unwrap()) {
        PortMessage::Reading(r) => assert!(r.write_mode),
        other => panic!("expected a reading, got {other:?}"),
    }
}

#[test]
fn unallocatable_reading_signals_out_of_memory() {
    let (bus, receiver, mut inbox) = bus_with_receiver();
    let mut backend = SimReaderBackend::new();
    let _port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();
    let reader = backend.last_handle().unwrap();

    // A reading needs 62 words; a request 3.
    bus.set_heap_limit(10);
    reader.scan_serial(0xDEAD_BEEF);
    reader.request();

    assert_eq!(inbox.try_recv(), Some(Term::atom("out_of_memory")));
    assert_eq!(
        PortMessage::from_term(&inbox.try_recv().unwrap()),
        PortMessage::TagRequested
    );
    assert!(inbox.is_empty());
}

#[test]
fn events_for_a_dead_receiver_are_dropped() {
    let (bus, receiver, inbox) = bus_with_receiver();
    let mut backend = MockReaderBackend::new();
    let port = RfidPort::create(bus.clone(), &mut backend, &port_options(receiver)).unwrap();

    bus.release(receiver);
    drop(inbox);

    assert!(backend.fire(ReaderEvent::TagRequested));
    assert!(port.is_running());
    assert!(bus.is_alive(port.pid()));
}
