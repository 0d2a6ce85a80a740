//! RFID port firmware — main entry point.
//!
//! Hosts the RC522 port on an ESP32 together with a logging receiver.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  rc522 scan task (PRO core)                                  │
//! │      │ events                                                │
//! │      ▼                                                       │
//! │  EventForwarder ──▶ LocalBus ──▶ LogReceiver   (main task)   │
//! │                        ▲  │                                  │
//! │                 replies│  │requests                          │
//! │                        │  ▼                                  │
//! │                     RfidPort loop              (APP core)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};

use rfid_port::adapters::local_bus::LocalBus;
use rfid_port::adapters::log_receiver::LogReceiver;
use rfid_port::app::client::PortClient;
use rfid_port::app::ports::MessageBus;
use rfid_port::driver;
use rfid_port::drivers::rc522::Rc522Backend;
use rfid_port::pins;
use rfid_port::term::{atoms, Term};

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  rfid-port v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    driver::init();

    // ── 2. Process table + receiver ───────────────────────────
    let bus = Arc::new(LocalBus::new());
    let (receiver, receiver_inbox) = bus.spawn_mailbox().map_err(rfid_port::Error::from)?;

    // ── 3. Open the port ──────────────────────────────────────
    let opts = Term::Map(vec![
        (Term::Atom(atoms::RECEIVER), Term::Pid(receiver)),
        (
            Term::Atom(atoms::CONFIG),
            Term::Map(vec![
                (Term::Atom(atoms::MISO_GPIO), Term::Int(pins::RC522_MISO_GPIO.into())),
                (Term::Atom(atoms::MOSI_GPIO), Term::Int(pins::RC522_MOSI_GPIO.into())),
                (Term::Atom(atoms::SCK_GPIO), Term::Int(pins::RC522_SCK_GPIO.into())),
                (Term::Atom(atoms::SDA_GPIO), Term::Int(pins::RC522_SDA_GPIO.into())),
            ]),
        ),
    ]);
    let port = driver::spawn_port(bus.clone(), &mut Rc522Backend, &opts)?;
    let port_pid = port.pid();

    // ── 4. Receiver + control tasks ───────────────────────────
    let mut control = PortClient::spawn(bus.clone()).map_err(rfid_port::Error::from)?;
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    executor.spawn(LogReceiver::new(receiver_inbox).run()).detach();
    executor
        .spawn(async move {
            // Boot in read mode whatever the reader was left in.
            match control.call(port_pid, Term::Atom(atoms::DISABLE_WRITE)).await {
                Ok(result) => info!("rfid port {}: disable_write -> {}", port_pid, result),
                Err(e) => warn!("rfid port {}: disable_write failed: {}", port_pid, e),
            }
        })
        .detach();

    info!("System ready. Waiting for tags.");
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));

    port.join();
    Ok(())
}
