//! Controller operations against a scripted controller

use bt_exchange_core::{Address, AddressType, Error};
use bt_exchange_hci::commands::le::ScanParameters;
use bt_exchange_hci::controller::busy;
use bt_exchange_hci::management::IoCapability;
use bt_exchange_hci::Controller;
use bt_exchange_tests::controller::{advertising_report, opcode, parameters};
use bt_exchange_tests::{controller, eventually, management, Link, Loopback};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WAIT: Duration = Duration::from_secs(2);

const LE_SET_SCAN_PARAMETERS: u16 = 0x200B;
const LE_SET_SCAN_ENABLE: u16 = 0x200C;
const LE_SET_ADVERTISING_PARAMETERS: u16 = 0x2006;
const LE_SET_ADVERTISING_ENABLE: u16 = 0x200A;

struct Setup {
    hci: Link,
    management: Link,
    controller: Arc<Controller<Loopback, Loopback>>,
}

fn setup() -> Setup {
    let hci = Link::new(controller::accept_all);

    let management = Link::new(management::accept_all);

    let controller = Arc::new(Controller::new(
        hci.channel().clone(),
        management.channel().clone(),
        0,
    ));

    Setup {
        hci,
        management,
        controller,
    }
}

fn commands(link: &Link) -> Vec<(u16, Vec<u8>)> {
    link.written()
        .iter()
        .filter_map(|packet| opcode(packet).map(|opcode| (opcode, parameters(packet).to_vec())))
        .collect()
}

#[test]
fn le_scan_until_abort() {
    let setup = setup();

    let discovered = Arc::new(Mutex::new(Vec::new()));

    let sink = discovered.clone();

    setup
        .controller
        .set_discovery(move |address: Address, short: &str, long: &str| {
            sink.lock().push((address, short.to_string(), long.to_string()))
        });

    let controller = setup.controller.clone();

    let started = Instant::now();

    let scan = std::thread::spawn(move || controller.scan_le(Duration::from_secs(30), &ScanParameters::default()));

    assert!(eventually(WAIT, || commands(&setup.hci).len() == 2));

    assert!(setup.controller.is_scanning());

    setup
        .hci
        .inject(advertising_report([1, 2, 3, 4, 5, 6], &[0x04, 0x08, b'b', b't', b'x'], -60));

    assert!(eventually(WAIT, || discovered.lock().len() == 1));

    assert_eq!(
        (Address::from_bytes([1, 2, 3, 4, 5, 6]), "btx".to_string(), String::new()),
        discovered.lock()[0]
    );

    // a second operation is refused while scanning
    assert_eq!(
        Err(Error::InProgress),
        setup.controller.scan_le(Duration::from_millis(10), &ScanParameters::default())
    );

    assert_eq!(
        Err(Error::InProgress),
        setup
            .controller
            .pair(Address::from_bytes([1; 6]), AddressType::LePublic, IoCapability::NoInputNoOutput)
    );

    setup.controller.abort();

    assert_eq!(Ok(()), scan.join().unwrap());

    assert!(started.elapsed() < Duration::from_secs(30));

    assert_eq!(busy::IDLE, setup.controller.state());

    let commands = commands(&setup.hci);

    assert_eq!(
        vec![
            (LE_SET_SCAN_PARAMETERS, vec![0x01, 0x10, 0x00, 0x10, 0x00, 0x00, 0x00]),
            (LE_SET_SCAN_ENABLE, vec![0x01, 0x01]),
            (LE_SET_SCAN_ENABLE, vec![0x00, 0x01]),
        ],
        commands
    );
}

#[test]
fn scan_refused_while_pairing() {
    let hci = Link::new(controller::accept_all);

    let management = Link::silent();

    let controller = Arc::new(
        Controller::new(hci.channel().clone(), management.channel().clone(), 0)
            .with_pair_timeout(Duration::from_millis(500)),
    );

    let pairing = controller.clone();

    let pair = std::thread::spawn(move || {
        pairing.pair(Address::from_bytes([7; 6]), AddressType::LePublic, IoCapability::DisplayYesNo)
    });

    assert!(eventually(WAIT, || management.written().len() == 1));

    assert_eq!(busy::PAIRING, controller.state());

    assert_eq!(
        Err(Error::InProgress),
        controller.scan_le(Duration::from_millis(10), &ScanParameters::default())
    );

    // abort only ends scanning
    controller.abort();

    assert_eq!(busy::PAIRING, controller.state());

    assert_eq!(Err(Error::TimedOut), pair.join().unwrap());

    assert!(hci.written().is_empty());

    assert_eq!(busy::IDLE, controller.state());
}

#[test]
fn le_scan_for_duration() {
    let setup = setup();

    let started = Instant::now();

    assert_eq!(
        Ok(()),
        setup
            .controller
            .scan_le(Duration::from_millis(50), &ScanParameters::discovery(false, true))
    );

    assert!(started.elapsed() >= Duration::from_millis(50));

    assert_eq!(3, commands(&setup.hci).len());

    assert!(!setup.controller.is_scanning());
}

#[test]
fn abort_without_scan_does_nothing() {
    let setup = setup();

    setup.controller.abort();

    assert_eq!(busy::IDLE, setup.controller.state());
}

#[test]
fn advertising_is_idempotent() {
    let setup = setup();

    assert_eq!(Ok(()), setup.controller.advertising(true, 0x00));

    assert_eq!(Ok(()), setup.controller.advertising(true, 0x00));

    assert!(setup.controller.is_advertising());

    assert_eq!(Ok(()), setup.controller.advertising(false, 0x00));

    assert_eq!(Ok(()), setup.controller.advertising(false, 0x00));

    let opcodes: Vec<u16> = commands(&setup.hci).into_iter().map(|(opcode, _)| opcode).collect();

    assert_eq!(
        vec![
            LE_SET_ADVERTISING_PARAMETERS,
            LE_SET_ADVERTISING_ENABLE,
            LE_SET_ADVERTISING_ENABLE
        ],
        opcodes
    );
}

#[test]
fn concurrent_enables_send_once() {
    let setup = setup();

    let enables: Vec<_> = (0..4)
        .map(|_| {
            let controller = setup.controller.clone();

            std::thread::spawn(move || controller.advertising(true, 0x00))
        })
        .collect();

    for enable in enables {
        assert_eq!(Ok(()), enable.join().unwrap());
    }

    assert!(setup.controller.is_advertising());

    let opcodes: Vec<u16> = commands(&setup.hci).into_iter().map(|(opcode, _)| opcode).collect();

    assert_eq!(vec![LE_SET_ADVERTISING_PARAMETERS, LE_SET_ADVERTISING_ENABLE], opcodes);
}

#[test]
fn pair_and_unpair() {
    let setup = setup();

    let address = Address::from_bytes([0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5]);

    assert_eq!(
        Ok(()),
        setup
            .controller
            .pair(address, AddressType::LeRandom, IoCapability::KeyboardDisplay)
    );

    assert_eq!(Ok(()), setup.controller.unpair(address, AddressType::LeRandom));

    let written = setup.management.written();

    assert_eq!(2, written.len());

    assert_eq!(&[0x19, 0x00, 0x00, 0x00, 0x08, 0x00], &written[0][..6]);

    assert_eq!(&[0xA0, 0xA1, 0xA2, 0xA3, 0xA4, 0xA5, 0x02], &written[0][6..13]);

    assert_eq!(&[0x1B, 0x00], &written[1][..2]);

    assert_eq!(Some(&0x01), written[1].last());

    assert_eq!(busy::IDLE, setup.controller.state());
}

#[test]
fn classic_scan_without_inquiry() {
    let setup = setup();

    assert_eq!(
        Err(Error::Unavailable),
        setup.controller.scan(Duration::from_secs(1), 0x9E8B33, 0, |_| ())
    );
}
