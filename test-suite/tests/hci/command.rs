//! HCI commands exchanged with a scripted controller

use bt_exchange_core::{Address, Error};
use bt_exchange_hci::commands::{cb, info_params, link_control};
use bt_exchange_tests::controller::{self, command_complete, command_status, event, opcode};
use bt_exchange_tests::{eventually, Link};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

const CREATE_CONNECTION: u16 = 0x0405;

const ADDRESS: [u8; 6] = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];

#[test]
fn command_status_ends_create_connection() {
    let link = Link::new(|packet: &[u8]| match opcode(packet) {
        Some(CREATE_CONNECTION) => vec![command_status(0x00, CREATE_CONNECTION)],
        _ => Vec::new(),
    });

    let parameter = link_control::create_connection::CreateConnection::new(Address::from_bytes(ADDRESS));

    assert_eq!(
        Ok(()),
        link_control::create_connection::send(link.channel(), WAIT, parameter)
    );

    let written = link.written();

    assert_eq!(1, written.len());

    assert_eq!(&[0x01, 0x05, 0x04, 13], &written[0][..4]);

    assert_eq!(&ADDRESS, &written[0][4..10]);

    assert_eq!(0, link.channel().pending());
}

#[test]
fn failed_status() {
    let link = Link::new(|packet: &[u8]| match opcode(packet) {
        Some(opcode) => vec![command_status(0x0C, opcode)],
        None => Vec::new(),
    });

    let parameter = link_control::create_connection::CreateConnection::new(Address::from_bytes(ADDRESS));

    assert_eq!(
        Err(Error::General),
        link_control::create_connection::connect(link.channel(), WAIT, parameter)
    );
}

#[test]
fn events_for_other_commands_are_not_correlated() {
    let link = Link::new(|packet: &[u8]| match opcode(packet) {
        Some(opcode) => vec![command_status(0x00, opcode + 1), command_complete(opcode + 1, &[0x00])],
        None => Vec::new(),
    });

    let unsolicited = Arc::new(Mutex::new(0usize));

    let counter = unsolicited.clone();

    link.channel().set_unsolicited(move |stream: &[u8]| {
        *counter.lock() += 1;

        stream.len()
    });

    let parameter = link_control::create_connection::CreateConnection::new(Address::from_bytes(ADDRESS));

    assert_eq!(
        Err(Error::TimedOut),
        link_control::create_connection::send(link.channel(), Duration::from_millis(100), parameter)
    );

    assert!(eventually(WAIT, || *unsolicited.lock() == 2));
}

#[test]
fn connection_complete_follows_status() {
    let link = Link::new(|packet: &[u8]| match opcode(packet) {
        Some(CREATE_CONNECTION) => {
            let mut complete = vec![0x00, 0x40, 0x00];

            complete.extend_from_slice(&ADDRESS);
            complete.extend_from_slice(&[0x01, 0x00]);

            vec![command_status(0x00, CREATE_CONNECTION), event(0x03, &complete)]
        }
        _ => Vec::new(),
    });

    let parameter = link_control::create_connection::CreateConnection::new(Address::from_bytes(ADDRESS));

    let complete = link_control::create_connection::connect(link.channel(), WAIT, parameter).unwrap();

    assert_eq!(0x40, complete.handle.get_raw_handle());

    assert_eq!(Address::from_bytes(ADDRESS), complete.address);

    assert!(!complete.encryption_enabled);
}

#[test]
fn remote_name() {
    let link = Link::new(|packet: &[u8]| match opcode(packet) {
        Some(0x0419) => {
            let mut parameters = vec![0x00];

            parameters.extend_from_slice(&ADDRESS);
            parameters.extend_from_slice(b"speaker");
            parameters.resize(1 + 6 + 248, 0);

            vec![command_status(0x00, 0x0419), event(0x07, &parameters)]
        }
        _ => Vec::new(),
    });

    assert_eq!(
        Ok("speaker".to_string()),
        link_control::remote_name_request::send(link.channel(), WAIT, Address::from_bytes(ADDRESS))
    );
}

#[test]
fn return_parameters() {
    let link = Link::new(|packet: &[u8]| match opcode(packet) {
        Some(0x1009) => {
            let mut parameters = vec![0x00];

            parameters.extend_from_slice(&ADDRESS);

            vec![command_complete(0x1009, &parameters)]
        }
        _ => controller::accept_all(packet),
    });

    assert_eq!(Ok(()), cb::reset::send(link.channel(), WAIT));

    assert_eq!(
        Ok(Address::from_bytes(ADDRESS)),
        info_params::read_bd_addr::send(link.channel(), WAIT)
    );

    assert_eq!(Some(0x0C03), opcode(&link.written()[0]));
}
