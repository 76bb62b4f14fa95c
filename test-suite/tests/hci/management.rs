//! Management commands exchanged with a scripted management interface

use bt_exchange_core::{Address, AddressType, Error};
use bt_exchange_hci::management::{self, opcodes, settings, AddDevice, AutoConnect, SetPowered};
use bt_exchange_tests::management::{accept_all, event, header, COMMAND_COMPLETE, COMMAND_STATUS};
use bt_exchange_tests::Link;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

fn controller_information() -> Vec<u8> {
    let mut info = Vec::new();

    info.extend_from_slice(&[6, 5, 4, 3, 2, 1]);
    info.push(0x0B);
    info.extend_from_slice(&0x0002u16.to_le_bytes());
    info.extend_from_slice(&(settings::POWERED | settings::LOW_ENERGY).to_le_bytes());
    info.extend_from_slice(&(settings::POWERED).to_le_bytes());
    info.extend_from_slice(&[0x0C, 0x02, 0x5A]);

    let mut name = b"bt-exchange".to_vec();
    name.resize(249, 0);
    info.extend_from_slice(&name);

    let mut short_name = b"btx".to_vec();
    short_name.resize(11, 0);
    info.extend_from_slice(&short_name);

    info
}

#[test]
fn read_info() {
    let link = Link::new(|packet: &[u8]| match header(packet) {
        Some((opcodes::READ_INFO, index)) => {
            vec![event(COMMAND_COMPLETE, index, opcodes::READ_INFO, 0, &controller_information())]
        }
        _ => Vec::new(),
    });

    let info = management::read_info(link.channel(), WAIT, 0).unwrap();

    assert_eq!(Address::from_bytes([6, 5, 4, 3, 2, 1]), info.address);

    assert_eq!("bt-exchange", info.name);

    assert_eq!("btx", info.short_name);

    assert!(info.is_powered());

    assert_eq!(vec![vec![0x04, 0x00, 0x00, 0x00, 0x00, 0x00]], link.written());
}

#[test]
fn pending_status_then_complete() {
    let link = Link::new(|packet: &[u8]| match header(packet) {
        Some((opcode, index)) => vec![
            event(COMMAND_STATUS, index, opcode, 0, &[]),
            event(COMMAND_COMPLETE, index, opcode, 0, &[0x01]),
        ],
        None => Vec::new(),
    });

    let frame = management::send_management(link.channel(), WAIT, 1, SetPowered(true)).unwrap();

    assert_eq!(Some(0), frame.status());

    assert_eq!(&[0x01], frame.response());

    assert_eq!(vec![vec![0x05, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01]], link.written());
}

#[test]
fn failed_status() {
    let link = Link::new(|packet: &[u8]| match header(packet) {
        Some((opcode, index)) => vec![event(COMMAND_STATUS, index, opcode, 0x0D, &[])],
        None => Vec::new(),
    });

    let parameter = AddDevice {
        address: Address::from_bytes([1; 6]),
        address_type: AddressType::LePublic,
        action: AutoConnect::AutoConnect,
    };

    assert_eq!(
        Err(Error::General),
        management::send_management(link.channel(), WAIT, 0, parameter).map(|_| ())
    );
}

#[test]
fn other_controller_index_is_ignored() {
    let link = Link::new(|packet: &[u8]| match header(packet) {
        Some((opcode, index)) => vec![event(COMMAND_COMPLETE, index + 1, opcode, 0, &[])],
        None => Vec::new(),
    });

    assert_eq!(
        Err(Error::TimedOut),
        management::send_management(link.channel(), Duration::from_millis(100), 0, SetPowered(false)).map(|_| ())
    );
}

#[test]
fn accepted_command() {
    let link = Link::new(accept_all);

    assert!(management::send_management(link.channel(), WAIT, 0, SetPowered(false)).is_ok());
}
