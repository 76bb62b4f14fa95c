//! Read by type requests

use bt_exchange_att::{Command, ErrorCode, GattChannel};
use bt_exchange_core::{Error, Uuid};
use bt_exchange_tests::gatt::GattServer;
use bt_exchange_tests::Link;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn two_entries_in_pdu_order() {
    let link = Link::new(|pdu: &[u8]| match pdu.first() {
        Some(0x08) => vec![vec![0x09, 0x04, 0x03, 0x00, 0xAA, 0xBB, 0x05, 0x00, 0xCC, 0xDD]],
        _ => Vec::new(),
    });

    let gatt = GattChannel::new(link.channel().clone());

    let mut command = gatt.command();

    command.read_by_type(0x0001, 0xFFFF, Uuid::from_u16(0x2A19));

    let (command, result) = gatt.execute(WAIT, command);

    assert_eq!(Ok(()), result);

    let mut response = command.into_response();

    assert_eq!(2, response.count());

    response.reset();

    assert!(response.advance());

    assert_eq!(Some(0x0003), response.handle());
    assert_eq!(&[0xAA, 0xBB], response.data());

    assert!(response.advance());

    assert_eq!(Some(0x0005), response.handle());
    assert_eq!(&[0xCC, 0xDD], response.data());

    assert!(!response.advance());

    assert_eq!(
        vec![vec![0x08, 0x01, 0x00, 0xFF, 0xFF, 0x19, 0x2A]],
        link.written()
    );
}

#[test]
fn characteristic_values_from_server() {
    let server = GattServer::new(23)
        .service(0x180F)
        .characteristic(0x02, 0x2A19, &[0x64, 0x00])
        .characteristic(0x02, 0x2A19, &[0x32, 0x00]);

    let link = Link::new(server);

    let gatt = GattChannel::new(link.channel().clone());

    let mut command = gatt.command();

    command.read_by_type(0x0001, 0xFFFF, Uuid::from_u16(0x2A19));

    let (command, result) = gatt.execute(WAIT, command);

    assert_eq!(Ok(()), result);

    assert_eq!(
        vec![(0x0003, &[0x64, 0x00][..]), (0x0005, &[0x32, 0x00][..])],
        command.response().iter().collect::<Vec<_>>()
    );
}

#[test]
fn error_response() {
    let link = Link::new(GattServer::new(23).service(0x1800));

    let gatt = GattChannel::new(link.channel().clone());

    let mut command = Command::default();

    command.read_by_type(0x0001, 0xFFFF, Uuid::from_u16(0x2A00));

    let (command, result) = gatt.execute(WAIT, command);

    assert_eq!(Err(Error::General), result);

    assert_eq!(Some(ErrorCode::AttributeNotFound), command.error());

    assert_eq!(Err(Error::General), gatt.read(WAIT, 0x0040));
}
