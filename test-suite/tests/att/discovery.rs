//! Discovering the services of a server

use bt_exchange_att::profile::{self, Profile};
use bt_exchange_att::GattChannel;
use bt_exchange_core::{Error, Uuid};
use bt_exchange_tests::gatt::GattServer;
use bt_exchange_tests::Link;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

const GAP: u16 = 0x1800;
const DEVICE_NAME: u16 = 0x2A00;
const APPEARANCE: u16 = 0x2A01;
const BATTERY: u16 = 0x180F;
const BATTERY_LEVEL: u16 = 0x2A19;
const CCCD: u16 = 0x2902;

fn server() -> GattServer {
    GattServer::new(23)
        .service(GAP) // 0x0001
        .characteristic(0x02, DEVICE_NAME, b"bt-exchange") // 0x0002, 0x0003
        .characteristic(0x02, APPEARANCE, &[0x00, 0x00]) // 0x0004, 0x0005
        .service(BATTERY) // 0x0006
        .characteristic(0x12, BATTERY_LEVEL, &[0x5A]) // 0x0007, 0x0008
        .descriptor(CCCD, &[0x00, 0x00]) // 0x0009
}

#[test]
fn discover_profile() {
    let link = Link::new(server());

    let gatt = GattChannel::new(link.channel().clone());

    let profile = Profile::discover(&gatt, WAIT).unwrap();

    let services: Vec<(Uuid, u16, u16)> = profile.services().iter().map(|s| (s.uuid, s.start, s.end)).collect();

    assert_eq!(
        vec![
            (Uuid::from_u16(GAP), 0x0001, 0x0005),
            (Uuid::from_u16(BATTERY), 0x0006, 0x0009)
        ],
        services
    );

    assert_eq!(
        Some(0x0003),
        profile.find_handle(Uuid::from_u16(GAP), Uuid::from_u16(DEVICE_NAME))
    );

    assert_eq!(
        Some(0x0008),
        profile.find_handle(Uuid::from_u16(BATTERY), Uuid::from_u16(BATTERY_LEVEL))
    );

    let level = profile
        .service(Uuid::from_u16(BATTERY))
        .and_then(|s| s.characteristic(Uuid::from_u16(BATTERY_LEVEL)))
        .unwrap();

    assert_eq!(0x12, level.properties);

    assert_eq!(Some(0x0009), level.descriptor(Uuid::from_u16(CCCD)));

    let name = profile
        .service(Uuid::from_u16(GAP))
        .and_then(|s| s.characteristic(Uuid::from_u16(DEVICE_NAME)))
        .unwrap();

    assert!(name.descriptors.is_empty());

    assert_eq!(None, profile.find_handle(Uuid::from_u16(GAP), Uuid::from_u16(BATTERY_LEVEL)));

    assert_eq!(Ok(b"bt-exchange".to_vec()), gatt.read(WAIT, 0x0003));
}

#[test]
fn discover_service_by_uuid() {
    let link = Link::new(server());

    let gatt = GattChannel::new(link.channel().clone());

    assert_eq!(
        Ok(vec![(0x0006, 0x0009)]),
        profile::discover_service(&gatt, WAIT, Uuid::from_u16(BATTERY))
    );

    assert_eq!(
        Ok(Vec::new()),
        profile::discover_service(&gatt, WAIT, Uuid::from_u16(0x1812))
    );
}

#[test]
fn empty_server() {
    let link = Link::new(GattServer::new(23));

    let gatt = GattChannel::new(link.channel().clone());

    assert!(Profile::discover(&gatt, WAIT).unwrap().services().is_empty());
}

#[test]
fn characteristic_handles_must_increase() {
    let link = Link::new(|pdu: &[u8]| match pdu.first() {
        // one service over the whole handle range
        Some(0x10) => vec![vec![0x11, 0x06, 0x01, 0x00, 0xFF, 0xFF, 0x0F, 0x18]],
        // the second declaration is at handle 0x0000
        Some(0x08) => vec![vec![
            0x09, 0x07, 0x02, 0x00, 0x02, 0x03, 0x00, 0x19, 0x2A, 0x00, 0x00, 0x02, 0x05, 0x00, 0x00, 0x2A,
        ]],
        _ => Vec::new(),
    });

    let gatt = GattChannel::new(link.channel().clone());

    assert_eq!(Err(Error::General), Profile::discover(&gatt, WAIT));
}
