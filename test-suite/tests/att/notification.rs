//! Notifications and indications from the server

use bt_exchange_att::GattChannel;
use bt_exchange_tests::{eventually, Link};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn notification_during_read() {
    let link = Link::new(|pdu: &[u8]| match pdu.first() {
        Some(0x0A) => vec![vec![0x1B, 0x20, 0x00, 0x09], vec![0x0B, 0x01, 0x02]],
        _ => Vec::new(),
    });

    let gatt = GattChannel::new(link.channel().clone());

    let values = Arc::new(Mutex::new(Vec::new()));

    let sink = values.clone();

    gatt.set_value_handler(move |handle: u16, value: &[u8], indicated: bool| {
        sink.lock().push((handle, value.to_vec(), indicated))
    });

    assert_eq!(Ok(vec![0x01, 0x02]), gatt.read(WAIT, 0x0003));

    assert_eq!(vec![(0x0020, vec![0x09], false)], *values.lock());
}

#[test]
fn indication_is_confirmed() {
    let link = Link::silent();

    let gatt = GattChannel::new(link.channel().clone());

    let values = Arc::new(Mutex::new(Vec::new()));

    let sink = values.clone();

    gatt.set_value_handler(move |handle: u16, value: &[u8], indicated: bool| {
        sink.lock().push((handle, value.to_vec(), indicated))
    });

    link.inject(vec![0x1D, 0x21, 0x00, 0xAB, 0xCD]);

    assert!(eventually(WAIT, || values.lock().len() == 1));

    assert_eq!((0x0021, vec![0xAB, 0xCD], true), values.lock()[0]);

    assert_eq!(Ok(()), gatt.confirm(WAIT));

    assert_eq!(vec![vec![0x1E]], link.written());
}
