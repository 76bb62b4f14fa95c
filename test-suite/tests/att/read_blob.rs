//! Reading values longer than the MTU

use bt_exchange_att::GattChannel;
use bt_exchange_tests::gatt::GattServer;
use bt_exchange_tests::Link;
use quickcheck_macros::quickcheck;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[quickcheck]
fn long_value_is_reconstructed(value: Vec<u8>) -> bool {
    let value = &value[..value.len().min(512)];

    let link = Link::new(GattServer::new(23).service(0x1800).characteristic(0x02, 0x2A00, value));

    let gatt = GattChannel::new(link.channel().clone());

    let Ok(read) = gatt.read(WAIT, 0x0003) else {
        return false;
    };

    let written = link.written();

    let offsets: Vec<u16> = written
        .iter()
        .skip(1)
        .map(|pdu| u16::from_le_bytes([pdu[3], pdu[4]]))
        .collect();

    let expected_offsets: Vec<u16> = (1..=value.len() / 22).map(|chunk| (chunk * 22) as u16).collect();

    read == value
        && written[0] == vec![0x0A, 0x03, 0x00]
        && written.iter().skip(1).all(|pdu| pdu[0] == 0x0C)
        && offsets == expected_offsets
}

#[test]
fn negotiated_mtu_is_used_for_reads() {
    let value: Vec<u8> = (0..200u8).collect();

    let link = Link::new(GattServer::new(64).service(0x1800).characteristic(0x02, 0x2A00, &value));

    let gatt = GattChannel::new(link.channel().clone());

    assert_eq!(23, gatt.mtu());

    assert_eq!(Ok(64), gatt.exchange_mtu(WAIT, 128));

    assert_eq!(64, gatt.mtu());

    assert_eq!(Ok(value), gatt.read(WAIT, 0x0003));

    // the MTU exchange, a read, and blob reads at 63, 126, and 189
    assert_eq!(5, link.written().len());
}

#[test]
fn write_then_read() {
    let link = Link::new(GattServer::new(23).service(0x1800).characteristic(0x0A, 0x2A00, b"old"));

    let gatt = GattChannel::new(link.channel().clone());

    assert_eq!(Ok(()), gatt.write(WAIT, 0x0003, b"new name"));

    assert_eq!(Ok(b"new name".to_vec()), gatt.read(WAIT, 0x0003));

    let mut command = gatt.command();

    command.write_command(0x0003, b"quiet");

    let (_, result) = gatt.execute(WAIT, command);

    assert_eq!(Ok(()), result);

    assert_eq!(Ok(b"quiet".to_vec()), gatt.read(WAIT, 0x0003));

    assert_eq!(0x52, link.written()[2][0]);
}
