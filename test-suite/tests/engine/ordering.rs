//! Exchanges are serviced in the order they were submitted

use bt_exchange_tests::{eventually, Datagram, Echo, Link};
use parking_lot::Mutex;
use quickcheck_macros::quickcheck;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

/// Datagrams are marked so the peer doesn't reply to them
const DATAGRAM: u8 = 0x40;

fn echo_peer(packet: &[u8]) -> Vec<Vec<u8>> {
    if packet[0] & DATAGRAM == 0 {
        vec![Echo::reply_to(packet)]
    } else {
        Vec::new()
    }
}

#[quickcheck]
fn callbacks_fire_in_submission_order(requests: Vec<bool>) -> bool {
    let requests = &requests[..requests.len().min(24)];

    let link = Link::new(echo_peer);

    let completed = Arc::new(Mutex::new(Vec::new()));

    let mut expected_packets = Vec::new();

    for (id, is_request) in requests.iter().enumerate() {
        let id = id as u8;
        let completed = completed.clone();

        if *is_request {
            let echo = Echo::new(id, &[id]);

            expected_packets.push(echo.packet());

            link.channel().send_response(WAIT, echo, move |echo, result| {
                completed.lock().push((echo.id, result.is_ok() && echo.reply == Some(vec![id])))
            });
        } else {
            let datagram = Datagram::new(&[DATAGRAM | id]);

            expected_packets.push(datagram.data.clone());

            link.channel()
                .send(WAIT, datagram, move |_, result| completed.lock().push((id, result.is_ok())));
        }
    }

    if !eventually(WAIT, || completed.lock().len() == requests.len()) {
        return false;
    }

    let completed = completed.lock();

    completed.iter().enumerate().all(|(index, (id, ok))| *ok && usize::from(*id) == index)
        && link.written() == expected_packets
}

#[test]
fn blocking_exchange_gets_the_reply() {
    let link = Link::new(echo_peer);

    let (echo, result) = link.channel().exchange_response(WAIT, Echo::new(3, b"abc"));

    assert_eq!(Ok(()), result);

    assert_eq!(Some(b"abc".to_vec()), echo.reply);

    assert_eq!(0, link.channel().pending());
}

#[test]
fn blocking_exchange_returns_once_sent() {
    let link = Link::silent();

    let (datagram, result) = link.channel().exchange(WAIT, Datagram::new(&[1, 2, 3]));

    assert_eq!(Ok(()), result);

    assert_eq!(vec![datagram.data], link.written());
}

#[test]
fn one_request_on_the_wire() {
    let link = Link::silent();

    let completed = Arc::new(Mutex::new(Vec::new()));

    for id in 0..3u8 {
        let completed = completed.clone();

        link.channel()
            .send_response(None, Echo::new(id, &[]), move |echo, result| {
                completed.lock().push((echo.id, result))
            });
    }

    assert!(eventually(WAIT, || link.written().len() == 1));

    std::thread::sleep(Duration::from_millis(20));

    assert_eq!(vec![vec![0]], link.written());

    link.inject(vec![0x80]);

    assert!(eventually(WAIT, || link.written().len() == 2));

    assert_eq!(vec![vec![0], vec![1]], link.written());

    assert_eq!(vec![(0, Ok(()))], *completed.lock());

    link.inject(vec![0x81]);

    assert!(eventually(WAIT, || link.written().len() == 3));

    assert_eq!(vec![(0, Ok(())), (1, Ok(()))], *completed.lock());

    link.inject(vec![0x82]);

    assert!(eventually(WAIT, || completed.lock().len() == 3));

    assert_eq!(3, link.written().len());
}

#[test]
fn reply_completes_unsent_head() {
    let link = Link::frozen();

    let completed = Arc::new(Mutex::new(Vec::new()));

    let sink = completed.clone();

    link.channel().send_response(None, Echo::new(0, &[]), move |echo, result| {
        sink.lock().push((echo.reply, result))
    });

    // the head consumes a matching reply whether or not it was written
    assert_eq!(2, link.channel().on_read_ready(&[0x80, 0x07]));

    assert_eq!(vec![(Some(vec![0x07]), Ok(()))], *completed.lock());

    assert!(link.written().is_empty());

    assert_eq!(0, link.channel().pending());
}

#[test]
fn other_packets_are_unsolicited() {
    let link = Link::silent();

    let unsolicited = Arc::new(Mutex::new(Vec::new()));

    let sink = unsolicited.clone();

    link.channel().set_unsolicited(move |stream: &[u8]| {
        sink.lock().push(stream.to_vec());

        stream.len()
    });

    link.channel().send_response(None, Echo::new(1, &[]), |_, _| ());

    assert!(eventually(WAIT, || link.written().len() == 1));

    // a reply to a different request leaves the pending request as it is
    link.inject(vec![0x82, 0x00]);

    assert!(eventually(WAIT, || unsolicited.lock().len() == 1));

    assert_eq!(vec![vec![0x82, 0x00]], *unsolicited.lock());

    assert_eq!(1, link.channel().pending());
}
