//! Revoking pending exchanges

use bt_exchange_core::Error;
use bt_exchange_tests::{eventually, Datagram, Echo, Link};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn revoke_is_idempotent() {
    let link = Link::frozen();

    let results = Arc::new(Mutex::new(Vec::new()));

    let sink = results.clone();

    let ticket = link
        .channel()
        .send(None, Datagram::new(&[1]), move |_, result| sink.lock().push(result));

    link.channel().revoke(ticket);

    link.channel().revoke(ticket);

    assert_eq!(vec![Err(Error::AsyncAborted)], *results.lock());

    assert_eq!(0, link.channel().pending());
}

#[test]
fn revoking_the_head_sends_the_next() {
    let link = Link::silent();

    let first = link.channel().send_response(None, Echo::new(0, &[]), |_, _| ());

    link.channel().send_response(None, Echo::new(1, &[]), |_, _| ());

    assert!(eventually(WAIT, || link.written().len() == 1));

    link.channel().revoke(first);

    assert!(eventually(WAIT, || link.written().len() == 2));

    assert_eq!(vec![vec![0], vec![1]], link.written());

    assert_eq!(1, link.channel().pending());
}

#[test]
fn revoked_message_is_handed_back() {
    let link = Link::frozen();

    let returned = Arc::new(Mutex::new(None));

    let sink = returned.clone();

    let ticket = link
        .channel()
        .send_response(None, Echo::new(9, b"value"), move |echo, _| *sink.lock() = Some(echo));

    link.channel().revoke(ticket);

    let echo = returned.lock().take().unwrap();

    assert_eq!(b"value".to_vec(), echo.payload);

    assert_eq!(0, echo.sent);
}
