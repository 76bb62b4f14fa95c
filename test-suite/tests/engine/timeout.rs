//! Exchanges that are not serviced in time

use bt_exchange_core::Error;
use bt_exchange_tests::{eventually, Datagram, Echo, Link};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[test]
fn exchange_on_frozen_transport() {
    let link = Link::frozen();

    let start = Instant::now();

    let (_, result) = link.channel().exchange(Duration::from_millis(100), Datagram::new(&[0xAA]));

    let elapsed = start.elapsed();

    assert_eq!(Err(Error::TimedOut), result);

    assert!(elapsed >= Duration::from_millis(100), "returned after {:?}", elapsed);

    assert!(elapsed < Duration::from_millis(500), "returned after {:?}", elapsed);

    assert_eq!(0, link.channel().pending());

    assert!(link.written().is_empty());
}

#[test]
fn response_never_arrives() {
    let link = Link::silent();

    let (echo, result) = link.channel().exchange_response(Duration::from_millis(50), Echo::new(7, &[1]));

    assert_eq!(Err(Error::TimedOut), result);

    assert_eq!(None, echo.reply);

    assert_eq!(1, echo.sent);

    assert_eq!(0, link.channel().pending());
}

#[test]
fn callback_never_fires_before_deadline() {
    let link = Link::frozen();

    let deadline = Duration::from_millis(50);

    let fired = Arc::new(Mutex::new(None));

    let submitted = Instant::now();

    let sink = fired.clone();

    link.channel()
        .send(deadline, Datagram::new(&[1]), move |_, result| *sink.lock() = Some((Instant::now(), result)));

    std::thread::sleep(Duration::from_millis(20));

    // deadlines are checked whenever the queue is touched
    link.channel().send(None, Datagram::new(&[2]), |_, _| ());

    assert!(fired.lock().is_none());

    std::thread::sleep(Duration::from_millis(60));

    link.channel().send(None, Datagram::new(&[3]), |_, _| ());

    assert!(eventually(Duration::from_secs(1), || fired.lock().is_some()));

    let (at, result) = fired.lock().take().unwrap();

    assert_eq!(Err(Error::TimedOut), result);

    assert!(at.duration_since(submitted) >= deadline);

    assert_eq!(2, link.channel().pending());
}
