//! Closing the transport of a channel

use bt_exchange_channel::Transport;
use bt_exchange_core::Error;
use bt_exchange_tests::{eventually, Datagram, Echo, Link};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const WAIT: Duration = Duration::from_secs(2);

#[test]
fn hang_up_aborts_pending() {
    let link = Link::silent();

    let results = Arc::new(Mutex::new(Vec::new()));

    for id in 0..2 {
        let sink = results.clone();

        link.channel()
            .send_response(None, Echo::new(id, &[]), move |echo, result| sink.lock().push((echo.id, result)));
    }

    assert!(eventually(WAIT, || link.written().len() == 1));

    link.hang_up();

    assert!(eventually(WAIT, || results.lock().len() == 2));

    assert_eq!(
        vec![(0, Err(Error::AsyncAborted)), (1, Err(Error::AsyncAborted))],
        *results.lock()
    );

    assert!(!link.channel().is_open());
}

#[test]
fn blocked_caller_is_woken() {
    let link = Link::silent();

    let channel = link.channel().clone();

    let caller = std::thread::spawn(move || channel.exchange_response(None, Echo::new(1, &[])).1);

    assert!(eventually(WAIT, || link.written().len() == 1));

    link.hang_up();

    assert_eq!(Err(Error::AsyncAborted), caller.join().unwrap());
}

#[test]
fn submit_after_close() {
    let link = Link::silent();

    assert_eq!(Ok(()), link.channel().close(WAIT));

    assert!(link.is_stopped(WAIT));

    assert!(!link.channel().transport().is_open());

    let (_, result) = link.channel().exchange(WAIT, Datagram::new(&[1]));

    assert_eq!(Err(Error::ConnectionClosed), result);
}
