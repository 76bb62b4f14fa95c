//! A response asking for its request to be sent again

use bt_exchange_tests::{Echo, Link};
use std::time::Duration;

#[test]
fn resend_starts_from_the_first_byte() {
    let mut resent = false;

    let link = Link::new(move |packet: &[u8]| {
        if resent {
            vec![Echo::reply_to(packet)]
        } else {
            resent = true;

            vec![vec![packet[0] | 0x80, Echo::RESEND]]
        }
    });

    let (echo, result) = link
        .channel()
        .exchange_response(Duration::from_secs(2), Echo::new(5, &[1, 2]));

    assert_eq!(Ok(()), result);

    assert_eq!(2, echo.sent);

    assert_eq!(Some(vec![1, 2]), echo.reply);

    assert_eq!(vec![vec![5, 1, 2], vec![5, 1, 2]], link.written());
}
