//! The queue of pending exchanges

use crate::{Inbound, Outbound, Result, Ticket};
use std::collections::VecDeque;
use std::time::Instant;

/// A type erased exchange
///
/// This is what is actually stored within the queue. The implementations bind a message to the
/// callback that gets the message back once the exchange is over.
pub(crate) trait Frame: Send {
    fn outbound(&mut self) -> &mut dyn Outbound;

    fn inbound(&mut self) -> Option<&mut dyn Inbound>;

    /// Hand the message back to its owner
    fn finish(self: Box<Self>, result: Result<()>);
}

/// An exchange without a response
pub(crate) struct Notice<M, F> {
    message: M,
    done: F,
}

impl<M, F> Notice<M, F> {
    pub(crate) fn new(message: M, done: F) -> Self {
        Notice { message, done }
    }
}

impl<M, F> Frame for Notice<M, F>
where
    M: Outbound,
    F: FnOnce(M, Result<()>) + Send,
{
    fn outbound(&mut self) -> &mut dyn Outbound {
        &mut self.message
    }

    fn inbound(&mut self) -> Option<&mut dyn Inbound> {
        None
    }

    fn finish(self: Box<Self>, result: Result<()>) {
        let Notice { message, done } = *self;

        done(message, result)
    }
}

/// An exchange where the message is both the request and its response
pub(crate) struct Request<M, F> {
    message: M,
    done: F,
}

impl<M, F> Request<M, F> {
    pub(crate) fn new(message: M, done: F) -> Self {
        Request { message, done }
    }
}

impl<M, F> Frame for Request<M, F>
where
    M: Outbound + Inbound,
    F: FnOnce(M, Result<()>) + Send,
{
    fn outbound(&mut self) -> &mut dyn Outbound {
        &mut self.message
    }

    fn inbound(&mut self) -> Option<&mut dyn Inbound> {
        Some(&mut self.message)
    }

    fn finish(self: Box<Self>, result: Result<()>) {
        let Request { message, done } = *self;

        done(message, result)
    }
}

/// Transmission state of a pending exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transmission {
    /// Not (fully) serialized
    Idle,
    /// Fully serialized, waiting on the response
    Sending,
    Complete,
}

pub(crate) struct PendingExchange {
    ticket: Ticket,
    frame: Box<dyn Frame>,
    deadline: Option<Instant>,
    transmission: Transmission,
    started: bool,
}

impl PendingExchange {
    pub(crate) fn new(ticket: Ticket, frame: Box<dyn Frame>, deadline: Option<Instant>) -> Self {
        PendingExchange {
            ticket,
            frame,
            deadline,
            transmission: Transmission::Idle,
            started: false,
        }
    }

    pub(crate) fn ticket(&self) -> Ticket {
        self.ticket
    }

    pub(crate) fn transmission(&self) -> Transmission {
        self.transmission
    }

    /// Check if no byte of this exchange was put on the wire yet
    pub(crate) fn is_unsent(&self) -> bool {
        self.transmission == Transmission::Idle && !self.started
    }

    pub(crate) fn has_inbound(&mut self) -> bool {
        self.frame.inbound().is_some()
    }

    pub(crate) fn is_expired(&self, now: Instant) -> bool {
        self.deadline.map_or(false, |deadline| deadline <= now)
    }

    /// Serialize the next part of the outbound message
    ///
    /// When the message was already fully serialized the transmission state moves to `Sending`, or
    /// to `Complete` when there is no response to wait for.
    pub(crate) fn send_data(&mut self, stream: &mut [u8]) -> usize {
        debug_assert_eq!(Transmission::Idle, self.transmission);

        let written = self.frame.outbound().serialize(stream);

        if written != 0 {
            self.started = true;
        } else if self.has_inbound() {
            self.transmission = Transmission::Sending;
        } else {
            self.transmission = Transmission::Complete;
        }

        written
    }

    /// Hand received data to the inbound response
    ///
    /// The number of bytes consumed and the result of a completed response are returned.
    pub(crate) fn receive_data(&mut self, stream: &[u8]) -> (usize, Option<Result<()>>) {
        let Some(inbound) = self.frame.inbound() else {
            return (0, None);
        };

        let consumed = inbound.deserialize(stream);

        match inbound.state() {
            crate::InboundState::InProgress => (consumed, None),
            crate::InboundState::Resend => {
                self.transmission = Transmission::Idle;
                self.started = false;
                self.frame.outbound().reload();

                (consumed, None)
            }
            crate::InboundState::Completed => {
                let result = inbound.result();

                self.transmission = Transmission::Complete;

                (consumed, Some(result))
            }
        }
    }

    pub(crate) fn into_frame(self) -> Box<dyn Frame> {
        self.frame
    }
}

/// A finished exchange waiting to be handed back to its owner
pub(crate) type Finished = (Box<dyn Frame>, Result<()>);

/// First in, first out queue of pending exchanges
///
/// Only the head of the queue is ever transmitting or receiving.
#[derive(Default)]
pub(crate) struct ExchangeQueue {
    entries: VecDeque<PendingExchange>,
}

impl ExchangeQueue {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn push(&mut self, entry: PendingExchange) {
        self.entries.push_back(entry)
    }

    pub(crate) fn head(&mut self) -> Option<&mut PendingExchange> {
        self.entries.front_mut()
    }

    pub(crate) fn pop(&mut self) -> Option<PendingExchange> {
        self.entries.pop_front()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, ticket: Ticket) -> bool {
        self.entries.iter().any(|entry| entry.ticket == ticket)
    }

    /// Remove the entry with `ticket`
    ///
    /// The removed entry and whether it was the head of the queue are returned.
    pub(crate) fn remove(&mut self, ticket: Ticket) -> Option<(PendingExchange, bool)> {
        let index = self.entries.iter().position(|entry| entry.ticket == ticket)?;

        self.entries.remove(index).map(|entry| (entry, index == 0))
    }

    /// Remove every entry that expired before any of it was sent
    pub(crate) fn sweep(&mut self, now: Instant) -> Vec<Finished> {
        let mut expired = Vec::new();
        let mut index = 0;

        while index < self.entries.len() {
            if self.entries[index].is_unsent() && self.entries[index].is_expired(now) {
                if let Some(entry) = self.entries.remove(index) {
                    log::debug!("exchange {} expired before it was sent", entry.ticket);

                    expired.push((entry.into_frame(), Err(crate::Error::TimedOut)));
                }
            } else {
                index += 1;
            }
        }

        expired
    }

    /// Remove all entries
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = PendingExchange> + '_ {
        self.entries.drain(..)
    }

    /// The number of entries that are fully sent and waiting on their response
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| entry.transmission == Transmission::Sending)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Error, InboundState};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// A message of `len` bytes, the response is complete after `response` bytes were received
    struct Dummy {
        len: usize,
        offset: usize,
        response: usize,
        received: usize,
        resend_once: bool,
    }

    impl Dummy {
        fn new(len: usize, response: usize) -> Self {
            Dummy {
                len,
                offset: 0,
                response,
                received: 0,
                resend_once: false,
            }
        }
    }

    impl Outbound for Dummy {
        fn opcode(&self) -> u16 {
            0x1234
        }

        fn serialize(&mut self, stream: &mut [u8]) -> usize {
            let size = (self.len - self.offset).min(stream.len());

            stream[..size].fill(0xAA);

            self.offset += size;

            size
        }

        fn reload(&mut self) {
            self.offset = 0;
        }
    }

    impl Inbound for Dummy {
        fn deserialize(&mut self, stream: &[u8]) -> usize {
            self.received += stream.len();

            stream.len()
        }

        fn state(&self) -> InboundState {
            if self.resend_once && self.received >= self.response {
                InboundState::Resend
            } else if self.received >= self.response {
                InboundState::Completed
            } else {
                InboundState::InProgress
            }
        }
    }

    type Log = Arc<Mutex<Vec<(usize, Result<()>)>>>;

    fn notice(log: &Log, id: usize, len: usize) -> Box<dyn Frame> {
        let log = log.clone();

        Box::new(Notice::new(Dummy::new(len, 0), move |_, result| {
            log.lock().unwrap().push((id, result))
        }))
    }

    fn request(log: &Log, id: usize, dummy: Dummy) -> Box<dyn Frame> {
        let log = log.clone();

        Box::new(Request::new(dummy, move |_, result| log.lock().unwrap().push((id, result))))
    }

    #[test]
    fn notice_completes_once_serialized() {
        let log = Log::default();
        let mut entry = PendingExchange::new(Ticket(0), notice(&log, 0, 4), None);
        let buffer = &mut [0u8; 3];

        assert_eq!(3, entry.send_data(buffer));

        assert!(!entry.is_unsent());

        assert_eq!(1, entry.send_data(buffer));

        assert_eq!(Transmission::Idle, entry.transmission());

        assert_eq!(0, entry.send_data(buffer));

        assert_eq!(Transmission::Complete, entry.transmission());
    }

    #[test]
    fn request_waits_on_response() {
        let log = Log::default();
        let mut entry = PendingExchange::new(Ticket(0), request(&log, 0, Dummy::new(2, 3)), None);
        let buffer = &mut [0u8; 8];

        assert_eq!(2, entry.send_data(buffer));

        assert_eq!(0, entry.send_data(buffer));

        assert_eq!(Transmission::Sending, entry.transmission());

        assert_eq!((2, None), entry.receive_data(&[1, 2]));

        assert_eq!(Transmission::Sending, entry.transmission());

        assert_eq!((1, Some(Ok(()))), entry.receive_data(&[3]));

        assert_eq!(Transmission::Complete, entry.transmission());
    }

    #[test]
    fn resend_starts_from_first_byte() {
        let log = Log::default();
        let mut dummy = Dummy::new(4, 1);

        dummy.resend_once = true;

        let mut entry = PendingExchange::new(Ticket(0), request(&log, 0, dummy), None);
        let buffer = &mut [0u8; 8];

        assert_eq!(4, entry.send_data(buffer));

        assert_eq!(0, entry.send_data(buffer));

        entry.receive_data(&[0]);

        assert!(entry.is_unsent());

        assert_eq!(4, entry.send_data(buffer));
    }

    #[test]
    fn sweep_only_removes_unsent_expired_entries() {
        let log = Log::default();
        let mut queue = ExchangeQueue::default();
        let past = Instant::now() - Duration::from_millis(10);
        let future = Instant::now() + Duration::from_secs(60);

        queue.push(PendingExchange::new(Ticket(0), notice(&log, 0, 4), Some(past)));
        queue.push(PendingExchange::new(Ticket(1), notice(&log, 1, 4), Some(future)));
        queue.push(PendingExchange::new(Ticket(2), notice(&log, 2, 4), Some(past)));
        queue.push(PendingExchange::new(Ticket(3), notice(&log, 3, 4), None));

        // started entries are never swept
        queue.head().unwrap().send_data(&mut [0u8; 2]);

        let expired = queue.sweep(Instant::now());

        assert_eq!(1, expired.len());

        for (frame, result) in expired {
            frame.finish(result);
        }

        assert_eq!(vec![(2, Err(Error::TimedOut))], *log.lock().unwrap());

        assert_eq!(3, queue.len());

        assert!(!queue.contains(Ticket(2)));
    }

    #[test]
    fn remove_reports_head() {
        let log = Log::default();
        let mut queue = ExchangeQueue::default();

        for id in 0..3 {
            queue.push(PendingExchange::new(Ticket(id), notice(&log, id as usize, 1), None));
        }

        assert!(matches!(queue.remove(Ticket(1)), Some((_, false))));

        assert!(queue.remove(Ticket(1)).is_none());

        assert!(matches!(queue.remove(Ticket(0)), Some((_, true))));

        assert_eq!(Some(Ticket(2)), queue.head().map(|entry| entry.ticket()));

        assert_eq!(0, queue.in_flight());
    }
}
