use crate::queue::{ExchangeQueue, Finished, Frame, Notice, PendingExchange, Request, Transmission};
use crate::{Error, Inbound, Outbound, Result, Ticket, Transport, Unsolicited};
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct State {
    queue: ExchangeQueue,
    /// Incremented on every change a blocked caller may be waiting on
    generation: u64,
}

/// Where a blocked caller gets its message back
struct Slot<M>(Mutex<Option<(M, Result<()>)>>);

impl<M> Slot<M> {
    fn new() -> Arc<Self> {
        Arc::new(Slot(Mutex::new(None)))
    }

    fn fill(&self, message: M, result: Result<()>) {
        *self.0.lock() = Some((message, result));
    }

    fn is_filled(&self) -> bool {
        self.0.lock().is_some()
    }

    fn take(&self) -> Option<(M, Result<()>)> {
        self.0.lock().take()
    }
}

/// An exchange engine over a [`Transport`]
///
/// See the [crate level documentation](crate) for how a channel is used.
///
/// All operations take `&self`, a channel is meant to be shared within an `Arc` between the thread
/// that drives the transport and the threads submitting messages.
pub struct SynchronousChannel<T> {
    transport: T,
    state: Mutex<State>,
    reevaluate: Condvar,
    unsolicited: Mutex<Option<Box<dyn Unsolicited>>>,
    tickets: AtomicU64,
}

impl<T: Transport> SynchronousChannel<T> {
    pub fn new(transport: T) -> Self {
        SynchronousChannel {
            transport,
            state: Mutex::new(State {
                queue: ExchangeQueue::default(),
                generation: 0,
            }),
            reevaluate: Condvar::new(),
            unsolicited: Mutex::new(None),
            tickets: AtomicU64::new(0),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Close the transport
    pub fn close(&self, wait: Duration) -> Result<()> {
        self.transport.close(wait)
    }

    /// Set the handler for received bytes that are not a response to a pending exchange
    pub fn set_unsolicited<U>(&self, handler: U)
    where
        U: Unsolicited + 'static,
    {
        *self.unsolicited.lock() = Some(Box::new(handler));
    }

    /// The number of exchanges within the queue
    pub fn pending(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Send a message and block until it is sent
    ///
    /// The call returns once `message` was fully serialized, the channel closed, or `wait`
    /// elapsed. `None` for `wait` means there is no deadline. The message is always handed back
    /// with the result of the exchange.
    pub fn exchange<M, W>(&self, wait: W, message: M) -> (M, Result<()>)
    where
        M: Outbound + 'static,
        W: Into<Option<Duration>>,
    {
        let slot = Slot::new();
        let filler = slot.clone();
        let frame = Notice::new(message, move |message, result| filler.fill(message, result));

        self.wait_for(wait.into(), Box::new(frame), slot)
    }

    /// Send a request and block until its response is complete
    ///
    /// This is the same as [`exchange`] except that the call only returns successfully once the
    /// response within `message` reported [`InboundState::Completed`].
    ///
    /// [`exchange`]: SynchronousChannel::exchange
    /// [`InboundState::Completed`]: crate::InboundState::Completed
    pub fn exchange_response<M, W>(&self, wait: W, message: M) -> (M, Result<()>)
    where
        M: Outbound + Inbound + 'static,
        W: Into<Option<Duration>>,
    {
        let slot = Slot::new();
        let filler = slot.clone();
        let frame = Request::new(message, move |message, result| filler.fill(message, result));

        self.wait_for(wait.into(), Box::new(frame), slot)
    }

    /// Send a message without blocking
    ///
    /// `callback` is called from the thread driving the transport once the message was sent,
    /// once `wait` elapsed before it was sent, or when the exchange was revoked.
    pub fn send<M, W, F>(&self, wait: W, message: M, callback: F) -> Ticket
    where
        M: Outbound + 'static,
        W: Into<Option<Duration>>,
        F: FnOnce(M, Result<()>) + Send + 'static,
    {
        self.enqueue(wait.into(), Box::new(Notice::new(message, callback)))
    }

    /// Send a request without blocking
    ///
    /// `callback` is called once the response within `message` is complete.
    pub fn send_response<M, W, F>(&self, wait: W, message: M, callback: F) -> Ticket
    where
        M: Outbound + Inbound + 'static,
        W: Into<Option<Duration>>,
        F: FnOnce(M, Result<()>) + Send + 'static,
    {
        self.enqueue(wait.into(), Box::new(Request::new(message, callback)))
    }

    /// Revoke a pending exchange
    ///
    /// The callback of the exchange is called with [`Error::AsyncAborted`]. Nothing happens if the
    /// exchange is no longer pending.
    pub fn revoke(&self, ticket: Ticket) {
        let mut state = self.state.lock();

        let Some((entry, was_head)) = state.queue.remove(ticket) else {
            return;
        };

        let retrigger = was_head && !state.queue.is_empty();

        drop(state);

        log::debug!("revoked exchange {}", ticket);

        self.deliver(vec![(entry.into_frame(), Err(Error::AsyncAborted))]);

        if retrigger {
            self.transport.trigger();
        }
    }

    /// Write ready callback of the transport
    ///
    /// The head of the queue serializes into `buffer`. The number of bytes to put on the wire is
    /// returned, the transport should keep calling this until zero is returned.
    pub fn on_write_ready(&self, buffer: &mut [u8]) -> usize {
        let mut state = self.state.lock();
        let mut finished = state.queue.sweep(Instant::now());
        let mut changed = false;
        let mut written = 0;

        while let Some(head) = state.queue.head() {
            if head.transmission() != Transmission::Idle {
                break;
            }

            written = head.send_data(buffer);

            if written != 0 {
                break;
            }

            changed = true;

            if head.transmission() == Transmission::Complete {
                if let Some(entry) = state.queue.pop() {
                    log::debug!("exchange {} sent", entry.ticket());

                    finished.push((entry.into_frame(), Ok(())));
                }
            } else {
                break;
            }
        }

        drop(state);

        if !finished.is_empty() {
            self.deliver(finished);
        } else if changed {
            self.reevaluate();
        }

        written
    }

    /// Read ready callback of the transport
    ///
    /// The bytes are offered to the head of the queue first, whatever it does not consume is given
    /// to the unsolicited handler. The total number of bytes consumed is returned.
    pub fn on_read_ready(&self, buffer: &[u8]) -> usize {
        let mut state = self.state.lock();
        let mut finished = state.queue.sweep(Instant::now());
        let mut consumed = 0;
        let mut trigger = false;
        let mut changed = false;

        if let Some(head) = state.queue.head() {
            let before = head.transmission();

            let (count, result) = head.receive_data(buffer);

            consumed = count;

            match result {
                Some(result) => {
                    if let Some(entry) = state.queue.pop() {
                        log::debug!("exchange {} completed", entry.ticket());

                        finished.push((entry.into_frame(), result));
                    }

                    trigger = !state.queue.is_empty();
                }
                None => {
                    let now_unsent = head.is_unsent();

                    changed = before != head.transmission();

                    // Either a resend was requested or data arrived before the head was sent
                    trigger = now_unsent;
                }
            }
        }

        drop(state);

        if !finished.is_empty() {
            self.deliver(finished);
        } else if changed {
            self.reevaluate();
        }

        if trigger {
            self.transport.trigger();
        }

        if consumed < buffer.len() {
            consumed += self.pass_unsolicited(&buffer[consumed..]);
        }

        consumed
    }

    /// State change callback of the transport
    ///
    /// When the transport is no longer open every pending exchange is aborted.
    pub fn state_change(&self) {
        if self.transport.is_open() {
            if !self.state.lock().queue.is_empty() {
                self.transport.trigger();
            }

            self.reevaluate();

            return;
        }

        let aborted: Vec<Finished> = self
            .state
            .lock()
            .queue
            .drain()
            .map(|entry| (entry.into_frame(), Err(Error::AsyncAborted)))
            .collect();

        if !aborted.is_empty() {
            log::warn!("channel closed with {} pending exchange(s)", aborted.len());
        }

        self.deliver(aborted);
    }

    fn next_ticket(&self) -> Ticket {
        Ticket(self.tickets.fetch_add(1, Ordering::Relaxed))
    }

    fn deadline(wait: Option<Duration>) -> Option<Instant> {
        wait.and_then(|wait| Instant::now().checked_add(wait))
    }

    /// Add an exchange to the end of the queue
    ///
    /// The transport is triggered when the exchange is the new head of the queue.
    fn enqueue(&self, wait: Option<Duration>, frame: Box<dyn Frame>) -> Ticket {
        let ticket = self.next_ticket();

        if !self.transport.is_open() {
            log::warn!("exchange {} submitted to a closed channel", ticket);

            frame.finish(Err(Error::ConnectionClosed));

            return ticket;
        }

        let mut state = self.state.lock();

        let expired = state.queue.sweep(Instant::now());

        state.queue.push(PendingExchange::new(ticket, frame, Self::deadline(wait)));

        let is_head = state.queue.len() == 1;

        drop(state);

        log::debug!("queued exchange {}", ticket);

        self.deliver(expired);

        if is_head {
            self.transport.trigger();
        }

        ticket
    }

    fn wait_for<M>(&self, wait: Option<Duration>, frame: Box<dyn Frame>, slot: Arc<Slot<M>>) -> (M, Result<()>) {
        let deadline = Self::deadline(wait);

        let ticket = self.enqueue(wait, frame);

        let mut state = self.state.lock();

        let failure = loop {
            if slot.is_filled() {
                break None;
            }

            if !self.transport.is_open() {
                break Some(Error::AsyncAborted);
            }

            if deadline.map_or(false, |deadline| deadline <= Instant::now()) {
                break Some(Error::TimedOut);
            }

            let generation = state.generation;

            while generation == state.generation {
                match deadline {
                    Some(deadline) => {
                        if self.reevaluate.wait_until(&mut state, deadline).timed_out() {
                            break;
                        }
                    }
                    None => self.reevaluate.wait(&mut state),
                }
            }
        };

        if let Some(error) = failure {
            let removed = state.queue.remove(ticket);

            match removed {
                Some((entry, was_head)) => {
                    let retrigger = was_head && !state.queue.is_empty();

                    drop(state);

                    log::warn!("exchange {} failed: {}", ticket, error);

                    entry.into_frame().finish(Err(error));

                    if retrigger {
                        self.transport.trigger();
                    }

                    self.reevaluate();
                }
                None => {
                    // The exchange was taken out of the queue and is being handed back
                    while !slot.is_filled() {
                        self.reevaluate.wait(&mut state);
                    }
                }
            }
        }

        match slot.take() {
            Some(exchanged) => exchanged,
            None => unreachable!("blocking exchange finished without its message"),
        }
    }

    /// Hand finished exchanges back to their owners and wake every blocked caller
    fn deliver(&self, finished: Vec<Finished>) {
        if finished.is_empty() {
            return;
        }

        for (frame, result) in finished {
            frame.finish(result);
        }

        self.reevaluate();
    }

    fn reevaluate(&self) {
        let mut state = self.state.lock();

        state.generation = state.generation.wrapping_add(1);

        self.reevaluate.notify_all();
    }

    fn pass_unsolicited(&self, stream: &[u8]) -> usize {
        match self.unsolicited.lock().as_mut() {
            Some(handler) => handler.deserialize(stream),
            None => {
                log::trace!("dropped {} unsolicited byte(s)", stream.len());

                0
            }
        }
    }
}

impl<T> Drop for SynchronousChannel<T> {
    fn drop(&mut self) {
        let pending: Vec<Box<dyn Frame>> = self.state.get_mut().queue.drain().map(|entry| entry.into_frame()).collect();

        if !pending.is_empty() {
            log::debug!("dropped channel with {} pending exchange(s)", pending.len());
        }

        for frame in pending {
            frame.finish(Err(Error::AsyncAborted));
        }
    }
}
