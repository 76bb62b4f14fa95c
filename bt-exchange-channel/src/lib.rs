//! Request/response exchange over a packet socket
//!
//! A [`SynchronousChannel`] turns a socket that only reports "ready to write" and "data received"
//! into two primitives for the protocols layered above it:
//!
//! * a blocking exchange, where the calling thread waits until its message was sent (and, for a
//!   request, until the matching response arrived), and
//! * a non-blocking send, where a completion callback is invoked from the thread driving the socket.
//!
//! Messages are serviced strictly in the order they were submitted and only one of them is on the
//! wire at any time. A message is *moved* into the channel when it is submitted and handed back to
//! the caller once its exchange is over, whatever the outcome.
//!
//! # Transport
//! The socket itself is represented by a [`Transport`]. Whatever owns the socket's readiness
//! notifications must call [`on_write_ready`], [`on_read_ready`], and [`state_change`] of the
//! channel. Bytes received that are not a response to the message at the head of the queue are
//! handed to the channel's [`Unsolicited`] handler.
//!
//! [`on_write_ready`]: SynchronousChannel::on_write_ready
//! [`on_read_ready`]: SynchronousChannel::on_read_ready
//! [`state_change`]: SynchronousChannel::state_change

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

mod engine;
mod queue;

pub use bt_exchange_core::{Error, Result};
pub use engine::SynchronousChannel;

use std::time::Duration;

/// The completion state of an [`Inbound`] response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundState {
    /// More data is needed before the response is complete
    InProgress,
    /// The request must be sent again from its first byte
    Resend,
    /// The response is complete
    Completed,
}

/// A message that can be sent over a [`SynchronousChannel`]
///
/// The message keeps its own cursor of how much of it was already serialized. [`reload`] resets
/// the cursor so the same message can be submitted again.
///
/// [`reload`]: Outbound::reload
pub trait Outbound: Send {
    /// The protocol identifier of the message
    fn opcode(&self) -> u16;

    /// Serialize the remaining bytes of the message into `stream`
    ///
    /// The number of bytes written is returned. Zero is returned once the complete message was
    /// serialized.
    fn serialize(&mut self, stream: &mut [u8]) -> usize;

    /// Reset the serialization cursor to the start of the message
    fn reload(&mut self);
}

/// The response to an [`Outbound`] request
pub trait Inbound: Send {
    /// Deserialize received bytes
    ///
    /// The number of bytes consumed is returned. Zero means the bytes are not part of this response.
    fn deserialize(&mut self, stream: &[u8]) -> usize;

    /// The completion state of this response
    fn state(&self) -> InboundState;

    /// The outcome of a completed response
    ///
    /// This is only called once `state` returned [`InboundState::Completed`]. A protocol error
    /// status should be reported as [`Error::General`].
    fn result(&self) -> Result<()> {
        Ok(())
    }
}

/// The socket a [`SynchronousChannel`] is built on
pub trait Transport: Send + Sync {
    /// Check if the socket is open
    fn is_open(&self) -> bool;

    /// Request that `on_write_ready` of the channel gets called
    ///
    /// This must not call into the channel from within `trigger`.
    fn trigger(&self);

    /// Close the socket, waiting at most `wait` for it to be closed
    fn close(&self, wait: Duration) -> Result<()>;
}

/// Handler of received bytes that are not part of a pending exchange
pub trait Unsolicited: Send {
    /// Deserialize unsolicited bytes, returning the number of bytes consumed
    fn deserialize(&mut self, stream: &[u8]) -> usize;
}

impl<F> Unsolicited for F
where
    F: FnMut(&[u8]) -> usize + Send,
{
    fn deserialize(&mut self, stream: &[u8]) -> usize {
        self(stream)
    }
}

/// Identifier of an exchange submitted with [`SynchronousChannel::send`]
///
/// A ticket is used to [`revoke`] the exchange.
///
/// [`revoke`]: SynchronousChannel::revoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for Ticket {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "ticket {}", self.0)
    }
}
