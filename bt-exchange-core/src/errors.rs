//! Error type of an exchange
//!
//! Every operation carried by the exchange engine resolves to a single [`Error`], whether the
//! failure happened at the transport (a timeout, the channel closing) or in the protocol (a
//! non-zero status within a correlated event, an attribute error response). The protocol level
//! detail is kept with the message itself, so a caller that needs it can read it from there.

/// Errors of the exchange engine and the protocol codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The deadline passed before the exchange was serviced
    #[error("the exchange timed out")]
    TimedOut,
    /// The exchange was revoked or the channel closed while it was pending
    #[error("the exchange was aborted")]
    AsyncAborted,
    /// The peer or the controller replied with an error status
    #[error("the exchange completed with an error status")]
    General,
    /// The channel is not open
    #[error("the connection is closed")]
    ConnectionClosed,
    /// Another operation is already running on the controller
    #[error("another operation is in progress")]
    InProgress,
    /// The requested functionality is not available
    #[error("unavailable")]
    Unavailable,
    /// An operating system error
    #[error("system error (errno {0})")]
    Io(i32),
}

pub type Result<T> = core::result::Result<T, Error>;
