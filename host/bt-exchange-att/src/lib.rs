//! Attribute protocol client over a [`SynchronousChannel`]
//!
//! A [`Command`] is one request to an attribute server along with the accumulator of the server's
//! response. Commands are run through a [`GattChannel`], which tracks the MTU of the link, and a
//! [`Profile`] is the result of discovering the services of a server.
//!
//! ```
//! # use bt_exchange_att::{Command, pdu::DEFAULT_MTU};
//! # use bt_exchange_core::Uuid;
//! let mut command = Command::new(DEFAULT_MTU);
//!
//! // the read by type request is answered with a read by type response
//! assert_eq!(0x09, command.read_by_type(0x0001, 0xFFFF, Uuid::from_u16(0x2A00)));
//! ```
//!
//! [`SynchronousChannel`]: bt_exchange_channel::SynchronousChannel

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod client;
pub mod command;
pub mod pdu;
pub mod profile;
pub mod response;

pub use client::{GattChannel, ValueHandler};
pub use command::Command;
pub use pdu::ErrorCode;
pub use profile::{Characteristic, Descriptor, Profile, Service};
pub use response::Response;
