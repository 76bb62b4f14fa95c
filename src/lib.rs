//! Request/response exchanges with a Bluetooth controller and its peers
//!
//! `bt-exchange` turns a packet socket into blocking or callback driven exchanges of messages.
//! The engine is protocol agnostic, the host controller interface and the attribute protocol are
//! built on top of it.
//!
//! * [`channel`] is the exchange engine, a [`SynchronousChannel`] over a [`Transport`]
//! * [`hci`] are the HCI commands and the kernel management commands of a controller
//! * [`att`] is the attribute protocol client
//! * [`linux`] are the Linux sockets used as transports
//!
//! Functionality is enabled with the features of the same name, `hci` and `att` are enabled by
//! default.
//!
//! [`SynchronousChannel`]: channel::SynchronousChannel
//! [`Transport`]: channel::Transport

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use bt_exchange_channel as channel;
pub use bt_exchange_core::{address, errors, uuid, Address, AddressType, Error, Result, Uuid};

#[cfg(feature = "hci")]
pub use bt_exchange_hci as hci;

#[cfg(feature = "att")]
pub use bt_exchange_att as att;

#[cfg(all(feature = "linux", target_os = "linux"))]
pub use bt_exchange_linux as linux;
