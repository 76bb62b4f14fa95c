//! Host controller interface over a [`SynchronousChannel`]
//!
//! Commands sent to the controller are [`CommandFrame`]s, each one carrying the correlator of the
//! event that ends the command. Commands of the kernel management interface are
//! [`ManagementFrame`]s. The [`Controller`] puts both together for the operations of a local
//! adapter (scanning, advertising, and pairing).
//!
//! [`SynchronousChannel`]: bt_exchange_channel::SynchronousChannel
//! [`CommandFrame`]: command::CommandFrame
//! [`ManagementFrame`]: management::ManagementFrame
//! [`Controller`]: controller::Controller

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod command;
pub mod commands;
pub mod controller;
pub mod discovery;
pub mod events;
pub mod management;
pub mod opcodes;

pub use command::{send_command, CommandFrame, CommandParameter, Expect, ReturnParameter};
pub use controller::{Controller, Inquiry};
pub use discovery::{DiscoveredDevice, Discovery};
pub use management::{ManagementFrame, ManagementParameter};

use core::fmt;

/// A connection handle
///
/// The handle assigned by the controller to a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConnectionHandle {
    handle: u16,
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.handle)
    }
}

impl fmt::LowerHex for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:x}", self.handle)
    }
}

impl ConnectionHandle {
    pub const MAX: u16 = 0x0EFF;

    const ERROR: &'static str = "Raw connection handle value larger then the maximum (0x0EFF)";

    pub fn get_raw_handle(&self) -> u16 {
        self.handle
    }
}

impl TryFrom<u16> for ConnectionHandle {
    type Error = &'static str;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        if raw <= ConnectionHandle::MAX {
            Ok(ConnectionHandle { handle: raw })
        } else {
            Err(Self::ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_handle_bounds() {
        assert_eq!(Ok(0x0EFF), ConnectionHandle::try_from(0x0EFF).map(|h| h.get_raw_handle()));

        assert!(ConnectionHandle::try_from(0x0F00).is_err());
    }
}
