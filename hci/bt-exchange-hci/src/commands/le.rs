//! LE Controller Commands

use bt_exchange_core::Address;

/// Parameters of LE scanning
///
/// The interval and window are in units of 0.625 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanParameters {
    /// Zero for passive scanning, one for active scanning
    pub scan_type: u8,
    pub interval: u16,
    pub window: u16,
    pub own_address_type: u8,
    pub filter_policy: u8,
    pub filter_duplicates: bool,
}

impl ScanParameters {
    pub const PASSIVE: u8 = 0x00;
    pub const ACTIVE: u8 = 0x01;

    /// Parameters for discovering devices
    ///
    /// A limited discovery uses a slightly longer interval and window.
    pub fn discovery(limited: bool, passive: bool) -> Self {
        let timing = if limited { 0x0012 } else { 0x0010 };

        ScanParameters {
            scan_type: if passive { Self::PASSIVE } else { Self::ACTIVE },
            interval: timing,
            window: timing,
            ..Default::default()
        }
    }
}

impl Default for ScanParameters {
    fn default() -> Self {
        ScanParameters {
            scan_type: Self::ACTIVE,
            interval: 0x0010,
            window: 0x0010,
            own_address_type: 0x00,
            filter_policy: 0x00,
            filter_duplicates: true,
        }
    }
}

/// Parameters of LE advertising
///
/// The intervals are in units of 0.625 ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AdvertisingParameters {
    pub interval_min: u16,
    pub interval_max: u16,
    pub advertising_type: u8,
    pub own_address_type: u8,
    pub peer_address_type: u8,
    pub peer_address: Address,
    pub channel_map: u8,
    pub filter_policy: u8,
}

impl Default for AdvertisingParameters {
    fn default() -> Self {
        AdvertisingParameters {
            interval_min: 0x0800,
            interval_max: 0x0800,
            advertising_type: 0x00,
            own_address_type: 0x00,
            peer_address_type: 0x00,
            peer_address: Address::ANY,
            channel_map: 0x07,
            filter_policy: 0x00,
        }
    }
}

/// LE Set Scan Parameters command
pub mod set_scan_parameters {
    use super::ScanParameters;
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    struct Parameter(ScanParameters);

    impl CommandParameter<7> for Parameter {
        const COMMAND: opcodes::HciCommand = opcodes::HciCommand::LEController(opcodes::LEController::SetScanParameters);
        fn get_parameter(&self) -> [u8; 7] {
            let mut parameter = [0u8; 7];

            parameter[0] = self.0.scan_type;

            parameter[1..3].copy_from_slice(&self.0.interval.to_le_bytes());

            parameter[3..5].copy_from_slice(&self.0.window.to_le_bytes());

            parameter[5] = self.0.own_address_type;

            parameter[6] = self.0.filter_policy;

            parameter
        }
    }

    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration, parameters: &ScanParameters) -> Result<()> {
        send_command(channel, wait, Parameter(*parameters), Expect::CommandComplete).map(|_| ())
    }

}

/// LE Set Scan Enable command
pub mod set_scan_enable {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    struct Parameter {
        enable: bool,
        filter_duplicates: bool,
    }

    impl CommandParameter<2> for Parameter {
        const COMMAND: opcodes::HciCommand = opcodes::HciCommand::LEController(opcodes::LEController::SetScanEnable);
        fn get_parameter(&self) -> [u8; 2] {
            [self.enable.into(), self.filter_duplicates.into()]
        }
    }

    pub fn send<T: Transport>(
        channel: &SynchronousChannel<T>,
        wait: Duration,
        enable: bool,
        filter_duplicates: bool,
    ) -> Result<()> {
        let parameter = Parameter {
            enable,
            filter_duplicates,
        };

        send_command(channel, wait, parameter, Expect::CommandComplete).map(|_| ())
    }
}

/// LE Set Advertising Parameters command
pub mod set_advertising_parameters {
    use super::AdvertisingParameters;
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    struct Parameter(AdvertisingParameters);

    impl CommandParameter<15> for Parameter {
        const COMMAND: opcodes::HciCommand =
            opcodes::HciCommand::LEController(opcodes::LEController::SetAdvertisingParameters);
        fn get_parameter(&self) -> [u8; 15] {
            let mut parameter = [0u8; 15];

            parameter[0..2].copy_from_slice(&self.0.interval_min.to_le_bytes());

            parameter[2..4].copy_from_slice(&self.0.interval_max.to_le_bytes());

            parameter[4] = self.0.advertising_type;

            parameter[5] = self.0.own_address_type;

            parameter[6] = self.0.peer_address_type;

            parameter[7..13].copy_from_slice(self.0.peer_address.as_slice());

            parameter[13] = self.0.channel_map;

            parameter[14] = self.0.filter_policy;

            parameter
        }
    }

    pub fn send<T: Transport>(
        channel: &SynchronousChannel<T>,
        wait: Duration,
        parameters: &AdvertisingParameters,
    ) -> Result<()> {
        send_command(channel, wait, Parameter(*parameters), Expect::CommandComplete).map(|_| ())
    }
}

/// LE Set Advertising Data command
pub mod set_advertising_data {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
    use std::time::Duration;

    /// The maximum size of the advertising data
    pub const MAX_DATA_SIZE: usize = 31;

    /// AD type of a complete local name
    pub const COMPLETE_LOCAL_NAME: u8 = 0x09;

    struct Parameter {
        len: u8,
        data: [u8; MAX_DATA_SIZE],
    }

    impl CommandParameter<32> for Parameter {
        const COMMAND: opcodes::HciCommand =
            opcodes::HciCommand::LEController(opcodes::LEController::SetAdvertisingData);
        fn get_parameter(&self) -> [u8; 32] {
            let mut parameter = [0u8; 32];

            parameter[0] = self.len;

            parameter[1..].copy_from_slice(&self.data);

            parameter
        }
    }

    /// Set the advertising data
    ///
    /// `data` is a sequence of AD structures. An error is returned if it is longer than
    /// [`MAX_DATA_SIZE`].
    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration, data: &[u8]) -> Result<()> {
        if data.len() > MAX_DATA_SIZE {
            return Err(Error::General);
        }

        let mut parameter = Parameter {
            len: data.len() as u8,
            data: [0; MAX_DATA_SIZE],
        };

        parameter.data[..data.len()].copy_from_slice(data);

        send_command(channel, wait, parameter, Expect::CommandComplete).map(|_| ())
    }

    /// Create the AD structure of a complete local name
    ///
    /// The name is truncated to fit within the advertising data.
    pub fn local_name(name: &str) -> Vec<u8> {
        let name = &name.as_bytes()[..name.len().min(MAX_DATA_SIZE - 2)];

        let mut data = Vec::with_capacity(name.len() + 2);

        data.push(name.len() as u8 + 1);
        data.push(COMPLETE_LOCAL_NAME);
        data.extend_from_slice(name);

        data
    }

}

/// LE Set Advertising Enable command
pub mod set_advertising_enable {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    struct Parameter(bool);

    impl CommandParameter<1> for Parameter {
        const COMMAND: opcodes::HciCommand =
            opcodes::HciCommand::LEController(opcodes::LEController::SetAdvertisingEnable);
        fn get_parameter(&self) -> [u8; 1] {
            [self.0.into()]
        }
    }

    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration, enable: bool) -> Result<()> {
        send_command(channel, wait, Parameter(enable), Expect::CommandComplete).map(|_| ())
    }
}

/// LE Create Connection command
pub mod create_connection {
    use crate::command::{send_command, CommandParameter, Expect, ReturnParameter};
    use crate::events::LeMeta;
    use crate::{opcodes, ConnectionHandle};
    use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
    use bt_exchange_core::{Address, AddressType};
    use std::time::Duration;

    const COMMAND: opcodes::HciCommand = opcodes::HciCommand::LEController(opcodes::LEController::CreateConnection);

    #[derive(Debug, Clone, Copy)]
    pub struct ConnectionParameters {
        pub scan_interval: u16,
        pub scan_window: u16,
        pub use_white_list: bool,
        pub peer_address_type: AddressType,
        pub peer_address: Address,
        pub own_address_type: u8,
        pub connection_interval_min: u16,
        pub connection_interval_max: u16,
        pub connection_latency: u16,
        pub supervision_timeout: u16,
        pub minimum_ce_length: u16,
        pub maximum_ce_length: u16,
    }

    impl ConnectionParameters {
        pub fn new(peer_address: Address, peer_address_type: AddressType) -> Self {
            ConnectionParameters {
                scan_interval: 0x0004,
                scan_window: 0x0004,
                use_white_list: false,
                peer_address_type,
                peer_address,
                own_address_type: 0x00,
                connection_interval_min: 0x000F,
                connection_interval_max: 0x000F,
                connection_latency: 0x0000,
                supervision_timeout: 0x0C80,
                minimum_ce_length: 0x0001,
                maximum_ce_length: 0x0001,
            }
        }
    }

    impl CommandParameter<25> for ConnectionParameters {
        const COMMAND: opcodes::HciCommand = COMMAND;
        fn get_parameter(&self) -> [u8; 25] {
            let mut parameter = [0u8; 25];

            parameter[0..2].copy_from_slice(&self.scan_interval.to_le_bytes());

            parameter[2..4].copy_from_slice(&self.scan_window.to_le_bytes());

            parameter[4] = self.use_white_list.into();

            parameter[5] = self.peer_address_type.le_raw();

            parameter[6..12].copy_from_slice(self.peer_address.as_slice());

            parameter[12] = self.own_address_type;

            parameter[13..15].copy_from_slice(&self.connection_interval_min.to_le_bytes());

            parameter[15..17].copy_from_slice(&self.connection_interval_max.to_le_bytes());

            parameter[17..19].copy_from_slice(&self.connection_latency.to_le_bytes());

            parameter[19..21].copy_from_slice(&self.supervision_timeout.to_le_bytes());

            parameter[21..23].copy_from_slice(&self.minimum_ce_length.to_le_bytes());

            parameter[23..25].copy_from_slice(&self.maximum_ce_length.to_le_bytes());

            parameter
        }
    }

    /// The parameters of a LE Connection Complete event
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LeConnectionComplete {
        pub status: u8,
        pub handle: ConnectionHandle,
        pub role: u8,
        pub peer_address_type: u8,
        pub peer_address: Address,
        pub interval: u16,
        pub latency: u16,
        pub supervision_timeout: u16,
    }

    impl ReturnParameter for LeConnectionComplete {
        fn try_from_raw(raw: &[u8]) -> Option<Self> {
            let raw = raw.get(..17)?;

            Some(LeConnectionComplete {
                status: raw[0],
                handle: ConnectionHandle::try_from(u16::from_le_bytes([raw[1], raw[2]])).ok()?,
                role: raw[3],
                peer_address_type: raw[4],
                peer_address: Address::try_from_slice(&raw[5..11])?,
                interval: u16::from_le_bytes([raw[11], raw[12]]),
                latency: u16::from_le_bytes([raw[13], raw[14]]),
                supervision_timeout: u16::from_le_bytes([raw[15], raw[16]]),
            })
        }
    }

    /// Connect to a LE device and wait for the LE Connection Complete event
    pub fn send<T: Transport>(
        channel: &SynchronousChannel<T>,
        wait: Duration,
        parameters: ConnectionParameters,
    ) -> Result<LeConnectionComplete> {
        let frame = send_command(
            channel,
            wait,
            parameters,
            Expect::LeMeta(LeMeta::ConnectionComplete),
        )?;

        match frame.return_parameter::<LeConnectionComplete>() {
            Some(complete) if complete.status == 0 => Ok(complete),
            Some(complete) => {
                log::warn!(
                    "connecting to {} failed with status {:#04x}",
                    parameters.peer_address,
                    complete.status
                );
                Err(Error::General)
            }
            None => Err(Error::General),
        }
    }

}

/// LE Create Connection Cancel command
pub mod create_connection_cancel {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::opcodes;
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    #[derive(Clone, Copy)]
    struct Parameter;

    impl CommandParameter<0> for Parameter {
        const COMMAND: opcodes::HciCommand =
            opcodes::HciCommand::LEController(opcodes::LEController::CreateConnectionCancel);
        fn get_parameter(&self) -> [u8; 0] {
            []
        }
    }

    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration) -> Result<()> {
        send_command(channel, wait, Parameter, Expect::CommandComplete).map(|_| ())
    }
}

/// LE Read Remote Features command
pub mod read_remote_features {
    use crate::command::{send_command, CommandParameter, Expect, ReturnParameter};
    use crate::events::LeMeta;
    use crate::{opcodes, ConnectionHandle};
    use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
    use std::time::Duration;

    struct Parameter(ConnectionHandle);

    impl CommandParameter<2> for Parameter {
        const COMMAND: opcodes::HciCommand = opcodes::HciCommand::LEController(opcodes::LEController::ReadRemoteFeatures);
        fn get_parameter(&self) -> [u8; 2] {
            self.0.get_raw_handle().to_le_bytes()
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RemoteFeatures {
        pub status: u8,
        pub handle: ConnectionHandle,
        pub features: [u8; 8],
    }

    impl ReturnParameter for RemoteFeatures {
        fn try_from_raw(raw: &[u8]) -> Option<Self> {
            let raw = raw.get(..11)?;

            Some(RemoteFeatures {
                status: raw[0],
                handle: ConnectionHandle::try_from(u16::from_le_bytes([raw[1], raw[2]])).ok()?,
                features: raw[3..11].try_into().ok()?,
            })
        }
    }

    /// Read the LE features of a connected device
    ///
    /// This waits for the LE Read Remote Features Complete event.
    pub fn send<T: Transport>(
        channel: &SynchronousChannel<T>,
        wait: Duration,
        handle: ConnectionHandle,
    ) -> Result<[u8; 8]> {
        let frame = send_command(
            channel,
            wait,
            Parameter(handle),
            Expect::LeMeta(LeMeta::ReadRemoteFeaturesComplete),
        )?;

        match frame.return_parameter::<RemoteFeatures>() {
            Some(remote) if remote.status == 0 => Ok(remote.features),
            _ => Err(Error::General),
        }
    }
}
