//! Link Control Commands

/// Create a BR/EDR connection to a remote device
pub mod create_connection {
    use crate::command::{send_command, CommandParameter, Expect, ReturnParameter};
    use crate::events::EventCode;
    use crate::{opcodes, ConnectionHandle};
    use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
    use bt_exchange_core::Address;
    use std::time::Duration;

    const COMMAND: opcodes::HciCommand = opcodes::HciCommand::LinkControl(opcodes::LinkControl::CreateConnection);

    /// Packet types DM1, DH1, DM3, DH3, DM5 and DH5
    pub const DEFAULT_PACKET_TYPE: u16 = 0xCC18;

    #[derive(Debug, Clone, Copy)]
    pub struct CreateConnection {
        pub address: Address,
        pub packet_type: u16,
        pub page_scan_repetition_mode: u8,
        pub clock_offset: u16,
        pub allow_role_switch: bool,
    }

    impl CreateConnection {
        pub fn new(address: Address) -> Self {
            CreateConnection {
                address,
                packet_type: DEFAULT_PACKET_TYPE,
                page_scan_repetition_mode: 0x02,
                clock_offset: 0,
                allow_role_switch: true,
            }
        }
    }

    impl CommandParameter<13> for CreateConnection {
        const COMMAND: opcodes::HciCommand = COMMAND;
        fn get_parameter(&self) -> [u8; 13] {
            let mut parameter = [0u8; 13];

            parameter[0..6].copy_from_slice(self.address.as_slice());

            parameter[6..8].copy_from_slice(&self.packet_type.to_le_bytes());

            parameter[8] = self.page_scan_repetition_mode;

            // parameter[9] is reserved

            parameter[10..12].copy_from_slice(&self.clock_offset.to_le_bytes());

            parameter[12] = self.allow_role_switch.into();

            parameter
        }
    }

    /// The parameters of a Connection Complete event
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ConnectionComplete {
        pub status: u8,
        pub handle: ConnectionHandle,
        pub address: Address,
        pub link_type: u8,
        pub encryption_enabled: bool,
    }

    impl ReturnParameter for ConnectionComplete {
        fn try_from_raw(raw: &[u8]) -> Option<Self> {
            let raw = raw.get(..11)?;

            Some(ConnectionComplete {
                status: raw[0],
                handle: ConnectionHandle::try_from(u16::from_le_bytes([raw[1], raw[2]])).ok()?,
                address: Address::try_from_slice(&raw[3..9])?,
                link_type: raw[9],
                encryption_enabled: raw[10] != 0,
            })
        }
    }

    /// Send the Create Connection command
    ///
    /// This only waits for the Command Status event. The controller sends a Connection Complete
    /// event once the connection is established.
    pub fn send<T: Transport>(
        channel: &SynchronousChannel<T>,
        wait: Duration,
        parameter: CreateConnection,
    ) -> Result<()> {
        send_command(channel, wait, parameter, Expect::CommandStatus).map(|_| ())
    }

    /// Send the Create Connection command and wait for the Connection Complete event
    pub fn connect<T: Transport>(
        channel: &SynchronousChannel<T>,
        wait: Duration,
        parameter: CreateConnection,
    ) -> Result<ConnectionComplete> {
        let frame = send_command(channel, wait, parameter, Expect::Event(EventCode::ConnectionComplete))?;

        match frame.return_parameter::<ConnectionComplete>() {
            Some(complete) if complete.status == 0 => Ok(complete),
            Some(complete) => {
                log::warn!("connecting to {} failed with status {:#04x}", parameter.address, complete.status);
                Err(Error::General)
            }
            None => Err(Error::General),
        }
    }

}

/// Disconnect a remote device
pub mod disconnect {
    use crate::command::{send_command, CommandParameter, Expect};
    use crate::{opcodes, ConnectionHandle};
    use bt_exchange_channel::{Result, SynchronousChannel, Transport};
    use std::time::Duration;

    const COMMAND: opcodes::HciCommand = opcodes::HciCommand::LinkControl(opcodes::LinkControl::Disconnect);

    /// These are the error codes that are given as reasons for disconnecting
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum DisconnectReason {
        AuthenticationFailure,
        RemoteUserTerminatedConnection,
        RemoteDeviceTerminatedConnectionDueToLowResources,
        RemoteDeviceTerminatedConnectionDueToPowerOff,
        UnsupportedRemoteFeature,
        PairingWithUnitKeyNotSupported,
        UnacceptableConnectionParameters,
    }

    impl DisconnectReason {
        fn get_val(&self) -> u8 {
            match *self {
                DisconnectReason::AuthenticationFailure => 0x05,
                DisconnectReason::RemoteUserTerminatedConnection => 0x13,
                DisconnectReason::RemoteDeviceTerminatedConnectionDueToLowResources => 0x14,
                DisconnectReason::RemoteDeviceTerminatedConnectionDueToPowerOff => 0x15,
                DisconnectReason::UnsupportedRemoteFeature => 0x1A,
                DisconnectReason::PairingWithUnitKeyNotSupported => 0x29,
                DisconnectReason::UnacceptableConnectionParameters => 0x3B,
            }
        }
    }

    pub struct DisconnectParameters {
        pub connection_handle: ConnectionHandle,
        pub disconnect_reason: DisconnectReason,
    }

    impl CommandParameter<3> for DisconnectParameters {
        const COMMAND: opcodes::HciCommand = COMMAND;
        fn get_parameter(&self) -> [u8; 3] {
            let [b0, b1] = self.connection_handle.get_raw_handle().to_le_bytes();

            let b2 = self.disconnect_reason.get_val();

            [b0, b1, b2]
        }
    }

    /// Disconnect the device
    ///
    /// This returns once the controller responds with a Command Status event. This does not mean
    /// the remote device is disconnected, that is reported by a Disconnection Complete event.
    pub fn send<T: Transport>(
        channel: &SynchronousChannel<T>,
        wait: Duration,
        parameter: DisconnectParameters,
    ) -> Result<()> {
        send_command(channel, wait, parameter, Expect::CommandStatus).map(|_| ())
    }
}

/// Request the user friendly name of a remote device
pub mod remote_name_request {
    use crate::command::{send_command, CommandParameter, Expect, ReturnParameter};
    use crate::events::EventCode;
    use crate::opcodes;
    use bt_exchange_channel::{Error, Result, SynchronousChannel, Transport};
    use bt_exchange_core::Address;
    use std::time::Duration;

    const COMMAND: opcodes::HciCommand = opcodes::HciCommand::LinkControl(opcodes::LinkControl::RemoteNameRequest);

    /// The maximum size of a remote name
    pub const MAX_NAME_SIZE: usize = 248;

    struct Parameter {
        address: Address,
        page_scan_repetition_mode: u8,
        clock_offset: u16,
    }

    impl CommandParameter<10> for Parameter {
        const COMMAND: opcodes::HciCommand = COMMAND;
        fn get_parameter(&self) -> [u8; 10] {
            let mut parameter = [0u8; 10];

            parameter[..6].copy_from_slice(self.address.as_slice());

            parameter[6] = self.page_scan_repetition_mode;

            parameter[8..].copy_from_slice(&self.clock_offset.to_le_bytes());

            parameter
        }
    }

    /// The parameters of a Remote Name Request Complete event
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RemoteName {
        pub status: u8,
        pub address: Address,
        pub name: String,
    }

    impl ReturnParameter for RemoteName {
        fn try_from_raw(raw: &[u8]) -> Option<Self> {
            let status = *raw.first()?;
            let address = Address::try_from_slice(raw.get(1..7)?)?;

            let name = raw.get(7..).unwrap_or_default();
            let name = &name[..name.len().min(MAX_NAME_SIZE)];
            let end = name.iter().position(|b| *b == 0).unwrap_or(name.len());

            Some(RemoteName {
                status,
                address,
                name: String::from_utf8_lossy(&name[..end]).into_owned(),
            })
        }
    }

    /// Request the name of the device at `address`
    ///
    /// This waits for the Remote Name Request Complete event.
    pub fn send<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration, address: Address) -> Result<String> {
        let parameter = Parameter {
            address,
            page_scan_repetition_mode: 0x02,
            clock_offset: 0,
        };

        let frame = send_command(
            channel,
            wait,
            parameter,
            Expect::Event(EventCode::RemoteNameRequestComplete),
        )?;

        match frame.return_parameter::<RemoteName>() {
            Some(remote) if remote.status == 0 => Ok(remote.name),
            _ => Err(Error::General),
        }
    }

}
