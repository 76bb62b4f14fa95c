//! Kernel management interface
//!
//! The management interface is the control channel of the Linux Bluetooth subsystem. Commands and
//! events share the same header, all fields are little endian.
//!
//! ```text
//! [opcode or event code:2][controller index:2][parameter length:2][parameters ...]
//! ```
//!
//! A command is answered with either a *command complete* event or a *command status* event that
//! carries the opcode of the command.

use bt_exchange_channel::{Error, Inbound, InboundState, Outbound, Result, SynchronousChannel, Transport};
use bt_exchange_core::{Address, AddressType};
use std::time::Duration;

/// Size of the header of a management packet
pub const HEADER_SIZE: usize = 6;

/// Controller index used for commands that are not for a specific controller
pub const INDEX_NONE: u16 = 0xFFFF;

/// Event code of a command complete event
pub const EVENT_COMMAND_COMPLETE: u16 = 0x0001;

/// Event code of a command status event
pub const EVENT_COMMAND_STATUS: u16 = 0x0002;

/// Opcodes of the management commands
pub mod opcodes {
    pub const READ_INFO: u16 = 0x0004;
    pub const SET_POWERED: u16 = 0x0005;
    pub const SET_CONNECTABLE: u16 = 0x0007;
    pub const PAIR_DEVICE: u16 = 0x0019;
    pub const UNPAIR_DEVICE: u16 = 0x001B;
    pub const ADD_DEVICE: u16 = 0x0033;
    pub const REMOVE_DEVICE: u16 = 0x0034;
}

/// The parameter of a management command
pub trait ManagementParameter<const N: usize> {
    const OPCODE: u16;

    fn get_parameter(&self) -> [u8; N];
}

/// A parsed management packet header
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Header {
    pub code: u16,
    pub index: u16,
    pub len: u16,
}

impl Header {
    pub fn try_from_raw(raw: &[u8]) -> Option<Self> {
        let raw = raw.get(..HEADER_SIZE)?;

        Some(Header {
            code: u16::from_le_bytes([raw[0], raw[1]]),
            index: u16::from_le_bytes([raw[2], raw[3]]),
            len: u16::from_le_bytes([raw[4], raw[5]]),
        })
    }
}

/// A management command and the correlator for its response
pub struct ManagementFrame<P, const N: usize> {
    parameter: P,
    index: u16,
    packet: Vec<u8>,
    offset: usize,
    status: Option<u8>,
    response: Vec<u8>,
    state: InboundState,
}

impl<P, const N: usize> ManagementFrame<P, N>
where
    P: ManagementParameter<N>,
{
    pub fn new(index: u16, parameter: P) -> Self {
        let mut packet = Vec::with_capacity(HEADER_SIZE + N);

        packet.extend_from_slice(&P::OPCODE.to_le_bytes());
        packet.extend_from_slice(&index.to_le_bytes());
        packet.extend_from_slice(&(N as u16).to_le_bytes());
        packet.extend_from_slice(&parameter.get_parameter());

        ManagementFrame {
            parameter,
            index,
            packet,
            offset: 0,
            status: None,
            response: Vec::new(),
            state: InboundState::InProgress,
        }
    }

    pub fn parameter(&self) -> &P {
        &self.parameter
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    /// The status of the command, if it was answered
    pub fn status(&self) -> Option<u8> {
        self.status
    }

    /// The return parameters of a command complete event
    pub fn response(&self) -> &[u8] {
        &self.response
    }
}

impl<P, const N: usize> Outbound for ManagementFrame<P, N>
where
    P: ManagementParameter<N> + Send,
{
    fn opcode(&self) -> u16 {
        P::OPCODE
    }

    fn serialize(&mut self, stream: &mut [u8]) -> usize {
        let size = (self.packet.len() - self.offset).min(stream.len());

        stream[..size].copy_from_slice(&self.packet[self.offset..self.offset + size]);

        self.offset += size;

        size
    }

    fn reload(&mut self) {
        self.offset = 0;
    }
}

impl<P, const N: usize> Inbound for ManagementFrame<P, N>
where
    P: ManagementParameter<N> + Send,
{
    fn deserialize(&mut self, stream: &[u8]) -> usize {
        let Some(header) = Header::try_from_raw(stream) else {
            return 0;
        };

        let size = HEADER_SIZE + usize::from(header.len);

        let Some(parameters) = stream.get(HEADER_SIZE..size) else {
            log::trace!("incomplete management packet");
            return 0;
        };

        if header.index != self.index || parameters.len() < 3 {
            return 0;
        }

        let opcode = u16::from_le_bytes([parameters[0], parameters[1]]);
        let status = parameters[2];

        if opcode != P::OPCODE {
            return 0;
        }

        match header.code {
            EVENT_COMMAND_COMPLETE => {
                self.status = Some(status);
                self.response.clear();
                self.response.extend_from_slice(&parameters[3..]);
                self.state = InboundState::Completed;
            }
            EVENT_COMMAND_STATUS if status != 0 => {
                self.status = Some(status);
                self.state = InboundState::Completed;
            }
            EVENT_COMMAND_STATUS => log::trace!("management command {:#06x} is pending", opcode),
            _ => return 0,
        }

        size
    }

    fn state(&self) -> InboundState {
        self.state
    }

    fn result(&self) -> Result<()> {
        match self.status {
            Some(status) if status != 0 => Err(Error::General),
            _ => Ok(()),
        }
    }
}

/// Send a management command and wait for its response
pub fn send_management<T, P, const N: usize>(
    channel: &SynchronousChannel<T>,
    wait: Duration,
    index: u16,
    parameter: P,
) -> Result<ManagementFrame<P, N>>
where
    T: Transport,
    P: ManagementParameter<N> + Send + 'static,
{
    let (frame, result) = channel.exchange_response(wait, ManagementFrame::new(index, parameter));

    if let Err(e) = result {
        match frame.status() {
            Some(status) => log::warn!("management command {:#06x} failed with status {:#04x}", P::OPCODE, status),
            None => log::warn!("management command {:#06x} failed: {}", P::OPCODE, e),
        }
    }

    result.map(|_| frame)
}

/// The input and output capabilities of the local device used for pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IoCapability {
    DisplayOnly,
    DisplayYesNo,
    KeyboardOnly,
    NoInputNoOutput,
    KeyboardDisplay,
}

impl IoCapability {
    pub const fn into_raw(self) -> u8 {
        match self {
            IoCapability::DisplayOnly => 0x00,
            IoCapability::DisplayYesNo => 0x01,
            IoCapability::KeyboardOnly => 0x02,
            IoCapability::NoInputNoOutput => 0x03,
            IoCapability::KeyboardDisplay => 0x04,
        }
    }
}

/// Action for auto connecting a device added with [`AddDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AutoConnect {
    /// Background scan for the device and report it
    Report,
    /// Allow the device to connect
    AllowIncoming,
    /// Auto connect to the device
    AutoConnect,
}

impl AutoConnect {
    pub const fn into_raw(self) -> u8 {
        match self {
            AutoConnect::Report => 0x00,
            AutoConnect::AllowIncoming => 0x01,
            AutoConnect::AutoConnect => 0x02,
        }
    }
}

fn address_parameter<const N: usize>(address: &Address, address_type: AddressType) -> [u8; N] {
    let mut parameter = [0u8; N];

    parameter[..6].copy_from_slice(address.as_slice());

    parameter[6] = address_type.into_raw();

    parameter
}

/// Read Controller Information command
#[derive(Debug, Clone, Copy)]
pub struct ReadInfo;

impl ManagementParameter<0> for ReadInfo {
    const OPCODE: u16 = opcodes::READ_INFO;

    fn get_parameter(&self) -> [u8; 0] {
        []
    }
}

/// Settings bits of [`ControllerInfo`]
pub mod settings {
    pub const POWERED: u32 = 1 << 0;
    pub const CONNECTABLE: u32 = 1 << 1;
    pub const FAST_CONNECTABLE: u32 = 1 << 2;
    pub const DISCOVERABLE: u32 = 1 << 3;
    pub const BONDABLE: u32 = 1 << 4;
    pub const LINK_SECURITY: u32 = 1 << 5;
    pub const SSP: u32 = 1 << 6;
    pub const BR_EDR: u32 = 1 << 7;
    pub const HIGH_SPEED: u32 = 1 << 8;
    pub const LOW_ENERGY: u32 = 1 << 9;
    pub const ADVERTISING: u32 = 1 << 10;
    pub const SECURE_CONNECTIONS: u32 = 1 << 11;
}

/// The return parameters of [`ReadInfo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerInfo {
    pub address: Address,
    pub version: u8,
    pub manufacturer: u16,
    pub supported_settings: u32,
    pub current_settings: u32,
    pub class_of_device: [u8; 3],
    pub name: String,
    pub short_name: String,
}

impl ControllerInfo {
    const NAME_SIZE: usize = 249;
    const SHORT_NAME_SIZE: usize = 11;
    const SIZE: usize = 20 + Self::NAME_SIZE + Self::SHORT_NAME_SIZE;

    pub fn try_from_raw(raw: &[u8]) -> Option<Self> {
        let raw = raw.get(..Self::SIZE)?;

        let name_end = 20 + Self::NAME_SIZE;

        Some(ControllerInfo {
            address: Address::try_from_slice(&raw[..6])?,
            version: raw[6],
            manufacturer: u16::from_le_bytes([raw[7], raw[8]]),
            supported_settings: u32::from_le_bytes(raw[9..13].try_into().ok()?),
            current_settings: u32::from_le_bytes(raw[13..17].try_into().ok()?),
            class_of_device: raw[17..20].try_into().ok()?,
            name: nul_terminated(&raw[20..name_end]),
            short_name: nul_terminated(&raw[name_end..]),
        })
    }

    pub fn is_powered(&self) -> bool {
        self.current_settings & settings::POWERED != 0
    }
}

fn nul_terminated(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());

    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Set Powered command
#[derive(Debug, Clone, Copy)]
pub struct SetPowered(pub bool);

impl ManagementParameter<1> for SetPowered {
    const OPCODE: u16 = opcodes::SET_POWERED;

    fn get_parameter(&self) -> [u8; 1] {
        [self.0.into()]
    }
}

/// Set Connectable command
#[derive(Debug, Clone, Copy)]
pub struct SetConnectable(pub bool);

impl ManagementParameter<1> for SetConnectable {
    const OPCODE: u16 = opcodes::SET_CONNECTABLE;

    fn get_parameter(&self) -> [u8; 1] {
        [self.0.into()]
    }
}

/// Pair Device command
#[derive(Debug, Clone, Copy)]
pub struct PairDevice {
    pub address: Address,
    pub address_type: AddressType,
    pub io_capability: IoCapability,
}

impl ManagementParameter<8> for PairDevice {
    const OPCODE: u16 = opcodes::PAIR_DEVICE;

    fn get_parameter(&self) -> [u8; 8] {
        let mut parameter: [u8; 8] = address_parameter(&self.address, self.address_type);

        parameter[7] = self.io_capability.into_raw();

        parameter
    }
}

/// Unpair Device command
#[derive(Debug, Clone, Copy)]
pub struct UnpairDevice {
    pub address: Address,
    pub address_type: AddressType,
    /// Terminate the connection to the device
    pub disconnect: bool,
}

impl ManagementParameter<8> for UnpairDevice {
    const OPCODE: u16 = opcodes::UNPAIR_DEVICE;

    fn get_parameter(&self) -> [u8; 8] {
        let mut parameter: [u8; 8] = address_parameter(&self.address, self.address_type);

        parameter[7] = self.disconnect.into();

        parameter
    }
}

/// Add Device command
#[derive(Debug, Clone, Copy)]
pub struct AddDevice {
    pub address: Address,
    pub address_type: AddressType,
    pub action: AutoConnect,
}

impl ManagementParameter<8> for AddDevice {
    const OPCODE: u16 = opcodes::ADD_DEVICE;

    fn get_parameter(&self) -> [u8; 8] {
        let mut parameter: [u8; 8] = address_parameter(&self.address, self.address_type);

        parameter[7] = self.action.into_raw();

        parameter
    }
}

/// Remove Device command
#[derive(Debug, Clone, Copy)]
pub struct RemoveDevice {
    pub address: Address,
    pub address_type: AddressType,
}

impl ManagementParameter<7> for RemoveDevice {
    const OPCODE: u16 = opcodes::REMOVE_DEVICE;

    fn get_parameter(&self) -> [u8; 7] {
        address_parameter(&self.address, self.address_type)
    }
}

/// Read the information of the controller at `index`
pub fn read_info<T: Transport>(channel: &SynchronousChannel<T>, wait: Duration, index: u16) -> Result<ControllerInfo> {
    let frame = send_management(channel, wait, index, ReadInfo)?;

    ControllerInfo::try_from_raw(frame.response()).ok_or(Error::General)
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    fn serialized<P: ManagementParameter<N> + Send, const N: usize>(frame: &mut ManagementFrame<P, N>) -> Vec<u8> {
        let mut buffer = [0u8; 64];

        let size = frame.serialize(&mut buffer);

        buffer[..size].to_vec()
    }

    #[test]
    fn pair_device_packet() {
        let pair = PairDevice {
            address: Address::from_bytes([1, 2, 3, 4, 5, 6]),
            address_type: AddressType::LeRandom,
            io_capability: IoCapability::NoInputNoOutput,
        };

        let mut frame = ManagementFrame::new(0, pair);

        assert_eq!(
            vec![0x19, 0x00, 0x00, 0x00, 0x08, 0x00, 1, 2, 3, 4, 5, 6, 0x02, 0x03],
            serialized(&mut frame)
        );
    }

    #[test]
    fn command_complete() {
        let mut frame = ManagementFrame::new(1, SetPowered(true));

        // command complete for another controller
        assert_eq!(0, frame.deserialize(&[0x01, 0x00, 0x00, 0x00, 0x04, 0x00, 0x05, 0x00, 0x00, 0x01]));

        let event = [0x01, 0x00, 0x01, 0x00, 0x07, 0x00, 0x05, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00];

        assert_eq!(event.len(), frame.deserialize(&event));

        assert_eq!(InboundState::Completed, frame.state());

        assert_eq!(Ok(()), frame.result());

        assert_eq!(&[0x01, 0x00, 0x00, 0x00], frame.response());
    }

    #[test]
    fn command_status() {
        let mut frame = ManagementFrame::new(0, ReadInfo);

        let pending = [0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x04, 0x00, 0x00];

        assert_eq!(pending.len(), frame.deserialize(&pending));

        assert_eq!(InboundState::InProgress, frame.state());

        let failed = [0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x04, 0x00, 0x11];

        frame.deserialize(&failed);

        assert_eq!(InboundState::Completed, frame.state());

        assert_eq!(Err(Error::General), frame.result());
    }

    #[test]
    fn other_opcode_is_ignored() {
        let mut frame = ManagementFrame::new(0, ReadInfo);

        assert_eq!(0, frame.deserialize(&[0x01, 0x00, 0x00, 0x00, 0x03, 0x00, 0x05, 0x00, 0x00]));

        assert_eq!(0, frame.deserialize(&[0x06, 0x00, 0x00, 0x00, 0x03, 0x00, 0x04, 0x00, 0x00]));
    }

    #[test]
    fn parse_controller_info() {
        let mut raw = vec![1, 2, 3, 4, 5, 6, 0x09, 0x02, 0x00];

        raw.extend_from_slice(&(settings::POWERED | settings::LOW_ENERGY).to_le_bytes());
        raw.extend_from_slice(&settings::POWERED.to_le_bytes());
        raw.extend_from_slice(&[0x0C, 0x01, 0x1A]);

        let mut name = [0u8; 249];
        name[..4].copy_from_slice(b"hci0");
        raw.extend_from_slice(&name);
        raw.extend_from_slice(&[0u8; 11]);

        let info = ControllerInfo::try_from_raw(&raw).unwrap();

        assert_eq!("hci0", info.name);

        assert_eq!("", info.short_name);

        assert!(info.is_powered());

        assert_eq!(None, ControllerInfo::try_from_raw(&raw[..100]));
    }

    #[quickcheck]
    fn complete_is_correlated_by_index_and_opcode(index: u16, opcode: u16, status: u8) -> bool {
        let mut frame = ManagementFrame::new(2, SetPowered(false));

        let mut event = vec![0x01, 0x00];

        event.extend_from_slice(&index.to_le_bytes());
        event.extend_from_slice(&[0x03, 0x00]);
        event.extend_from_slice(&opcode.to_le_bytes());
        event.push(status);

        let consumed = frame.deserialize(&event);

        if index == 2 && opcode == opcodes::SET_POWERED {
            consumed == event.len()
                && frame.state() == InboundState::Completed
                && frame.status() == Some(status)
                && frame.result().is_ok() == (status == 0)
        } else {
            consumed == 0 && frame.state() == InboundState::InProgress && frame.status().is_none()
        }
    }
}
