//! HCI events
//!
//! Only the parts of the event packets needed for correlating a command with the event that
//! completes it are parsed here. An event packet received from the controller is prefixed by its
//! packet indicator.
//!
//! ```text
//! [0x04][event code][parameter length][parameters ...]
//! ```

/// Packet indicator of a HCI command packet
pub const COMMAND_PACKET: u8 = 0x01;

/// Packet indicator of a HCI event packet
pub const EVENT_PACKET: u8 = 0x04;

/// Size of the header of an event packet, including the packet indicator
pub const EVENT_HEADER_SIZE: usize = 3;

/// Event codes
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum EventCode {
    InquiryComplete,
    InquiryResult,
    ConnectionComplete,
    DisconnectionComplete,
    RemoteNameRequestComplete,
    ReadRemoteVersionInformationComplete,
    CommandComplete,
    CommandStatus,
    LeMeta,
}

impl EventCode {
    pub const fn into_raw(self) -> u8 {
        match self {
            EventCode::InquiryComplete => 0x01,
            EventCode::InquiryResult => 0x02,
            EventCode::ConnectionComplete => 0x03,
            EventCode::DisconnectionComplete => 0x05,
            EventCode::RemoteNameRequestComplete => 0x07,
            EventCode::ReadRemoteVersionInformationComplete => 0x0C,
            EventCode::CommandComplete => 0x0E,
            EventCode::CommandStatus => 0x0F,
            EventCode::LeMeta => 0x3E,
        }
    }

    pub const fn try_from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x01 => Some(EventCode::InquiryComplete),
            0x02 => Some(EventCode::InquiryResult),
            0x03 => Some(EventCode::ConnectionComplete),
            0x05 => Some(EventCode::DisconnectionComplete),
            0x07 => Some(EventCode::RemoteNameRequestComplete),
            0x0C => Some(EventCode::ReadRemoteVersionInformationComplete),
            0x0E => Some(EventCode::CommandComplete),
            0x0F => Some(EventCode::CommandStatus),
            0x3E => Some(EventCode::LeMeta),
            _ => None,
        }
    }
}

/// LE meta event sub codes
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
pub enum LeMeta {
    ConnectionComplete,
    AdvertisingReport,
    ConnectionUpdateComplete,
    ReadRemoteFeaturesComplete,
}

impl LeMeta {
    pub const fn into_raw(self) -> u8 {
        match self {
            LeMeta::ConnectionComplete => 0x01,
            LeMeta::AdvertisingReport => 0x02,
            LeMeta::ConnectionUpdateComplete => 0x03,
            LeMeta::ReadRemoteFeaturesComplete => 0x04,
        }
    }

    pub const fn try_from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x01 => Some(LeMeta::ConnectionComplete),
            0x02 => Some(LeMeta::AdvertisingReport),
            0x03 => Some(LeMeta::ConnectionUpdateComplete),
            0x04 => Some(LeMeta::ReadRemoteFeaturesComplete),
            _ => None,
        }
    }
}

/// A parsed event packet
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Event<'a> {
    CommandStatus {
        status: u8,
        number_of_packets: u8,
        opcode: u16,
    },
    CommandComplete {
        number_of_packets: u8,
        opcode: u16,
        return_parameters: &'a [u8],
    },
    LeMeta {
        sub_event: u8,
        payload: &'a [u8],
    },
    Other {
        code: u8,
        parameters: &'a [u8],
    },
}

impl<'a> Event<'a> {
    /// Parse an event packet
    ///
    /// The event and the size of the packet are returned. `None` is returned if `packet` is not a
    /// complete event packet.
    pub fn from_packet(packet: &'a [u8]) -> Option<(Self, usize)> {
        if *packet.first()? != EVENT_PACKET {
            return None;
        }

        let code = *packet.get(1)?;
        let len = usize::from(*packet.get(2)?);
        let parameters = packet.get(EVENT_HEADER_SIZE..EVENT_HEADER_SIZE + len)?;

        let event = match EventCode::try_from_raw(code) {
            Some(EventCode::CommandStatus) if parameters.len() >= 4 => Event::CommandStatus {
                status: parameters[0],
                number_of_packets: parameters[1],
                opcode: u16::from_le_bytes([parameters[2], parameters[3]]),
            },
            Some(EventCode::CommandComplete) if parameters.len() >= 3 => Event::CommandComplete {
                number_of_packets: parameters[0],
                opcode: u16::from_le_bytes([parameters[1], parameters[2]]),
                return_parameters: &parameters[3..],
            },
            Some(EventCode::LeMeta) if !parameters.is_empty() => Event::LeMeta {
                sub_event: parameters[0],
                payload: &parameters[1..],
            },
            _ => Event::Other { code, parameters },
        };

        Some((event, EVENT_HEADER_SIZE + len))
    }
}
