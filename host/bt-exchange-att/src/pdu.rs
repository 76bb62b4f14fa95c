//! Attribute protocol data units
//!
//! The first byte of every PDU is its opcode, the rest of the PDU is specific to the opcode. All
//! multi-byte fields are little endian.

/// The default (and minimum) ATT MTU of a LE link
pub const DEFAULT_MTU: u16 = 23;

/// The L2CAP channel identifier of the attribute protocol
pub const L2CAP_CHANNEL_ID: u16 = 0x0004;

/// Attribute types of the GATT declarations
pub mod types {
    pub const PRIMARY_SERVICE: u16 = 0x2800;
    pub const SECONDARY_SERVICE: u16 = 0x2801;
    pub const INCLUDE: u16 = 0x2802;
    pub const CHARACTERISTIC: u16 = 0x2803;
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq)]
pub enum ClientPduName {
    ExchangeMtuRequest,
    FindInformationRequest,
    FindByTypeValueRequest,
    ReadByTypeRequest,
    ReadRequest,
    ReadBlobRequest,
    ReadByGroupTypeRequest,
    WriteRequest,
    WriteCommand,
    HandleValueConfirmation,
}

impl ClientPduName {
    /// The PDU the server answers this request with
    ///
    /// `None` is returned for a command (there is no response).
    pub fn response(self) -> Option<ServerPduName> {
        match self {
            ClientPduName::ExchangeMtuRequest => Some(ServerPduName::ExchangeMTUResponse),
            ClientPduName::FindInformationRequest => Some(ServerPduName::FindInformationResponse),
            ClientPduName::FindByTypeValueRequest => Some(ServerPduName::FindByTypeValueResponse),
            ClientPduName::ReadByTypeRequest => Some(ServerPduName::ReadByTypeResponse),
            ClientPduName::ReadRequest => Some(ServerPduName::ReadResponse),
            ClientPduName::ReadBlobRequest => Some(ServerPduName::ReadBlobResponse),
            ClientPduName::ReadByGroupTypeRequest => Some(ServerPduName::ReadByGroupTypeResponse),
            ClientPduName::WriteRequest => Some(ServerPduName::WriteResponse),
            ClientPduName::WriteCommand | ClientPduName::HandleValueConfirmation => None,
        }
    }
}

impl TryFrom<u8> for ClientPduName {
    type Error = ();

    fn try_from(val: u8) -> Result<Self, ()> {
        match val {
            0x02 => Ok(ClientPduName::ExchangeMtuRequest),
            0x04 => Ok(ClientPduName::FindInformationRequest),
            0x06 => Ok(ClientPduName::FindByTypeValueRequest),
            0x08 => Ok(ClientPduName::ReadByTypeRequest),
            0x0A => Ok(ClientPduName::ReadRequest),
            0x0C => Ok(ClientPduName::ReadBlobRequest),
            0x10 => Ok(ClientPduName::ReadByGroupTypeRequest),
            0x12 => Ok(ClientPduName::WriteRequest),
            0x52 => Ok(ClientPduName::WriteCommand),
            0x1E => Ok(ClientPduName::HandleValueConfirmation),
            _ => Err(()),
        }
    }
}

impl From<ClientPduName> for u8 {
    fn from(pdu_name: ClientPduName) -> u8 {
        match pdu_name {
            ClientPduName::ExchangeMtuRequest => 0x02,
            ClientPduName::FindInformationRequest => 0x04,
            ClientPduName::FindByTypeValueRequest => 0x06,
            ClientPduName::ReadByTypeRequest => 0x08,
            ClientPduName::ReadRequest => 0x0A,
            ClientPduName::ReadBlobRequest => 0x0C,
            ClientPduName::ReadByGroupTypeRequest => 0x10,
            ClientPduName::WriteRequest => 0x12,
            ClientPduName::WriteCommand => 0x52,
            ClientPduName::HandleValueConfirmation => 0x1E,
        }
    }
}

impl core::fmt::Display for ClientPduName {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ClientPduName::ExchangeMtuRequest => write!(f, "Exchange Mtu Request"),
            ClientPduName::FindInformationRequest => write!(f, "Find Information Request"),
            ClientPduName::FindByTypeValueRequest => write!(f, "Find By Type Value Request"),
            ClientPduName::ReadByTypeRequest => write!(f, "Read By Type Request"),
            ClientPduName::ReadRequest => write!(f, "Read Request"),
            ClientPduName::ReadBlobRequest => write!(f, "Read Blob Request"),
            ClientPduName::ReadByGroupTypeRequest => write!(f, "Read By Group Type Request"),
            ClientPduName::WriteRequest => write!(f, "Write Request"),
            ClientPduName::WriteCommand => write!(f, "Write Command"),
            ClientPduName::HandleValueConfirmation => write!(f, "Handle Value Confirmation"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq)]
pub enum ServerPduName {
    ErrorResponse,
    ExchangeMTUResponse,
    FindInformationResponse,
    FindByTypeValueResponse,
    ReadByTypeResponse,
    ReadResponse,
    ReadBlobResponse,
    ReadByGroupTypeResponse,
    WriteResponse,
    HandleValueNotification,
    HandleValueIndication,
}

impl From<ServerPduName> for u8 {
    fn from(name: ServerPduName) -> Self {
        match name {
            ServerPduName::ErrorResponse => 0x1,
            ServerPduName::ExchangeMTUResponse => 0x3,
            ServerPduName::FindInformationResponse => 0x5,
            ServerPduName::FindByTypeValueResponse => 0x7,
            ServerPduName::ReadByTypeResponse => 0x9,
            ServerPduName::ReadResponse => 0xB,
            ServerPduName::ReadBlobResponse => 0xD,
            ServerPduName::ReadByGroupTypeResponse => 0x11,
            ServerPduName::WriteResponse => 0x13,
            ServerPduName::HandleValueNotification => 0x1B,
            ServerPduName::HandleValueIndication => 0x1D,
        }
    }
}

impl TryFrom<u8> for ServerPduName {
    type Error = ();

    fn try_from(val: u8) -> Result<Self, Self::Error> {
        match val {
            0x1 => Ok(ServerPduName::ErrorResponse),
            0x3 => Ok(ServerPduName::ExchangeMTUResponse),
            0x5 => Ok(ServerPduName::FindInformationResponse),
            0x7 => Ok(ServerPduName::FindByTypeValueResponse),
            0x9 => Ok(ServerPduName::ReadByTypeResponse),
            0xB => Ok(ServerPduName::ReadResponse),
            0xD => Ok(ServerPduName::ReadBlobResponse),
            0x11 => Ok(ServerPduName::ReadByGroupTypeResponse),
            0x13 => Ok(ServerPduName::WriteResponse),
            0x1B => Ok(ServerPduName::HandleValueNotification),
            0x1D => Ok(ServerPduName::HandleValueIndication),
            _ => Err(()),
        }
    }
}

impl core::fmt::Display for ServerPduName {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ServerPduName::ErrorResponse => write!(f, "Error Response"),
            ServerPduName::ExchangeMTUResponse => write!(f, "Exchange MTU Response"),
            ServerPduName::FindInformationResponse => write!(f, "Find Information Response"),
            ServerPduName::FindByTypeValueResponse => write!(f, "Find By Type Value Response"),
            ServerPduName::ReadByTypeResponse => write!(f, "Read By Type Response"),
            ServerPduName::ReadResponse => write!(f, "Read Response"),
            ServerPduName::ReadBlobResponse => write!(f, "Read Blob Response"),
            ServerPduName::ReadByGroupTypeResponse => write!(f, "Read By Group Type Response"),
            ServerPduName::WriteResponse => write!(f, "Write Response"),
            ServerPduName::HandleValueNotification => write!(f, "Handle Value Notification"),
            ServerPduName::HandleValueIndication => write!(f, "Handle Value Indication"),
        }
    }
}

/// Error codes of an error response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The attribute handle given was not valid on this server
    InvalidHandle,
    /// The attribute cannot be read
    ReadNotPermitted,
    /// The attribute cannot be written
    WriteNotPermitted,
    /// The attribute PDU was invalid
    InvalidPDU,
    /// The attribute requires authentication before it can be read or written
    InsufficientAuthentication,
    /// ATT server does not support the request received from the client
    RequestNotSupported,
    /// Offset specified was past the end of the attribute
    InvalidOffset,
    /// The attribute requires authorization before it can be read or written
    InsufficientAuthorization,
    /// Too many prepare writes have been queued
    PrepareQueueFull,
    /// No attribute found within the given attribute handle range
    AttributeNotFound,
    /// The attribute cannot be read using the read blob request
    AttributeNotLong,
    /// The *encryption key size* used for encrypting this link is too short
    InsufficientEncryptionKeySize,
    /// The attribute value length is invalid for the operation
    InvalidAttributeValueLength,
    /// The request has encountered an error that was unlikely
    UnlikelyError,
    /// The attribute requires encryption before it can be read or written
    InsufficientEncryption,
    /// The attribute type is not a supported grouping attribute
    UnsupportedGroupType,
    /// Insufficient resources to complete the request
    InsufficientResources,
    /// The server requests the client to rediscover the database.
    DatabaseOutOfSync,
    /// The attribute parameter value was not allowed
    ValueNotAllowed,
    /// Application error code defined by a higher layer specification
    ApplicationError(u8),
    /// Common profile and service error codes
    CommonProfileError(u8),
    /// Reserved for future use
    ReservedForFutureUse(u8),
}

impl ErrorCode {
    pub fn from_raw(val: u8) -> ErrorCode {
        match val {
            0x01 => ErrorCode::InvalidHandle,
            0x02 => ErrorCode::ReadNotPermitted,
            0x03 => ErrorCode::WriteNotPermitted,
            0x04 => ErrorCode::InvalidPDU,
            0x05 => ErrorCode::InsufficientAuthentication,
            0x06 => ErrorCode::RequestNotSupported,
            0x07 => ErrorCode::InvalidOffset,
            0x08 => ErrorCode::InsufficientAuthorization,
            0x09 => ErrorCode::PrepareQueueFull,
            0x0A => ErrorCode::AttributeNotFound,
            0x0B => ErrorCode::AttributeNotLong,
            0x0C => ErrorCode::InsufficientEncryptionKeySize,
            0x0D => ErrorCode::InvalidAttributeValueLength,
            0x0E => ErrorCode::UnlikelyError,
            0x0F => ErrorCode::InsufficientEncryption,
            0x10 => ErrorCode::UnsupportedGroupType,
            0x11 => ErrorCode::InsufficientResources,
            0x12 => ErrorCode::DatabaseOutOfSync,
            0x13 => ErrorCode::ValueNotAllowed,
            0x80..=0x9F => ErrorCode::ApplicationError(val),
            0xE0..=0xFF => ErrorCode::CommonProfileError(val),
            _ => ErrorCode::ReservedForFutureUse(val),
        }
    }

    pub fn get_raw(&self) -> u8 {
        match self {
            ErrorCode::InvalidHandle => 0x01,
            ErrorCode::ReadNotPermitted => 0x02,
            ErrorCode::WriteNotPermitted => 0x03,
            ErrorCode::InvalidPDU => 0x04,
            ErrorCode::InsufficientAuthentication => 0x05,
            ErrorCode::RequestNotSupported => 0x06,
            ErrorCode::InvalidOffset => 0x07,
            ErrorCode::InsufficientAuthorization => 0x08,
            ErrorCode::PrepareQueueFull => 0x09,
            ErrorCode::AttributeNotFound => 0x0A,
            ErrorCode::AttributeNotLong => 0x0B,
            ErrorCode::InsufficientEncryptionKeySize => 0x0C,
            ErrorCode::InvalidAttributeValueLength => 0x0D,
            ErrorCode::UnlikelyError => 0x0E,
            ErrorCode::InsufficientEncryption => 0x0F,
            ErrorCode::UnsupportedGroupType => 0x10,
            ErrorCode::InsufficientResources => 0x11,
            ErrorCode::DatabaseOutOfSync => 0x12,
            ErrorCode::ValueNotAllowed => 0x13,
            ErrorCode::ApplicationError(val) => *val,
            ErrorCode::CommonProfileError(val) => *val,
            ErrorCode::ReservedForFutureUse(val) => *val,
        }
    }
}

impl core::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ErrorCode::InvalidHandle => write!(f, "invalid handle"),
            ErrorCode::ReadNotPermitted => write!(f, "read not permitted"),
            ErrorCode::WriteNotPermitted => write!(f, "write not permitted"),
            ErrorCode::InvalidPDU => write!(f, "invalid PDU"),
            ErrorCode::InsufficientAuthentication => write!(f, "insufficient authentication"),
            ErrorCode::RequestNotSupported => write!(f, "request not supported"),
            ErrorCode::InvalidOffset => write!(f, "invalid offset"),
            ErrorCode::InsufficientAuthorization => write!(f, "insufficient authorization"),
            ErrorCode::PrepareQueueFull => write!(f, "prepare queue full"),
            ErrorCode::AttributeNotFound => write!(f, "attribute not found"),
            ErrorCode::AttributeNotLong => write!(f, "attribute not long"),
            ErrorCode::InsufficientEncryptionKeySize => write!(f, "insufficient encryption key size"),
            ErrorCode::InvalidAttributeValueLength => write!(f, "invalid attribute value length"),
            ErrorCode::UnlikelyError => write!(f, "unlikely error"),
            ErrorCode::InsufficientEncryption => write!(f, "insufficient encryption"),
            ErrorCode::UnsupportedGroupType => write!(f, "unsupported group type"),
            ErrorCode::InsufficientResources => write!(f, "insufficient resources"),
            ErrorCode::DatabaseOutOfSync => write!(f, "database out of sync"),
            ErrorCode::ValueNotAllowed => write!(f, "value not allowed"),
            ErrorCode::ApplicationError(val) => write!(f, "application error {:#04x}", val),
            ErrorCode::CommonProfileError(val) => write!(f, "common profile error {:#04x}", val),
            ErrorCode::ReservedForFutureUse(val) => write!(f, "reserved error code {:#04x}", val),
        }
    }
}
