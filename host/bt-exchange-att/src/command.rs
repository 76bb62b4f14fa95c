//! One attribute protocol exchange
//!
//! A [`Command`] is both the request sent to the server and the accumulator of its response. The
//! request builders each return the opcode of the response the server is expected to answer with.
//!
//! Reading a value longer than fits within a single PDU is done automatically. Whenever a read or
//! read blob response fills the whole MTU the command re-issues itself as a read blob request at
//! the offset of the data received so far.

use crate::pdu::{ClientPduName, ErrorCode, ServerPduName, DEFAULT_MTU};
use crate::response::Response;
use bt_exchange_channel::{Error, Inbound, InboundState, Outbound, Result};
use bt_exchange_core::Uuid;

/// An attribute protocol request and its response
#[derive(Debug, Clone)]
pub struct Command {
    request: Vec<u8>,
    offset: usize,
    expected: Option<u8>,
    mtu: u16,
    requested_mtu: u16,
    handle: u16,
    long_read: bool,
    response: Response,
    state: InboundState,
}

impl Default for Command {
    fn default() -> Self {
        Command::new(DEFAULT_MTU)
    }
}

impl Command {
    /// Create a new `Command` for a link with the ATT MTU `mtu`
    pub fn new(mtu: u16) -> Self {
        Command {
            request: Vec::new(),
            offset: 0,
            expected: None,
            mtu: mtu.max(DEFAULT_MTU),
            requested_mtu: 0,
            handle: 0,
            long_read: false,
            response: Response::new(),
            state: InboundState::InProgress,
        }
    }

    fn prepare(&mut self, pdu: ClientPduName) -> &mut Vec<u8> {
        self.request.clear();
        self.request.push(pdu.into());

        self.offset = 0;
        self.expected = pdu.response().map(u8::from);
        self.long_read = false;
        self.response.clear();
        self.state = InboundState::InProgress;

        &mut self.request
    }

    fn push_range(request: &mut Vec<u8>, start: u16, end: u16) {
        request.extend_from_slice(&start.to_le_bytes());
        request.extend_from_slice(&end.to_le_bytes());
    }

    /// The largest value that fits within a request after `header` bytes
    fn value_room(&self, header: usize) -> usize {
        usize::from(self.mtu).saturating_sub(header)
    }

    /// Request an exchange of the MTU
    pub fn exchange_mtu(&mut self, mtu: u16) -> u8 {
        self.requested_mtu = mtu.max(DEFAULT_MTU);

        let requested = self.requested_mtu;

        self.prepare(ClientPduName::ExchangeMtuRequest)
            .extend_from_slice(&requested.to_le_bytes());

        ServerPduName::ExchangeMTUResponse.into()
    }

    /// Request the groups of `group_type` within the handle range
    pub fn read_by_group_type(&mut self, start: u16, end: u16, group_type: Uuid) -> u8 {
        let request = self.prepare(ClientPduName::ReadByGroupTypeRequest);

        Self::push_range(request, start, end);

        group_type.write_le(request);

        ServerPduName::ReadByGroupTypeResponse.into()
    }

    /// Request the handles of the attributes with the 16 bit type and value
    pub fn find_by_type(&mut self, start: u16, end: u16, attribute_type: u16, value: &[u8]) -> u8 {
        let room = self.value_room(7);
        let value = &value[..value.len().min(room)];

        let request = self.prepare(ClientPduName::FindByTypeValueRequest);

        Self::push_range(request, start, end);

        request.extend_from_slice(&attribute_type.to_le_bytes());
        request.extend_from_slice(value);

        ServerPduName::FindByTypeValueResponse.into()
    }

    /// Request to write the value of an attribute
    ///
    /// The value is truncated if it does not fit within the MTU.
    pub fn write(&mut self, handle: u16, value: &[u8]) -> u8 {
        let value = self.truncated(value);

        let request = self.prepare(ClientPduName::WriteRequest);

        request.extend_from_slice(&handle.to_le_bytes());
        request.extend_from_slice(&value);

        ServerPduName::WriteResponse.into()
    }

    /// Write the value of an attribute without a response
    pub fn write_command(&mut self, handle: u16, value: &[u8]) {
        let value = self.truncated(value);

        let request = self.prepare(ClientPduName::WriteCommand);

        request.extend_from_slice(&handle.to_le_bytes());
        request.extend_from_slice(&value);
    }

    fn truncated(&self, value: &[u8]) -> Vec<u8> {
        let room = self.value_room(3);

        if value.len() > room {
            log::warn!("value of {} bytes truncated to {} bytes", value.len(), room);
        }

        value[..value.len().min(room)].to_vec()
    }

    /// Request the attributes of `attribute_type` within the handle range
    pub fn read_by_type(&mut self, start: u16, end: u16, attribute_type: Uuid) -> u8 {
        let request = self.prepare(ClientPduName::ReadByTypeRequest);

        Self::push_range(request, start, end);

        attribute_type.write_le(request);

        ServerPduName::ReadByTypeResponse.into()
    }

    /// Request the handles and types of the attributes within the handle range
    pub fn find_information(&mut self, start: u16, end: u16) -> u8 {
        let request = self.prepare(ClientPduName::FindInformationRequest);

        Self::push_range(request, start, end);

        ServerPduName::FindInformationResponse.into()
    }

    /// Request to read the value of an attribute
    pub fn read(&mut self, handle: u16) -> u8 {
        self.handle = handle;

        self.prepare(ClientPduName::ReadRequest)
            .extend_from_slice(&handle.to_le_bytes());

        ServerPduName::ReadResponse.into()
    }

    /// Request to read the value of an attribute starting at `offset`
    pub fn read_blob(&mut self, handle: u16, offset: u16) -> u8 {
        self.handle = handle;

        let request = self.prepare(ClientPduName::ReadBlobRequest);

        request.extend_from_slice(&handle.to_le_bytes());
        request.extend_from_slice(&offset.to_le_bytes());

        self.long_read = true;

        ServerPduName::ReadBlobResponse.into()
    }

    /// Check if a response is expected for the request
    pub fn expects_response(&self) -> bool {
        self.expected.is_some()
    }

    /// The MTU of the link this command is for
    pub fn mtu(&self) -> u16 {
        self.mtu
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut Response {
        &mut self.response
    }

    pub fn into_response(self) -> Response {
        self.response
    }

    /// The error code of an error response
    pub fn error(&self) -> Option<ErrorCode> {
        self.response.error()
    }

    fn complete(&mut self) {
        self.state = InboundState::Completed;
    }

    fn fail(&mut self, error: ErrorCode) {
        self.response.set_error(error);
        self.state = InboundState::Completed;
    }

    fn error_response(&mut self, pdu: &[u8]) -> usize {
        let (Some(&request), Some(&code)) = (pdu.get(1), pdu.get(4)) else {
            log::trace!("malformed error response");
            return 0;
        };

        if Some(&request) != self.request.first() {
            return 0;
        }

        let error = ErrorCode::from_raw(code);

        let end_of_value = matches!(error, ErrorCode::InvalidOffset | ErrorCode::AttributeNotLong);

        if self.long_read && end_of_value && !self.response.is_empty() {
            log::trace!("end of long read of handle {:#06x}", self.handle);

            self.complete();
        } else {
            log::debug!("{:#04x} request failed: {}", request, error);

            self.fail(error);
        }

        pdu.len()
    }

    /// Continue reading a long value if the response filled the MTU
    fn continue_long_read(&mut self, pdu_len: usize) {
        let read = self.response.storage().len();

        match u16::try_from(read) {
            Ok(offset) if pdu_len >= usize::from(self.mtu) => {
                log::trace!("continue reading handle {:#06x} at offset {}", self.handle, offset);

                let handle = self.handle;

                self.request.clear();
                self.request.push(ClientPduName::ReadBlobRequest.into());
                self.request.extend_from_slice(&handle.to_le_bytes());
                self.request.extend_from_slice(&offset.to_le_bytes());

                self.expected = Some(ServerPduName::ReadBlobResponse.into());
                self.long_read = true;
                self.state = InboundState::Resend;
            }
            _ => self.complete(),
        }
    }

    fn add_entries(&mut self, entries: &[u8], size: usize) {
        for entry in entries.chunks_exact(size) {
            self.response.add(u16::from_le_bytes([entry[0], entry[1]]), &entry[2..]);
        }

        self.complete();
    }
}

impl Outbound for Command {
    fn opcode(&self) -> u16 {
        self.request.first().copied().map(u16::from).unwrap_or_default()
    }

    fn serialize(&mut self, stream: &mut [u8]) -> usize {
        let size = (self.request.len() - self.offset).min(stream.len());

        stream[..size].copy_from_slice(&self.request[self.offset..self.offset + size]);

        self.offset += size;

        size
    }

    fn reload(&mut self) {
        self.offset = 0;

        if self.state == InboundState::Resend {
            self.state = InboundState::InProgress;
        }
    }
}

impl Inbound for Command {
    fn deserialize(&mut self, stream: &[u8]) -> usize {
        let (Some(&opcode), Some(expected)) = (stream.first(), self.expected) else {
            return 0;
        };

        if opcode == u8::from(ServerPduName::ErrorResponse) {
            return self.error_response(stream);
        }

        if opcode != expected {
            log::trace!("PDU {:#04x} is not a response to this request", opcode);
            return 0;
        }

        match ServerPduName::try_from(opcode) {
            Ok(ServerPduName::ExchangeMTUResponse) => match stream.get(1..3) {
                Some(raw) => {
                    let server = u16::from_le_bytes([raw[0], raw[1]]);
                    let mtu = server.min(self.requested_mtu).max(DEFAULT_MTU);

                    self.mtu = mtu;
                    self.response.set_mtu(mtu);
                    self.complete();
                }
                None => self.fail(ErrorCode::InvalidPDU),
            },
            Ok(ServerPduName::FindInformationResponse) => match stream.get(1) {
                Some(0x01) => self.add_entries(&stream[2..], 4),
                Some(0x02) => self.add_entries(&stream[2..], 18),
                _ => self.fail(ErrorCode::InvalidPDU),
            },
            Ok(ServerPduName::FindByTypeValueResponse) => self.add_entries(&stream[1..], 4),
            Ok(ServerPduName::ReadByTypeResponse | ServerPduName::ReadByGroupTypeResponse) => {
                match stream.get(1).map(|len| usize::from(*len)) {
                    Some(len) if len >= 2 => self.add_entries(&stream[2..], len),
                    _ => self.fail(ErrorCode::InvalidPDU),
                }
            }
            Ok(ServerPduName::ReadResponse) => {
                self.response.add(self.handle, &stream[1..]);

                self.continue_long_read(stream.len());
            }
            Ok(ServerPduName::ReadBlobResponse) => {
                self.response.extend(self.handle, &stream[1..]);

                self.continue_long_read(stream.len());
            }
            Ok(ServerPduName::WriteResponse) => self.complete(),
            _ => return 0,
        }

        stream.len()
    }

    fn state(&self) -> InboundState {
        self.state
    }

    fn result(&self) -> Result<()> {
        match self.response.error() {
            Some(_) => Err(Error::General),
            None => Ok(()),
        }
    }
}
