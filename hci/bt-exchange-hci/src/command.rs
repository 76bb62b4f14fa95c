//! HCI command frames
//!
//! A [`CommandFrame`] is both the command sent to the controller and the correlator for the event
//! that ends the command. Every event received while the frame is at the head of the exchange
//! queue is inspected, events that are not for this command are left for the unsolicited handler
//! of the channel.

use crate::events::{Event, EventCode, LeMeta, COMMAND_PACKET};
use crate::opcodes::HciCommand;
use bt_exchange_channel::{Inbound, InboundState, Outbound, Result, SynchronousChannel, Transport};
use std::time::Duration;

/// The parameter of a HCI command
///
/// The parameter is a packed structure of `N` bytes in little endian order.
pub trait CommandParameter<const N: usize> {
    const COMMAND: HciCommand;

    fn get_parameter(&self) -> [u8; N];
}

/// A structure of the return parameters of a command
pub trait ReturnParameter: Sized {
    /// Convert the raw parameter bytes
    ///
    /// `None` is returned if `raw` is too short.
    fn try_from_raw(raw: &[u8]) -> Option<Self>;
}

/// The event that ends a command
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Expect {
    /// The command status event
    CommandStatus,
    /// The command complete event
    CommandComplete,
    /// An event, the command status event must have a zero status for the command to proceed
    Event(EventCode),
    /// An LE meta event with this sub event code
    LeMeta(LeMeta),
}

/// A HCI command and the correlator for its response
///
/// ```text
/// [0x01][opcode lo][opcode hi][parameter length][parameter ...]
/// ```
pub struct CommandFrame<P, const N: usize> {
    parameter: P,
    packet: Vec<u8>,
    offset: usize,
    expect: Expect,
    response_size: usize,
    response: Vec<u8>,
    status: Option<u8>,
    state: InboundState,
}

impl<P, const N: usize> CommandFrame<P, N>
where
    P: CommandParameter<N>,
{
    pub fn new(parameter: P, expect: Expect) -> Self {
        let opcode = P::COMMAND.into_opcode().to_le_bytes();

        let mut packet = Vec::with_capacity(4 + N);

        packet.extend_from_slice(&[COMMAND_PACKET, opcode[0], opcode[1], N as u8]);

        packet.extend_from_slice(&parameter.get_parameter());

        CommandFrame {
            parameter,
            packet,
            offset: 0,
            expect,
            response_size: usize::from(u8::MAX),
            response: Vec::new(),
            status: None,
            state: InboundState::InProgress,
        }
    }

    /// Limit the number of response bytes kept
    pub fn with_response_size(mut self, size: usize) -> Self {
        self.response_size = size;
        self
    }

    pub fn parameter(&self) -> &P {
        &self.parameter
    }

    pub fn expect(&self) -> Expect {
        self.expect
    }

    /// The status reported by the controller, if any
    pub fn status(&self) -> Option<u8> {
        self.status
    }

    /// The bytes of the event that completed the command
    ///
    /// For a command complete event these are the return parameters, for any other event these are
    /// the event parameters.
    pub fn response(&self) -> &[u8] {
        &self.response
    }

    pub fn return_parameter<R: ReturnParameter>(&self) -> Option<R> {
        R::try_from_raw(&self.response)
    }

    fn complete_with(&mut self, raw: &[u8]) {
        let size = raw.len().min(self.response_size);

        self.response.clear();
        self.response.extend_from_slice(&raw[..size]);

        self.state = InboundState::Completed;
    }
}

impl<P, const N: usize> Outbound for CommandFrame<P, N>
where
    P: CommandParameter<N> + Send,
{
    fn opcode(&self) -> u16 {
        P::COMMAND.into_opcode()
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

impl<P, const N: usize> Inbound for CommandFrame<P, N>
where
    P: CommandParameter<N> + Send,
{
    fn deserialize(&mut self, stream: &[u8]) -> usize {
        let Some((event, size)) = Event::from_packet(stream) else {
            log::trace!("received data is not an event packet");
            return 0;
        };

        let opcode = self.opcode();

        match event {
            Event::CommandStatus {
                status, opcode: op, ..
            } if op == opcode => {
                if self.expect == Expect::CommandStatus || status != 0 {
                    self.status = Some(status);
                    self.state = InboundState::Completed;
                } else {
                    log::trace!("{} is pending", P::COMMAND);
                }
            }
            Event::CommandComplete {
                opcode: op,
                return_parameters,
                ..
            } if op == opcode => self.complete_with(return_parameters),
            Event::LeMeta { sub_event, payload }
                if Some(self.expect) == LeMeta::try_from_raw(sub_event).map(Expect::LeMeta) =>
            {
                self.complete_with(payload)
            }
            Event::Other { code, parameters }
                if Some(self.expect) == EventCode::try_from_raw(code).map(Expect::Event) =>
            {
                self.complete_with(parameters)
            }
            _ => {
                log::trace!("event is not for {}", P::COMMAND);
                return 0;
            }
        }

        size
    }

    fn state(&self) -> InboundState {
        self.state
    }

    fn result(&self) -> Result<()> {
        match self.status {
            Some(status) if status != 0 => Err(bt_exchange_channel::Error::General),
            _ => Ok(()),
        }
    }
}

/// Send a command and wait for the event that ends it
///
/// On success the completed frame is returned. A non-zero status is logged and returned as
/// [`Error::General`](bt_exchange_channel::Error::General).
pub fn send_command<T, P, const N: usize>(
    channel: &SynchronousChannel<T>,
    wait: Duration,
    parameter: P,
    expect: Expect,
) -> Result<CommandFrame<P, N>>
where
    T: Transport,
    P: CommandParameter<N> + Send + 'static,
{
    let (frame, result) = channel.exchange_response(wait, CommandFrame::new(parameter, expect));

    if let Err(e) = result {
        match frame.status() {
            Some(status) => log::warn!("{} failed with status {:#04x}", P::COMMAND, status),
            None => log::warn!("{} failed: {}", P::COMMAND, e),
        }
    }

    result.map(|_| frame)
}
