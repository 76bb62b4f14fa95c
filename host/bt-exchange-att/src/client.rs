//! GATT client channel
//!
//! A [`GattChannel`] wraps the exchange channel of an ATT bearer. It keeps the MTU of the link so
//! every [`Command`] it creates can tell when a read response was cut at the MTU.

use crate::command::Command;
use crate::pdu::{ClientPduName, ServerPduName, DEFAULT_MTU};
use bt_exchange_channel::{Outbound, Result, SynchronousChannel, Ticket, Transport};
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Receiver of notifications and indications
pub trait ValueHandler: Send {
    /// Called with the attribute handle and value of a notification or indication
    fn value(&mut self, handle: u16, value: &[u8], indicated: bool);
}

impl<F> ValueHandler for F
where
    F: FnMut(u16, &[u8], bool) + Send,
{
    fn value(&mut self, handle: u16, value: &[u8], indicated: bool) {
        self(handle, value, indicated)
    }
}

/// Unsolicited handler of an ATT bearer
struct Notifications<H>(H);

impl<H: ValueHandler> bt_exchange_channel::Unsolicited for Notifications<H> {
    fn deserialize(&mut self, stream: &[u8]) -> usize {
        let indicated = match stream.first().copied().map(ServerPduName::try_from) {
            Some(Ok(ServerPduName::HandleValueNotification)) => false,
            Some(Ok(ServerPduName::HandleValueIndication)) => true,
            _ => {
                log::trace!("dropped unsolicited PDU {:02x?}", stream.first());
                return stream.len();
            }
        };

        match stream.get(1..3) {
            Some(raw) => self.0.value(u16::from_le_bytes([raw[0], raw[1]]), &stream[3..], indicated),
            None => log::trace!("malformed handle value PDU"),
        }

        stream.len()
    }
}

/// The confirmation of an indication
struct Confirmation {
    sent: bool,
}

impl Outbound for Confirmation {
    fn opcode(&self) -> u16 {
        u8::from(ClientPduName::HandleValueConfirmation).into()
    }

    fn serialize(&mut self, stream: &mut [u8]) -> usize {
        match (self.sent, stream.first_mut()) {
            (false, Some(byte)) => {
                *byte = ClientPduName::HandleValueConfirmation.into();
                self.sent = true;
                1
            }
            _ => 0,
        }
    }

    fn reload(&mut self) {
        self.sent = false;
    }
}

/// A GATT client over an ATT bearer
pub struct GattChannel<T> {
    channel: Arc<SynchronousChannel<T>>,
    mtu: AtomicU16,
}

impl<T: Transport> GattChannel<T> {
    pub fn new(channel: Arc<SynchronousChannel<T>>) -> Self {
        GattChannel {
            channel,
            mtu: AtomicU16::new(DEFAULT_MTU),
        }
    }

    pub fn channel(&self) -> &Arc<SynchronousChannel<T>> {
        &self.channel
    }

    /// The current ATT MTU of the link
    pub fn mtu(&self) -> u16 {
        self.mtu.load(Ordering::Relaxed)
    }

    /// Create a command for the current MTU
    pub fn command(&self) -> Command {
        Command::new(self.mtu())
    }

    /// Negotiate the MTU with the server
    ///
    /// The negotiated MTU is returned.
    pub fn exchange_mtu(&self, wait: Duration, mtu: u16) -> Result<u16> {
        let mut command = self.command();

        command.exchange_mtu(mtu);

        let (command, result) = self.execute(wait, command);

        result?;

        let negotiated = command.mtu();

        log::debug!("ATT MTU is {}", negotiated);

        self.mtu.store(negotiated, Ordering::Relaxed);

        Ok(negotiated)
    }

    /// Execute a command, blocking until it completes
    ///
    /// The command is returned with the outcome of the exchange. A command without a response is
    /// complete once it is sent.
    pub fn execute(&self, wait: Duration, command: Command) -> (Command, Result<()>) {
        if command.expects_response() {
            self.channel.exchange_response(wait, command)
        } else {
            self.channel.exchange(wait, command)
        }
    }

    /// Submit a command without blocking
    ///
    /// `callback` is called with the command once it completes.
    pub fn submit<F>(&self, wait: Duration, command: Command, callback: F) -> Ticket
    where
        F: FnOnce(Command, Result<()>) + Send + 'static,
    {
        if command.expects_response() {
            self.channel.send_response(wait, command, callback)
        } else {
            self.channel.send(wait, command, callback)
        }
    }

    pub fn revoke(&self, ticket: Ticket) {
        self.channel.revoke(ticket)
    }

    /// Read the value of an attribute, following through with blob reads for a long value
    pub fn read(&self, wait: Duration, handle: u16) -> Result<Vec<u8>> {
        let mut command = self.command();

        command.read(handle);

        let (command, result) = self.execute(wait, command);

        result.map(|_| command.response().storage().to_vec())
    }

    pub fn write(&self, wait: Duration, handle: u16, value: &[u8]) -> Result<()> {
        let mut command = self.command();

        command.write(handle, value);

        self.execute(wait, command).1
    }

    /// Set the receiver of notifications and indications
    ///
    /// An indication must be confirmed with [`confirm`](GattChannel::confirm).
    pub fn set_value_handler<H>(&self, handler: H)
    where
        H: ValueHandler + 'static,
    {
        self.channel.set_unsolicited(Notifications(handler))
    }

    /// Confirm a received indication
    pub fn confirm(&self, wait: Duration) -> Result<()> {
        self.channel.exchange(wait, Confirmation { sent: false }).1
    }
}
