//! Integration test framework
//!
//! A [`Link`] connects a [`SynchronousChannel`] to a scripted peer. The link runs a thread in
//! place of a socket thread, every packet written by the channel is handed to the [`Peer`] and
//! whatever the peer replies with is read back into the channel.

use bt_exchange_channel::{Inbound, InboundState, Outbound, SynchronousChannel, Transport};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Install a logger for the test
///
/// Installing more than once is fine.
pub fn init_logging() {
    let _ = simplelog::TestLogger::init(log::LevelFilter::Trace, simplelog::Config::default());
}

/// Wait until `condition` is true
///
/// False is returned if `condition` is still false after `timeout`.
pub fn eventually<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;

    loop {
        if condition() {
            return true;
        }

        if Instant::now() >= deadline {
            return false;
        }

        std::thread::sleep(Duration::from_millis(1));
    }
}

/// The scripted end of a [`Link`]
pub trait Peer: Send + 'static {
    /// Receive a packet written by the channel, returning the packets sent back
    fn receive(&mut self, packet: &[u8]) -> Vec<Vec<u8>>;
}

impl<F> Peer for F
where
    F: FnMut(&[u8]) -> Vec<Vec<u8>> + Send + 'static,
{
    fn receive(&mut self, packet: &[u8]) -> Vec<Vec<u8>> {
        self(packet)
    }
}

#[derive(Default)]
struct Events {
    trigger: bool,
    inbound: VecDeque<Vec<u8>>,
    written: Vec<Vec<u8>>,
    exit: bool,
    stopped: bool,
}

struct Shared {
    open: AtomicBool,
    frozen: bool,
    events: Mutex<Events>,
    wake: Condvar,
}

impl Shared {
    fn exit(&self) {
        self.events.lock().exit = true;

        self.wake.notify_all();
    }
}

/// The in-memory [`Transport`] of a [`Link`]
pub struct Loopback {
    shared: Arc<Shared>,
}

impl Transport for Loopback {
    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    fn trigger(&self) {
        if self.shared.frozen {
            return;
        }

        self.shared.events.lock().trigger = true;

        self.shared.wake.notify_all();
    }

    fn close(&self, wait: Duration) -> bt_exchange_core::Result<()> {
        let deadline = Instant::now() + wait;

        let mut events = self.shared.events.lock();

        events.exit = true;

        self.shared.wake.notify_all();

        while !events.stopped {
            if self.shared.wake.wait_until(&mut events, deadline).timed_out() {
                return Err(bt_exchange_core::Error::TimedOut);
            }
        }

        Ok(())
    }
}

impl Drop for Loopback {
    fn drop(&mut self) {
        self.shared.exit();
    }
}

/// A channel connected to a scripted peer
pub struct Link {
    shared: Arc<Shared>,
    channel: Arc<SynchronousChannel<Loopback>>,
}

impl Link {
    /// Create a link to `peer`
    pub fn new<P: Peer>(peer: P) -> Self {
        Self::start(peer, false)
    }

    /// Create a link where the peer never answers
    pub fn silent() -> Self {
        Self::new(|_: &[u8]| Vec::new())
    }

    /// Create a link that never becomes writable
    pub fn frozen() -> Self {
        Self::start(|_: &[u8]| Vec::new(), true)
    }

    fn start<P: Peer>(peer: P, frozen: bool) -> Self {
        init_logging();

        let shared = Arc::new(Shared {
            open: AtomicBool::new(true),
            frozen,
            events: Mutex::new(Events::default()),
            wake: Condvar::new(),
        });

        let channel = Arc::new(SynchronousChannel::new(Loopback { shared: shared.clone() }));

        let driver = Driver {
            shared: shared.clone(),
            channel: Arc::downgrade(&channel),
            peer,
        };

        std::thread::spawn(move || driver.run());

        Link { shared, channel }
    }

    pub fn channel(&self) -> &Arc<SynchronousChannel<Loopback>> {
        &self.channel
    }

    /// Send a packet from the peer without it being a reply
    pub fn inject<P: Into<Vec<u8>>>(&self, packet: P) {
        self.shared.events.lock().inbound.push_back(packet.into());

        self.shared.wake.notify_all();
    }

    /// Every packet written by the channel so far
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.shared.events.lock().written.clone()
    }

    /// The peer closes the link
    pub fn hang_up(&self) {
        self.shared.exit();
    }

    /// Wait until the link thread stopped
    pub fn is_stopped(&self, timeout: Duration) -> bool {
        eventually(timeout, || self.shared.events.lock().stopped)
    }
}

/// The thread standing in for a socket thread
struct Driver<P> {
    shared: Arc<Shared>,
    channel: Weak<SynchronousChannel<Loopback>>,
    peer: P,
}

impl<P: Peer> Driver<P> {
    fn run(mut self) {
        let mut buffer = [0u8; 1024];

        loop {
            let (trigger, inbound) = {
                let mut events = self.shared.events.lock();

                while !events.trigger && events.inbound.is_empty() && !events.exit {
                    self.shared.wake.wait(&mut events);
                }

                if events.exit {
                    break;
                }

                (core::mem::take(&mut events.trigger), core::mem::take(&mut events.inbound))
            };

            let Some(channel) = self.channel.upgrade() else {
                break;
            };

            for packet in inbound {
                channel.on_read_ready(&packet);
            }

            if trigger {
                loop {
                    let len = channel.on_write_ready(&mut buffer);

                    if len == 0 {
                        break;
                    }

                    let packet = buffer[..len].to_vec();

                    let replies = self.peer.receive(&packet);

                    let mut events = self.shared.events.lock();

                    events.written.push(packet);

                    events.inbound.extend(replies);
                }
            }
        }

        self.shared.open.store(false, Ordering::Release);

        if let Some(channel) = self.channel.upgrade() {
            channel.state_change();
        }

        self.shared.events.lock().stopped = true;

        self.shared.wake.notify_all();
    }
}

/// A request of the echo protocol used for testing the engine
///
/// The request is `[id, payload ...]`, the response is `[id | 0x80, payload ...]`. A response
/// of `[id | 0x80, RESEND]` asks for the request to be sent again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Echo {
    pub id: u8,
    pub payload: Vec<u8>,
    pub reply: Option<Vec<u8>>,
    pub sent: usize,
    offset: usize,
    state: InboundState,
}

impl Echo {
    pub const RESEND: u8 = 0xFF;

    pub fn new(id: u8, payload: &[u8]) -> Self {
        Echo {
            id,
            payload: payload.to_vec(),
            reply: None,
            sent: 0,
            offset: 0,
            state: InboundState::InProgress,
        }
    }

    /// The packet written for this request
    pub fn packet(&self) -> Vec<u8> {
        let mut packet = vec![self.id];

        packet.extend_from_slice(&self.payload);

        packet
    }

    /// The reply of a peer to an echo request
    pub fn reply_to(packet: &[u8]) -> Vec<u8> {
        let mut reply = packet.to_vec();

        if let Some(id) = reply.first_mut() {
            *id |= 0x80;
        }

        reply
    }
}

impl Outbound for Echo {
    fn opcode(&self) -> u16 {
        self.id.into()
    }

    fn serialize(&mut self, stream: &mut [u8]) -> usize {
        let packet = self.packet();

        let size = (packet.len() - self.offset).min(stream.len());

        stream[..size].copy_from_slice(&packet[self.offset..self.offset + size]);

        self.offset += size;

        if size != 0 && self.offset == packet.len() {
            self.sent += 1;
        }

        size
    }

    fn reload(&mut self) {
        self.offset = 0;
        self.state = InboundState::InProgress;
    }
}

impl Inbound for Echo {
    fn deserialize(&mut self, stream: &[u8]) -> usize {
        match stream.first() {
            Some(id) if *id == self.id | 0x80 => {
                if stream.get(1) == Some(&Self::RESEND) {
                    self.state = InboundState::Resend;
                } else {
                    self.reply = Some(stream[1..].to_vec());
                    self.state = InboundState::Completed;
                }

                stream.len()
            }
            _ => 0,
        }
    }

    fn state(&self) -> InboundState {
        self.state
    }
}

/// A message without a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub data: Vec<u8>,
    offset: usize,
}

impl Datagram {
    pub fn new(data: &[u8]) -> Self {
        Datagram {
            data: data.to_vec(),
            offset: 0,
        }
    }
}

impl Outbound for Datagram {
    fn opcode(&self) -> u16 {
        self.data.first().copied().unwrap_or_default().into()
    }

    fn serialize(&mut self, stream: &mut [u8]) -> usize {
        let size = (self.data.len() - self.offset).min(stream.len());

        stream[..size].copy_from_slice(&self.data[self.offset..self.offset + size]);

        self.offset += size;

        size
    }

    fn reload(&mut self) {
        self.offset = 0;
    }
}

/// Packets of a scripted controller
pub mod controller {
    /// The opcode of a command packet
    pub fn opcode(packet: &[u8]) -> Option<u16> {
        match packet {
            [0x01, lo, hi, ..] => Some(u16::from_le_bytes([*lo, *hi])),
            _ => None,
        }
    }

    /// The parameters of a command packet
    pub fn parameters(packet: &[u8]) -> &[u8] {
        packet.get(4..).unwrap_or_default()
    }

    pub fn event(code: u8, parameters: &[u8]) -> Vec<u8> {
        let mut packet = vec![0x04, code, parameters.len() as u8];

        packet.extend_from_slice(parameters);

        packet
    }

    pub fn command_status(status: u8, opcode: u16) -> Vec<u8> {
        let opcode = opcode.to_le_bytes();

        event(0x0F, &[status, 0x01, opcode[0], opcode[1]])
    }

    pub fn command_complete(opcode: u16, return_parameters: &[u8]) -> Vec<u8> {
        let opcode = opcode.to_le_bytes();

        let mut parameters = vec![0x01, opcode[0], opcode[1]];

        parameters.extend_from_slice(return_parameters);

        event(0x0E, &parameters)
    }

    pub fn le_meta(sub_event: u8, payload: &[u8]) -> Vec<u8> {
        let mut parameters = vec![sub_event];

        parameters.extend_from_slice(payload);

        event(0x3E, &parameters)
    }

    /// An LE advertising report event with a single report
    pub fn advertising_report(address: [u8; 6], data: &[u8], rssi: i8) -> Vec<u8> {
        let mut payload = vec![0x01, 0x00, 0x00];

        payload.extend_from_slice(&address);
        payload.push(data.len() as u8);
        payload.extend_from_slice(data);
        payload.push(rssi as u8);

        le_meta(0x02, &payload)
    }

    /// A controller completing every command successfully
    pub fn accept_all(packet: &[u8]) -> Vec<Vec<u8>> {
        match opcode(packet) {
            Some(opcode) => vec![command_complete(opcode, &[0x00])],
            None => Vec::new(),
        }
    }
}

/// Packets of a scripted management interface
pub mod management {
    pub const COMMAND_COMPLETE: u16 = 0x0001;
    pub const COMMAND_STATUS: u16 = 0x0002;

    /// The opcode and the controller index of a command packet
    pub fn header(packet: &[u8]) -> Option<(u16, u16)> {
        match packet {
            [op_lo, op_hi, index_lo, index_hi, ..] => Some((
                u16::from_le_bytes([*op_lo, *op_hi]),
                u16::from_le_bytes([*index_lo, *index_hi]),
            )),
            _ => None,
        }
    }

    pub fn event(code: u16, index: u16, opcode: u16, status: u8, parameters: &[u8]) -> Vec<u8> {
        let len = (3 + parameters.len()) as u16;

        let mut packet = Vec::new();

        packet.extend_from_slice(&code.to_le_bytes());
        packet.extend_from_slice(&index.to_le_bytes());
        packet.extend_from_slice(&len.to_le_bytes());
        packet.extend_from_slice(&opcode.to_le_bytes());
        packet.push(status);
        packet.extend_from_slice(parameters);

        packet
    }

    /// A management interface completing every command successfully
    pub fn accept_all(packet: &[u8]) -> Vec<Vec<u8>> {
        match header(packet) {
            Some((opcode, index)) => vec![event(COMMAND_COMPLETE, index, opcode, 0, &[])],
            None => Vec::new(),
        }
    }
}

/// A scripted attribute server
///
/// Only 16-bit attribute types are supported by the server.
pub mod gatt {
    pub const PRIMARY_SERVICE: u16 = 0x2800;
    pub const CHARACTERISTIC: u16 = 0x2803;

    const ATTRIBUTE_NOT_FOUND: u8 = 0x0A;
    const INVALID_HANDLE: u8 = 0x01;
    const INVALID_OFFSET: u8 = 0x07;
    const REQUEST_NOT_SUPPORTED: u8 = 0x06;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Attribute {
        pub handle: u16,
        pub kind: u16,
        pub value: Vec<u8>,
    }

    /// An attribute server with a fixed set of attributes
    #[derive(Debug, Clone)]
    pub struct GattServer {
        mtu: u16,
        max_mtu: u16,
        attributes: Vec<Attribute>,
    }

    fn u16_at(pdu: &[u8], index: usize) -> Option<u16> {
        pdu.get(index..index + 2).map(|raw| u16::from_le_bytes([raw[0], raw[1]]))
    }

    fn error(request: u8, handle: u16, code: u8) -> Vec<u8> {
        let handle = handle.to_le_bytes();

        vec![0x01, request, handle[0], handle[1], code]
    }

    impl GattServer {
        /// Create a server supporting an MTU up to `max_mtu`
        pub fn new(max_mtu: u16) -> Self {
            GattServer {
                mtu: 23,
                max_mtu,
                attributes: Vec::new(),
            }
        }

        fn push(&mut self, kind: u16, value: Vec<u8>) -> u16 {
            let handle = self.attributes.len() as u16 + 1;

            self.attributes.push(Attribute { handle, kind, value });

            handle
        }

        /// Add a primary service
        pub fn service(mut self, uuid: u16) -> Self {
            self.push(PRIMARY_SERVICE, uuid.to_le_bytes().to_vec());
            self
        }

        /// Add a characteristic declaration and its value
        pub fn characteristic(mut self, properties: u8, uuid: u16, value: &[u8]) -> Self {
            let value_handle = self.attributes.len() as u16 + 2;

            let mut declaration = vec![properties];

            declaration.extend_from_slice(&value_handle.to_le_bytes());
            declaration.extend_from_slice(&uuid.to_le_bytes());

            self.push(CHARACTERISTIC, declaration);
            self.push(uuid, value.to_vec());
            self
        }

        /// Add a descriptor
        pub fn descriptor(mut self, uuid: u16, value: &[u8]) -> Self {
            self.push(uuid, value.to_vec());
            self
        }

        pub fn attribute(&self, handle: u16) -> Option<&Attribute> {
            self.attributes.iter().find(|a| a.handle == handle)
        }

        /// The last handle of the group started by the service at `handle`
        fn group_end(&self, handle: u16) -> u16 {
            self.attributes
                .iter()
                .find(|a| a.handle > handle && a.kind == PRIMARY_SERVICE)
                .map(|a| a.handle - 1)
                .unwrap_or(self.attributes.len() as u16)
        }

        fn in_range(&self, start: u16, end: u16) -> impl Iterator<Item = &Attribute> {
            self.attributes.iter().filter(move |a| a.handle >= start && a.handle <= end)
        }

        /// Put entries of equal size into a response PDU, up to the MTU
        fn entries(&self, mut response: Vec<u8>, entries: Vec<Vec<u8>>) -> Vec<u8> {
            let size = entries[0].len();

            for entry in entries.into_iter().take_while(|e| e.len() == size) {
                if response.len() + entry.len() > usize::from(self.mtu) {
                    break;
                }

                response.extend_from_slice(&entry);
            }

            response
        }

        /// Process a request, returning the response PDU
        pub fn process(&mut self, pdu: &[u8]) -> Option<Vec<u8>> {
            let request = *pdu.first()?;

            let response = match request {
                0x02 => {
                    let client = u16_at(pdu, 1)?;

                    self.mtu = client.min(self.max_mtu).max(23);

                    let mut response = vec![0x03];

                    response.extend_from_slice(&self.max_mtu.to_le_bytes());

                    response
                }
                0x04 => {
                    let (start, end) = (u16_at(pdu, 1)?, u16_at(pdu, 3)?);

                    let entries: Vec<Vec<u8>> = self
                        .in_range(start, end)
                        .map(|a| [a.handle.to_le_bytes(), a.kind.to_le_bytes()].concat())
                        .collect();

                    if entries.is_empty() {
                        error(request, start, ATTRIBUTE_NOT_FOUND)
                    } else {
                        self.entries(vec![0x05, 0x01], entries)
                    }
                }
                0x06 => {
                    let (start, end, kind) = (u16_at(pdu, 1)?, u16_at(pdu, 3)?, u16_at(pdu, 5)?);

                    let value = &pdu[7..];

                    let entries: Vec<Vec<u8>> = self
                        .in_range(start, end)
                        .filter(|a| a.kind == kind && a.value == value)
                        .map(|a| [a.handle.to_le_bytes(), self.group_end(a.handle).to_le_bytes()].concat())
                        .collect();

                    if entries.is_empty() {
                        error(request, start, ATTRIBUTE_NOT_FOUND)
                    } else {
                        self.entries(vec![0x07], entries)
                    }
                }
                0x08 | 0x10 => {
                    let (start, end, kind) = (u16_at(pdu, 1)?, u16_at(pdu, 3)?, u16_at(pdu, 5)?);

                    let entries: Vec<Vec<u8>> = self
                        .in_range(start, end)
                        .filter(|a| a.kind == kind)
                        .map(|a| {
                            let mut entry = a.handle.to_le_bytes().to_vec();

                            if request == 0x10 {
                                entry.extend_from_slice(&self.group_end(a.handle).to_le_bytes());
                            }

                            entry.extend_from_slice(&a.value);

                            entry
                        })
                        .collect();

                    if entries.is_empty() {
                        error(request, start, ATTRIBUTE_NOT_FOUND)
                    } else {
                        let len = entries[0].len() as u8;

                        self.entries(vec![request + 1, len], entries)
                    }
                }
                0x0A | 0x0C => {
                    let handle = u16_at(pdu, 1)?;

                    let offset = if request == 0x0C { usize::from(u16_at(pdu, 3)?) } else { 0 };

                    let mtu = usize::from(self.mtu);

                    match self.attribute(handle) {
                        None => error(request, handle, INVALID_HANDLE),
                        Some(a) if offset > a.value.len() => error(request, handle, INVALID_OFFSET),
                        Some(a) => {
                            let value = &a.value[offset..];

                            let mut response = vec![request + 1];

                            response.extend_from_slice(&value[..value.len().min(mtu - 1)]);

                            response
                        }
                    }
                }
                0x12 | 0x52 => {
                    let handle = u16_at(pdu, 1)?;

                    let found = self.attributes.iter_mut().find(|a| a.handle == handle);

                    match (found, request) {
                        (Some(a), 0x12) => {
                            a.value = pdu[3..].to_vec();

                            vec![0x13]
                        }
                        (Some(a), _) => {
                            a.value = pdu[3..].to_vec();

                            return None;
                        }
                        (None, 0x12) => error(request, handle, INVALID_HANDLE),
                        (None, _) => return None,
                    }
                }
                0x1E => return None,
                _ => error(request, 0, REQUEST_NOT_SUPPORTED),
            };

            Some(response)
        }
    }

    impl crate::Peer for GattServer {
        fn receive(&mut self, packet: &[u8]) -> Vec<Vec<u8>> {
            self.process(packet).into_iter().collect()
        }
    }
}
