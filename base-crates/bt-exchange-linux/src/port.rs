//! A socket driven by its own thread

use crate::device::{self, sockaddr_hci, sockaddr_l2};
use crate::{Error, FileDescriptor, SocketConfig};
use bt_exchange_channel::{SynchronousChannel, Transport};
use bt_exchange_core::{Address, AddressType};
use nix::libc;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::ThreadId;
use std::time::{Duration, Instant};

/// State shared between a port and its socket thread
struct Shared {
    socket: FileDescriptor,
    trigger: FileDescriptor,
    exit: FileDescriptor,
    open: AtomicBool,
    thread: Mutex<Option<ThreadId>>,
    running: Mutex<bool>,
    stopped: Condvar,
}

impl Shared {
    fn stop(&self) {
        if let Err(e) = device::signal(&self.exit) {
            log::error!("failed to signal the socket thread to exit: {}", e);
        }
    }
}

/// The [`Transport`] of a Bluetooth socket
///
/// A `SocketPort` is created already wrapped within the channel it transports for. A thread is
/// spawned that polls the socket and calls into the channel, it runs until the socket is closed
/// by either side.
pub struct SocketPort {
    shared: Arc<Shared>,
    label: &'static str,
    close_timeout: Duration,
}

impl SocketPort {
    /// Open the raw HCI channel of the controller `dev_id`
    ///
    /// Only event packets are received from the socket.
    pub fn hci(dev_id: u16, config: &SocketConfig) -> Result<Arc<SynchronousChannel<Self>>, Error> {
        let socket = device::socket(libc::SOCK_RAW, device::BTPROTO_HCI)?;

        device::set_event_filter(&socket)?;

        device::bind(
            &socket,
            &sockaddr_hci {
                hci_family: libc::AF_BLUETOOTH as libc::sa_family_t,
                hci_dev: dev_id,
                hci_channel: device::HCI_CHANNEL_RAW,
            },
        )?;

        Self::start(socket, "hci", config)
    }

    /// Open the management channel
    ///
    /// The management channel is not bound to a controller, the controller index is part of every
    /// management packet.
    pub fn management(config: &SocketConfig) -> Result<Arc<SynchronousChannel<Self>>, Error> {
        let socket = device::socket(libc::SOCK_RAW, device::BTPROTO_HCI)?;

        device::bind(
            &socket,
            &sockaddr_hci {
                hci_family: libc::AF_BLUETOOTH as libc::sa_family_t,
                hci_dev: device::HCI_DEV_NONE,
                hci_channel: device::HCI_CHANNEL_CONTROL,
            },
        )?;

        Self::start(socket, "management", config)
    }

    /// Connect to the attribute protocol channel of a LE peer
    ///
    /// This blocks until the kernel established the connection.
    pub fn att(
        address: Address,
        address_type: AddressType,
        config: &SocketConfig,
    ) -> Result<Arc<SynchronousChannel<Self>>, Error> {
        let socket = device::socket(libc::SOCK_SEQPACKET, device::BTPROTO_L2CAP)?;

        device::bind(
            &socket,
            &sockaddr_l2 {
                l2_family: libc::AF_BLUETOOTH as libc::sa_family_t,
                l2_psm: 0,
                l2_bdaddr: Address::ANY.to_bytes(),
                l2_cid: device::L2CAP_CID_ATT.to_le(),
                l2_bdaddr_type: AddressType::LePublic.into_raw(),
            },
        )?;

        log::info!("connecting the attribute channel of {} ({})", address, address_type);

        device::connect(
            &socket,
            &sockaddr_l2 {
                l2_family: libc::AF_BLUETOOTH as libc::sa_family_t,
                l2_psm: 0,
                l2_bdaddr: address.to_bytes(),
                l2_cid: device::L2CAP_CID_ATT.to_le(),
                l2_bdaddr_type: address_type.into_raw(),
            },
        )?;

        Self::start(socket, "att", config)
    }

    fn start(
        socket: FileDescriptor,
        label: &'static str,
        config: &SocketConfig,
    ) -> Result<Arc<SynchronousChannel<Self>>, Error> {
        let shared = Arc::new(Shared {
            socket,
            trigger: device::event_fd()?,
            exit: device::event_fd()?,
            open: AtomicBool::new(true),
            thread: Mutex::new(None),
            running: Mutex::new(true),
            stopped: Condvar::new(),
        });

        let channel = Arc::new(SynchronousChannel::new(SocketPort {
            shared: shared.clone(),
            label,
            close_timeout: config.close_timeout,
        }));

        let task = SocketThread {
            shared: shared.clone(),
            channel: Arc::downgrade(&channel),
            read_buffer: vec![0; config.read_buffer_size],
            write_buffer: vec![0; config.write_buffer_size],
            label,
        };

        let handle = std::thread::Builder::new()
            .name(format!("bt-exchange-{}", label))
            .spawn(move || task.run())?;

        *shared.thread.lock() = Some(handle.thread().id());

        log::debug!("{} socket opened", label);

        Ok(channel)
    }
}

impl Transport for SocketPort {
    fn is_open(&self) -> bool {
        self.shared.open.load(Ordering::Acquire)
    }

    fn trigger(&self) {
        if let Err(e) = device::signal(&self.shared.trigger) {
            log::error!("failed to trigger the {} socket: {}", self.label, e);
        }
    }

    fn close(&self, wait: Duration) -> bt_exchange_core::Result<()> {
        self.shared.stop();

        // The socket thread cannot wait for itself
        if *self.shared.thread.lock() == Some(std::thread::current().id()) {
            return Ok(());
        }

        let deadline = Instant::now() + wait;

        let mut running = self.shared.running.lock();

        while *running {
            if self.shared.stopped.wait_until(&mut running, deadline).timed_out() {
                log::warn!("{} socket thread did not stop in time", self.label);

                return Err(bt_exchange_core::Error::TimedOut);
            }
        }

        Ok(())
    }
}

impl Drop for SocketPort {
    fn drop(&mut self) {
        if let Err(e) = Transport::close(self, self.close_timeout) {
            log::warn!("{} socket dropped while its thread is running: {}", self.label, e);
        }
    }
}

/// The thread polling a socket
struct SocketThread {
    shared: Arc<Shared>,
    channel: Weak<SynchronousChannel<SocketPort>>,
    read_buffer: Vec<u8>,
    write_buffer: Vec<u8>,
    label: &'static str,
}

impl SocketThread {
    const SOCKET: usize = 0;
    const TRIGGER: usize = 1;
    const EXIT: usize = 2;

    fn run(mut self) {
        if let Err(e) = self.poll_loop() {
            log::error!("{} socket failed: {}", self.label, e);
        }

        self.shared.open.store(false, Ordering::Release);

        if let Some(channel) = self.channel.upgrade() {
            channel.state_change();
        }

        *self.shared.running.lock() = false;

        self.shared.stopped.notify_all();

        log::debug!("{} socket closed", self.label);
    }

    fn poll_loop(&mut self) -> nix::Result<()> {
        let mut fds = [
            libc::pollfd {
                fd: self.shared.socket.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.shared.trigger.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
            libc::pollfd {
                fd: self.shared.exit.raw_fd(),
                events: libc::POLLIN,
                revents: 0,
            },
        ];

        loop {
            crate::ignore_eagain_and_eintr(|| {
                let rslt = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, -1) };

                if rslt < 0 {
                    Err(nix::errno::Errno::last())
                } else {
                    Ok(())
                }
            })?;

            if fds[Self::EXIT].revents != 0 {
                return Ok(());
            }

            let Some(channel) = self.channel.upgrade() else {
                return Ok(());
            };

            if fds[Self::SOCKET].revents & libc::POLLIN != 0 {
                let len = crate::ignore_eagain_and_eintr(|| {
                    nix::unistd::read(self.shared.socket.raw_fd(), &mut self.read_buffer)
                })?;

                if len == 0 {
                    log::info!("{} socket closed by the peer", self.label);

                    return Ok(());
                }

                let consumed = channel.on_read_ready(&self.read_buffer[..len]);

                if consumed < len {
                    log::warn!(
                        "{} socket dropped {} unconsumed bytes (read buffer is {} bytes)",
                        self.label,
                        len - consumed,
                        self.read_buffer.len()
                    );
                }
            } else if fds[Self::SOCKET].revents & (libc::POLLHUP | libc::POLLERR) != 0 {
                log::info!("{} socket hung up", self.label);

                return Ok(());
            }

            if fds[Self::TRIGGER].revents != 0 {
                device::clear(&self.shared.trigger)?;

                self.write_pending(&channel)?;
            }
        }
    }

    /// Write until the channel has nothing more to send
    fn write_pending(&mut self, channel: &SynchronousChannel<SocketPort>) -> nix::Result<()> {
        loop {
            let len = channel.on_write_ready(&mut self.write_buffer);

            if len == 0 {
                return Ok(());
            }

            crate::ignore_eagain_and_eintr(|| nix::unistd::write(self.shared.socket.raw_fd(), &self.write_buffer[..len]))?;
        }
    }
}
