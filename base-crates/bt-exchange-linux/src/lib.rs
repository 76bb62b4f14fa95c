//! Linux Bluetooth sockets as exchange transports
//!
//! The kernel exposes a Bluetooth controller through sockets of the `AF_BLUETOOTH` family. This
//! crate opens those sockets and drives a [`SynchronousChannel`] over each of them from a
//! dedicated thread.
//!
//! * [`SocketPort::hci`] opens the raw HCI channel of a controller
//! * [`SocketPort::management`] opens the kernel's management (control) channel
//! * [`SocketPort::att`] connects the fixed LE attribute protocol channel of a peer
//!
//! ```no_run
//! use bt_exchange_linux::{SocketConfig, SocketPort};
//! use bt_exchange_hci::commands::cb::reset;
//! use std::time::Duration;
//!
//! let hci = SocketPort::hci(0, &SocketConfig::default()).expect("no controller");
//!
//! reset::send(&hci, Duration::from_secs(1)).expect("reset failed");
//! ```
//!
//! [`SynchronousChannel`]: bt_exchange_channel::SynchronousChannel

mod device;
mod inquiry;
mod port;

pub use inquiry::HciInquiry;
pub use port::SocketPort;

use std::os::unix::io::RawFd;

/// Errors of the Linux transport
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("system error: {0}")]
    Sys(#[from] nix::Error),
    #[error("failed to start the socket thread: {0}")]
    Thread(#[from] std::io::Error),
}

impl From<Error> for bt_exchange_core::Error {
    fn from(e: Error) -> Self {
        match e {
            Error::Sys(errno) => bt_exchange_core::Error::Io(errno as i32),
            Error::Thread(io) => bt_exchange_core::Error::Io(io.raw_os_error().unwrap_or_default()),
        }
    }
}

/// Configuration of a socket thread
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SocketConfig {
    /// Size of the buffer a received packet is read into
    pub read_buffer_size: usize,
    /// Size of the buffer a message is serialized into
    pub write_buffer_size: usize,
    /// Wait for the socket thread to stop when the port is closed or dropped
    pub close_timeout: std::time::Duration,
}

impl Default for SocketConfig {
    fn default() -> Self {
        SocketConfig {
            read_buffer_size: 1024,
            write_buffer_size: 1024,
            close_timeout: std::time::Duration::from_secs(1),
        }
    }
}

/// An owned file descriptor, closed on drop
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct FileDescriptor(RawFd);

impl FileDescriptor {
    /// Take ownership of the return of a libc call creating a file descriptor
    pub(crate) fn from_raw(raw_fd: RawFd) -> nix::Result<Self> {
        if raw_fd < 0 {
            Err(nix::errno::Errno::last())
        } else {
            Ok(FileDescriptor(raw_fd))
        }
    }

    pub(crate) fn raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for FileDescriptor {
    fn drop(&mut self) {
        if let Err(e) = nix::unistd::close(self.0) {
            log::error!("failed to close file descriptor {}: {}", self.0, e);
        }
    }
}

/// Retry `func` while it fails with `EAGAIN` or `EINTR`
pub(crate) fn ignore_eagain_and_eintr<F, R>(mut func: F) -> nix::Result<R>
where
    F: FnMut() -> nix::Result<R>,
{
    use nix::errno::Errno;

    loop {
        match func() {
            Err(Errno::EAGAIN) | Err(Errno::EINTR) => continue,
            result => break result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_descriptor_is_an_error() {
        assert!(FileDescriptor::from_raw(-1).is_err());
    }

    #[test]
    fn error_into_io() {
        let e: bt_exchange_core::Error = Error::Sys(nix::errno::Errno::ENODEV).into();

        assert_eq!(bt_exchange_core::Error::Io(nix::libc::ENODEV), e);
    }

    #[test]
    fn retries_interrupted_calls() {
        let mut tries = 0;

        let result = ignore_eagain_and_eintr(|| {
            tries += 1;

            if tries < 3 {
                Err(nix::errno::Errno::EINTR)
            } else {
                Ok(tries)
            }
        });

        assert_eq!(Ok(3), result);
    }
}
