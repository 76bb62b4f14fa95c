//! Linux Bluetooth socket definitions
//!
//! These are the kernel structures and constants used for opening Bluetooth sockets. This isn't a
//! complete set of them, it is just what is used by this library. These are linux specific and
//! have no relation to the Bluetooth specification.

use crate::FileDescriptor;
use nix::libc;

pub const BTPROTO_L2CAP: i32 = 0;
pub const BTPROTO_HCI: i32 = 1;

pub const HCI_CHANNEL_RAW: u16 = 0;
pub const HCI_CHANNEL_CONTROL: u16 = 3;

/// The device index of a socket not bound to a controller
pub const HCI_DEV_NONE: u16 = 0xFFFF;

pub const SOL_HCI: i32 = 0;
pub const HCI_FILTER: i32 = 2;

/// Packet type of an event within the type mask of a `hci_filter`
pub const HCI_EVENT_PKT: u32 = 0x04;

/// Fixed channel of the attribute protocol over a LE-U link
pub const L2CAP_CID_ATT: u16 = 0x0004;

#[repr(C)]
#[derive(Default)]
pub struct hci_filter {
    pub type_mask: u32,
    pub event_mask: [u32; 2usize],
    pub opcode: u16,
}

#[repr(C)]
#[derive(Default)]
pub struct sockaddr_hci {
    pub hci_family: libc::sa_family_t,
    pub hci_dev: u16,
    pub hci_channel: u16,
}

#[repr(C)]
#[derive(Default)]
pub struct sockaddr_l2 {
    pub l2_family: libc::sa_family_t,
    pub l2_psm: u16,
    pub l2_bdaddr: [u8; 6],
    pub l2_cid: u16,
    pub l2_bdaddr_type: u8,
}

#[repr(C)]
#[derive(Default)]
pub struct hci_inquiry_req {
    pub dev_id: u16,
    pub flags: u16,
    pub lap: [u8; 3],
    pub length: u8,
    pub num_rsp: u8,
}

/// Size of an `inquiry_info` entry (a packed structure)
pub const INQUIRY_INFO_SIZE: usize = 14;

/// Flush the inquiry cache of the kernel before the inquiry
pub const IREQ_CACHE_FLUSH: u16 = 0x0001;

// ioctl magic for the IOCTL values
const HCI_IOC_MAGIC: u8 = b'H';

const HCI_IOC_HCIINQUIRY: u8 = 240;

nix::ioctl_read!(hci_inquiry, HCI_IOC_MAGIC, HCI_IOC_HCIINQUIRY, std::os::raw::c_int);

/// Create a Bluetooth socket
pub fn socket(kind: i32, protocol: i32) -> nix::Result<FileDescriptor> {
    FileDescriptor::from_raw(unsafe { libc::socket(libc::AF_BLUETOOTH, kind | libc::SOCK_CLOEXEC, protocol) })
}

/// Bind `fd` to the address `T`
pub fn bind<T>(fd: &FileDescriptor, address: &T) -> nix::Result<()> {
    let sa_p = address as *const T as *const libc::sockaddr;

    let sa_len = std::mem::size_of::<T>() as libc::socklen_t;

    if unsafe { libc::bind(fd.raw_fd(), sa_p, sa_len) } < 0 {
        Err(nix::errno::Errno::last())
    } else {
        Ok(())
    }
}

/// Connect `fd` to the address `T`
///
/// This blocks until the connection is established or the kernel gives up on it.
pub fn connect<T>(fd: &FileDescriptor, address: &T) -> nix::Result<()> {
    let sa_p = address as *const T as *const libc::sockaddr;

    let sa_len = std::mem::size_of::<T>() as libc::socklen_t;

    crate::ignore_eagain_and_eintr(|| {
        if unsafe { libc::connect(fd.raw_fd(), sa_p, sa_len) } < 0 {
            Err(nix::errno::Errno::last())
        } else {
            Ok(())
        }
    })
}

/// Only let events through the raw HCI socket
pub fn set_event_filter(fd: &FileDescriptor) -> nix::Result<()> {
    let filter = hci_filter {
        type_mask: 1 << HCI_EVENT_PKT,
        event_mask: [!0; 2],
        opcode: 0,
    };

    let rslt = unsafe {
        libc::setsockopt(
            fd.raw_fd(),
            SOL_HCI,
            HCI_FILTER,
            &filter as *const hci_filter as *const libc::c_void,
            std::mem::size_of::<hci_filter>() as libc::socklen_t,
        )
    };

    if rslt < 0 {
        Err(nix::errno::Errno::last())
    } else {
        Ok(())
    }
}

/// Create an event file descriptor
pub fn event_fd() -> nix::Result<FileDescriptor> {
    FileDescriptor::from_raw(unsafe { libc::eventfd(0, libc::EFD_CLOEXEC | libc::EFD_NONBLOCK) })
}

/// Signal an event file descriptor
///
/// The value doesn't really matter (just that it is 8 bytes, not 0, and not !0)
pub fn signal(fd: &FileDescriptor) -> nix::Result<()> {
    match nix::unistd::write(fd.raw_fd(), &1u64.to_ne_bytes()) {
        Ok(_) | Err(nix::errno::Errno::EAGAIN) => Ok(()),
        Err(e) => Err(e),
    }
}

/// Clear the counter of an event file descriptor
pub fn clear(fd: &FileDescriptor) -> nix::Result<()> {
    let mut counter = [0u8; 8];

    match nix::unistd::read(fd.raw_fd(), &mut counter) {
        Ok(_) | Err(nix::errno::Errno::EAGAIN) => Ok(()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structure_sizes() {
        assert_eq!(16, std::mem::size_of::<hci_filter>());

        assert_eq!(6, std::mem::size_of::<sockaddr_hci>());

        assert_eq!(14, std::mem::size_of::<sockaddr_l2>());

        assert_eq!(10, std::mem::size_of::<hci_inquiry_req>());
    }

    #[test]
    fn event_fd_signal_and_clear() {
        let fd = event_fd().unwrap();

        signal(&fd).unwrap();

        signal(&fd).unwrap();

        clear(&fd).unwrap();

        // cleared and non-blocking
        clear(&fd).unwrap();
    }
}
