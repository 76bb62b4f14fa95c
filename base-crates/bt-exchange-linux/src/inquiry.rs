//! Classic inquiry through the kernel

use crate::device::{self, hci_inquiry_req};
use crate::{Error, FileDescriptor};
use bt_exchange_core::Address;
use bt_exchange_hci::Inquiry;
use nix::libc;
use std::time::Duration;

/// The maximum number of responses collected by one inquiry
const MAX_RESPONSES: u8 = 255;

/// Inquiry length is in units of 1.28 seconds
const INQUIRY_LENGTH_UNIT_MS: u128 = 1280;

/// The largest inquiry length accepted by a controller
const MAX_INQUIRY_LENGTH: u8 = 0x30;

/// Classic inquiry of a controller using the `HCIINQUIRY` ioctl
///
/// The kernel runs the inquiry and collects the responses, so the inquiry is not affected by the
/// events read from a raw HCI socket of the same controller.
pub struct HciInquiry {
    socket: FileDescriptor,
    dev_id: u16,
}

impl HciInquiry {
    pub fn new(dev_id: u16) -> Result<Self, Error> {
        let socket = device::socket(libc::SOCK_RAW, device::BTPROTO_HCI)?;

        Ok(HciInquiry { socket, dev_id })
    }

    pub fn dev_id(&self) -> u16 {
        self.dev_id
    }
}

/// Convert an inquiry duration into the inquiry length of the controller
fn inquiry_length(duration: Duration) -> u8 {
    let units = duration.as_millis() / INQUIRY_LENGTH_UNIT_MS;

    units.clamp(1, MAX_INQUIRY_LENGTH.into()) as u8
}

/// Get the addresses from the response entries written after the request
fn addresses(entries: &[u8], count: usize) -> Vec<Address> {
    entries
        .chunks_exact(device::INQUIRY_INFO_SIZE)
        .take(count)
        .filter_map(|info| Address::try_from_slice(&info[..6]))
        .collect()
}

impl Inquiry for HciInquiry {
    fn inquiry(&self, duration: Duration, lap: u32, flags: u32) -> bt_exchange_core::Result<Vec<Address>> {
        let header_size = std::mem::size_of::<hci_inquiry_req>();

        let mut buffer = vec![0u8; header_size + usize::from(MAX_RESPONSES) * device::INQUIRY_INFO_SIZE];

        let lap = lap.to_le_bytes();

        let request = hci_inquiry_req {
            dev_id: self.dev_id,
            flags: flags as u16 | device::IREQ_CACHE_FLUSH,
            lap: [lap[0], lap[1], lap[2]],
            length: inquiry_length(duration),
            num_rsp: MAX_RESPONSES,
        };

        unsafe { std::ptr::write_unaligned(buffer.as_mut_ptr() as *mut hci_inquiry_req, request) };

        log::info!("inquiry on hci{} for {:?}", self.dev_id, duration);

        let rslt = unsafe { device::hci_inquiry(self.socket.raw_fd(), buffer.as_mut_ptr() as *mut libc::c_int) };

        if let Err(e) = rslt {
            log::warn!("inquiry failed: {}", e);

            return Err(Error::Sys(e).into());
        }

        let response = unsafe { std::ptr::read_unaligned(buffer.as_ptr() as *const hci_inquiry_req) };

        Ok(addresses(&buffer[header_size..], response.num_rsp.into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_is_clamped() {
        assert_eq!(1, inquiry_length(Duration::from_millis(500)));

        assert_eq!(7, inquiry_length(Duration::from_secs(10)));

        assert_eq!(MAX_INQUIRY_LENGTH, inquiry_length(Duration::from_secs(600)));
    }

    #[test]
    fn response_addresses() {
        let mut entries = vec![0u8; 3 * device::INQUIRY_INFO_SIZE];

        entries[..6].copy_from_slice(&[1, 2, 3, 4, 5, 6]);
        entries[14..20].copy_from_slice(&[6, 5, 4, 3, 2, 1]);

        assert_eq!(
            vec![
                Address::from_bytes([1, 2, 3, 4, 5, 6]),
                Address::from_bytes([6, 5, 4, 3, 2, 1])
            ],
            addresses(&entries, 2)
        );
    }
}
