//! Device discovery
//!
//! While LE scanning is enabled the controller sends LE advertising report events. These are not
//! responses to any command so they end up in the unsolicited handler of the HCI channel, which is
//! where a [`Discovery`] is installed.

use crate::events::{Event, LeMeta};
use bt_exchange_channel::Unsolicited;
use bt_exchange_core::Address;

/// AD type of a shortened local name
pub const EIR_NAME_SHORT: u8 = 0x08;

/// AD type of a complete local name
pub const EIR_NAME_COMPLETE: u8 = 0x09;

/// Receiver of discovered devices
pub trait DiscoveredDevice: Send {
    fn discovered(&mut self, address: Address, short_name: &str, long_name: &str);
}

impl<F> DiscoveredDevice for F
where
    F: FnMut(Address, &str, &str) + Send,
{
    fn discovered(&mut self, address: Address, short_name: &str, long_name: &str) {
        self(address, short_name, long_name)
    }
}

/// A single report of an LE advertising report event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisingReport {
    pub event_type: u8,
    pub address_type: u8,
    pub address: Address,
    pub data: Vec<u8>,
    pub rssi: i8,
}

impl AdvertisingReport {
    /// Parse the reports of an LE advertising report event
    ///
    /// `payload` is the event parameter after the sub event code. Parsing stops at the first
    /// malformed report.
    pub fn parse_all(payload: &[u8]) -> Vec<AdvertisingReport> {
        let mut reports = Vec::new();

        let Some((&count, mut rest)) = payload.split_first() else {
            return reports;
        };

        for _ in 0..count {
            let Some(header) = rest.get(..9) else {
                break;
            };

            let len = usize::from(header[8]);

            let (Some(data), Some(&rssi)) = (rest.get(9..9 + len), rest.get(9 + len)) else {
                log::trace!("malformed advertising report");
                break;
            };

            let Some(address) = Address::try_from_slice(&header[2..8]) else {
                break;
            };

            reports.push(AdvertisingReport {
                event_type: header[0],
                address_type: header[1],
                address,
                data: data.to_vec(),
                rssi: rssi as i8,
            });

            rest = &rest[10 + len..];
        }

        reports
    }

    /// Get the shortened and the complete local name within the advertising data
    ///
    /// Either one is empty if it is not part of the data.
    pub fn names(&self) -> (String, String) {
        let mut short_name = String::new();
        let mut long_name = String::new();

        for (ad_type, value) in AdStructures(&self.data) {
            match ad_type {
                EIR_NAME_SHORT => short_name = String::from_utf8_lossy(value).into_owned(),
                EIR_NAME_COMPLETE => long_name = String::from_utf8_lossy(value).into_owned(),
                _ => (),
            }
        }

        (short_name, long_name)
    }
}

/// Iterator over the AD structures of advertising data
///
/// An AD structure is `[length][type][value ...]` where the length includes the type.
struct AdStructures<'a>(&'a [u8]);

impl<'a> Iterator for AdStructures<'a> {
    type Item = (u8, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        let len = usize::from(*self.0.first()?);

        if len == 0 {
            return None;
        }

        let structure = self.0.get(1..=len)?;

        self.0 = &self.0[len + 1..];

        Some((structure[0], &structure[1..]))
    }
}

/// Unsolicited handler of the HCI channel reporting discovered devices
pub struct Discovery<D> {
    sink: D,
}

impl<D: DiscoveredDevice> Discovery<D> {
    pub fn new(sink: D) -> Self {
        Discovery { sink }
    }

    pub fn into_inner(self) -> D {
        self.sink
    }
}

impl<D: DiscoveredDevice> Unsolicited for Discovery<D> {
    fn deserialize(&mut self, stream: &[u8]) -> usize {
        let Some((event, size)) = Event::from_packet(stream) else {
            log::trace!("dropped {} byte(s) that are not an event packet", stream.len());
            return stream.len();
        };

        match event {
            Event::LeMeta { sub_event, payload } if sub_event == LeMeta::AdvertisingReport.into_raw() => {
                for report in AdvertisingReport::parse_all(payload) {
                    let (short_name, long_name) = report.names();

                    log::debug!("discovered {} ({} dBm)", report.address, report.rssi);

                    self.sink.discovered(report.address, &short_name, &long_name);
                }
            }
            event => log::trace!("unsolicited event {:?}", event),
        }

        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_event(reports: &[(&[u8; 6], &[u8])]) -> Vec<u8> {
        let mut payload = vec![LeMeta::AdvertisingReport.into_raw(), reports.len() as u8];

        for (address, data) in reports {
            payload.extend_from_slice(&[0x00, 0x00]);
            payload.extend_from_slice(*address);
            payload.push(data.len() as u8);
            payload.extend_from_slice(data);
            payload.push(0xC4);
        }

        let mut packet = vec![0x04, 0x3E, payload.len() as u8];

        packet.extend_from_slice(&payload);

        packet
    }

    #[test]
    fn names_of_advertising_data() {
        let report = AdvertisingReport {
            event_type: 0,
            address_type: 0,
            address: Address::ANY,
            data: vec![0x02, 0x01, 0x06, 0x04, 0x08, b'b', b'u', b'd', 0x05, 0x09, b'b', b'u', b'd', b's'],
            rssi: 0,
        };

        assert_eq!(("bud".to_string(), "buds".to_string()), report.names());
    }

    #[test]
    fn truncated_ad_structure() {
        let report = AdvertisingReport {
            event_type: 0,
            address_type: 0,
            address: Address::ANY,
            data: vec![0x02, 0x09, b'a', 0x09, 0x08, b'b'],
            rssi: 0,
        };

        assert_eq!((String::new(), "a".to_string()), report.names());
    }

    #[test]
    fn every_report_is_discovered() {
        let mut found = Vec::new();

        let packet = report_event(&[
            (&[1, 1, 1, 1, 1, 1], &[0x03, 0x09, b'h', b'i']),
            (&[2, 2, 2, 2, 2, 2], &[]),
        ]);

        let mut discovery = Discovery::new(|address: Address, short: &str, long: &str| {
            found.push((address, short.to_string(), long.to_string()))
        });

        assert_eq!(packet.len(), discovery.deserialize(&packet));

        drop(discovery);

        assert_eq!(
            vec![
                (Address::from_bytes([1; 6]), String::new(), "hi".to_string()),
                (Address::from_bytes([2; 6]), String::new(), String::new()),
            ],
            found
        );
    }

    #[test]
    fn rssi_is_signed() {
        let packet = report_event(&[(&[3; 6], &[])]);

        let reports = AdvertisingReport::parse_all(&packet[4..]);

        assert_eq!(-60, reports[0].rssi);
    }
}
