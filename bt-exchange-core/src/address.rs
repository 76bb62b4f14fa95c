//! Bluetooth device address

use core::fmt;
use core::str::FromStr;

/// A Bluetooth device address
///
/// The six bytes are stored in the order they are transferred over the wire, which is little
/// endian. The canonical string form lists the most significant byte first, i.e. `00:1A:7D:DA:71:13`
/// is stored as `[0x13, 0x71, 0xDA, 0x7D, 0x1A, 0x00]`.
///
/// ```
/// # use bt_exchange_core::Address;
/// let address: Address = "00:1A:7D:DA:71:13".parse().unwrap();
///
/// assert_eq!([0x13, 0x71, 0xDA, 0x7D, 0x1A, 0x00], address.to_bytes());
/// assert_eq!("00:1A:7D:DA:71:13", address.to_string());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Address([u8; 6]);

impl Address {
    /// The address of all zeros
    ///
    /// This is used by the Linux kernel to mean "any" adapter.
    pub const ANY: Address = Address([0; 6]);

    /// Create an address from bytes in little endian order
    pub const fn from_bytes(bytes: [u8; 6]) -> Self {
        Address(bytes)
    }

    /// Create an address from a slice of little endian bytes
    ///
    /// `None` is returned if `raw` is shorter than six bytes.
    pub fn try_from_slice(raw: &[u8]) -> Option<Self> {
        let bytes: [u8; 6] = raw.get(..6)?.try_into().ok()?;

        Some(Address(bytes))
    }

    /// Get the bytes of the address in little endian order
    pub const fn to_bytes(self) -> [u8; 6] {
        self.0
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 6]> for Address {
    fn from(bytes: [u8; 6]) -> Self {
        Address(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            self.0[5], self.0[4], self.0[3], self.0[2], self.0[1], self.0[0]
        )
    }
}

/// Error for parsing an [`Address`] from its string form
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("an address consists of six colon separated octets")]
    IncorrectLength,
    #[error("octet '{0}' is not a two digit hexadecimal number")]
    IncorrectDigit(String),
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut octets = s.split(':');

        // the string is most significant octet first
        for byte in bytes.iter_mut().rev() {
            let octet = octets.next().ok_or(AddressError::IncorrectLength)?;

            if octet.len() != 2 {
                return Err(AddressError::IncorrectDigit(octet.to_string()));
            }

            *byte = u8::from_str_radix(octet, 16).map_err(|_| AddressError::IncorrectDigit(octet.to_string()))?;
        }

        if octets.next().is_some() {
            return Err(AddressError::IncorrectLength);
        }

        Ok(Address(bytes))
    }
}

impl TryFrom<&str> for Address {
    type Error = AddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// The kind of a device address
///
/// The raw value is the address type used by the Linux management interface.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressType {
    /// A BR/EDR (classic) address
    #[default]
    BrEdr,
    /// A public LE address
    LePublic,
    /// A random LE address
    LeRandom,
}

impl AddressType {
    pub const fn into_raw(self) -> u8 {
        match self {
            AddressType::BrEdr => 0x00,
            AddressType::LePublic => 0x01,
            AddressType::LeRandom => 0x02,
        }
    }

    pub const fn try_from_raw(raw: u8) -> Option<Self> {
        match raw {
            0x00 => Some(AddressType::BrEdr),
            0x01 => Some(AddressType::LePublic),
            0x02 => Some(AddressType::LeRandom),
            _ => None,
        }
    }

    /// Get the HCI LE address type (public = 0, random = 1)
    ///
    /// A BR/EDR address is reported as public.
    pub const fn le_raw(self) -> u8 {
        match self {
            AddressType::LeRandom => 0x01,
            _ => 0x00,
        }
    }
}

impl fmt::Display for AddressType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AddressType::BrEdr => f.write_str("BR/EDR"),
            AddressType::LePublic => f.write_str("LE public"),
            AddressType::LeRandom => f.write_str("LE random"),
        }
    }
}
