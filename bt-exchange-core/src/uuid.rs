//! Universally Unique Identifier
//!
//! A UUID in Bluetooth has some differences from the UUID of
//! [RFC 4122](https://datatracker.ietf.org/doc/html/rfc4122). They are still unique identifiers,
//! but to reduce the load of having to transfer 128-bits for commonly used identifiers, the
//! Bluetooth SIG mapped two ranges of shortened UUIDs onto the *Bluetooth Base UUID*. These
//! shortened UUIDs are sized at 16 and 32 bit.

use core::fmt;
use core::str::FromStr;

/// A Bluetooth UUID
///
/// The string form of a UUID that can be shortened to 16 bits is the four hex digit short form,
/// every other UUID is displayed in the hyphenated long form.
///
/// ```
/// # use bt_exchange_core::Uuid;
/// let battery = Uuid::from_u16(0x180F);
///
/// assert!(battery.can_be_16_bit());
/// assert_eq!("180f", battery.to_string());
/// assert_eq!(battery, "0000180f-0000-1000-8000-00805f9b34fb".parse().unwrap());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Uuid {
    base_uuid: u128,
}

impl Uuid {
    /// See Vol 3 part B sec 2.5.1 for where this value comes from.
    const BLUETOOTH_BASE_UUID: u128 = 0x0000000000001000800000805F9B34FB;

    pub const fn from_u16(v: u16) -> Self {
        Uuid {
            base_uuid: ((v as u128) << 96) | Self::BLUETOOTH_BASE_UUID,
        }
    }

    pub const fn from_u32(v: u32) -> Self {
        Uuid {
            base_uuid: ((v as u128) << 96) | Self::BLUETOOTH_BASE_UUID,
        }
    }

    pub const fn from_u128(v: u128) -> Self {
        Uuid { base_uuid: v }
    }

    /// Returns true if the UUID can be a 16 bit shortened UUID
    pub fn can_be_16_bit(&self) -> bool {
        !((!0u16 as u128) << 96) & self.base_uuid == Uuid::BLUETOOTH_BASE_UUID
    }

    /// Returns true if the UUID can be a 32 bit shortened UUID
    pub fn can_be_32_bit(&self) -> bool {
        !(((!0u32) as u128) << 96) & self.base_uuid == Uuid::BLUETOOTH_BASE_UUID
    }

    /// Get the 16 bit form, if the UUID can be shortened to it
    pub fn as_u16(&self) -> Option<u16> {
        self.can_be_16_bit().then(|| (self.base_uuid >> 96) as u16)
    }

    /// Get the 32 bit form, if the UUID can be shortened to it
    pub fn as_u32(&self) -> Option<u32> {
        self.can_be_32_bit().then(|| (self.base_uuid >> 96) as u32)
    }

    /// The number of bytes used for this UUID within an attribute PDU
    ///
    /// Attribute PDUs only carry 16 bit or 128 bit UUIDs.
    pub fn wire_len(&self) -> usize {
        if self.can_be_16_bit() {
            2
        } else {
            16
        }
    }

    /// Append the little endian attribute protocol form of this UUID
    pub fn write_le(&self, out: &mut Vec<u8>) {
        match self.as_u16() {
            Some(short) => out.extend_from_slice(&short.to_le_bytes()),
            None => out.extend_from_slice(&self.base_uuid.to_le_bytes()),
        }
    }

    /// Create a UUID from its little endian wire form
    ///
    /// The length of `raw` must be 2, 4, or 16 bytes.
    pub fn from_le_slice(raw: &[u8]) -> Option<Self> {
        match raw.len() {
            2 => Some(Self::from_u16(u16::from_le_bytes([raw[0], raw[1]]))),
            4 => Some(Self::from_u32(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))),
            16 => {
                let bytes: [u8; 16] = raw.try_into().ok()?;

                Some(Self::from_u128(u128::from_le_bytes(bytes)))
            }
            _ => None,
        }
    }

    /// Display format for UUID
    ///
    /// The hex format for a UUID changes based on whether or not it is a 16 bit or 32 bit
    /// shortened UUID.
    fn display_type<F1, F2, F3>(&self, f: &mut fmt::Formatter, fn_16: F1, fn_32: F2, fn_128: F3) -> fmt::Result
    where
        F1: FnOnce(&u16, &mut fmt::Formatter) -> fmt::Result,
        F2: FnOnce(&u32, &mut fmt::Formatter) -> fmt::Result,
        F3: FnOnce(&u128, &mut fmt::Formatter) -> fmt::Result,
    {
        if let Some(val) = self.as_u16() {
            fn_16(&val, f)?;

            write!(f, " (16b)")
        } else if let Some(val) = self.as_u32() {
            fn_32(&val, f)?;

            write!(f, " (32b)")
        } else {
            fn_128(&self.base_uuid, f)?;

            write!(f, " (128b)")
        }
    }
}

impl fmt::Debug for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::LowerHex::fmt(self, f)
    }
}

impl fmt::LowerHex for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.display_type(
            f,
            |v, f| fmt::LowerHex::fmt(v, f),
            |v, f| fmt::LowerHex::fmt(v, f),
            |v, f| fmt::LowerHex::fmt(v, f),
        )
    }
}

impl fmt::UpperHex for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.display_type(
            f,
            |v, f| fmt::UpperHex::fmt(v, f),
            |v, f| fmt::UpperHex::fmt(v, f),
            |v, f| fmt::UpperHex::fmt(v, f),
        )
    }
}

impl fmt::Display for Uuid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.as_u16() {
            Some(short) => write!(f, "{:04x}", short),
            None => {
                let v = self.base_uuid;

                write!(
                    f,
                    "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
                    (v >> 96) as u32,
                    (v >> 80) as u16,
                    (v >> 64) as u16,
                    (v >> 48) as u16,
                    v & 0xFFFF_FFFF_FFFF
                )
            }
        }
    }
}

impl From<u128> for Uuid {
    fn from(v: u128) -> Uuid {
        Self::from_u128(v)
    }
}

impl From<u32> for Uuid {
    fn from(v: u32) -> Uuid {
        Self::from_u32(v)
    }
}

impl From<u16> for Uuid {
    fn from(v: u16) -> Uuid {
        Self::from_u16(v)
    }
}

impl From<Uuid> for u128 {
    fn from(uuid: Uuid) -> u128 {
        uuid.base_uuid
    }
}

#[cfg(feature = "uuid-crate")]
impl From<uuid::Uuid> for Uuid {
    fn from(uuid: uuid::Uuid) -> Uuid {
        <u128>::from_be_bytes(*uuid.as_bytes()).into()
    }
}

#[cfg(feature = "uuid-crate")]
impl From<Uuid> for uuid::Uuid {
    fn from(uuid: Uuid) -> uuid::Uuid {
        uuid::Uuid::from_bytes(uuid.base_uuid.to_be_bytes())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum UuidFormatError {
    #[error("field '{0}' has an incorrect number of characters")]
    IncorrectFieldLength(String),
    #[error("incorrect length")]
    IncorrectLength,
    #[error("digits '{0}' are not hexadecimal")]
    IncorrectDigit(String),
}

/// Parse a UUID from either of its string forms
///
/// The short forms are four (16 bit) or eight (32 bit) hex digits. The long form is a 16 octet
/// UUID in the form of \[8\]-\[4\]-\[4\]-\[4\]-\[12\] where each number represents the number of
/// characters for the field, e.g. '68d82662-0305-4e6f-a679-6be1475f5e04'.
impl FromStr for Uuid {
    type Err = UuidFormatError;

    fn from_str(v: &str) -> Result<Self, Self::Err> {
        let parse_hex = |digits: &str| {
            u128::from_str_radix(digits, 16).map_err(|_| UuidFormatError::IncorrectDigit(digits.to_string()))
        };

        if !v.contains('-') {
            return match v.len() {
                4 => parse_hex(v).map(|short| Uuid::from_u16(short as u16)),
                8 => parse_hex(v).map(|short| Uuid::from_u32(short as u32)),
                _ => Err(UuidFormatError::IncorrectLength),
            };
        }

        let mut fields = v.split('-');
        let mut base_uuid = 0u128;

        for expected in [8, 4, 4, 4, 12] {
            let field = fields.next().ok_or(UuidFormatError::IncorrectLength)?;

            if field.len() != expected {
                return Err(UuidFormatError::IncorrectFieldLength(field.to_string()));
            }

            base_uuid = (base_uuid << (expected * 4)) | parse_hex(field)?;
        }

        if fields.next().is_some() {
            return Err(UuidFormatError::IncorrectLength);
        }

        Ok(Uuid { base_uuid })
    }
}

impl TryFrom<&str> for Uuid {
    type Error = UuidFormatError;

    fn try_from(v: &str) -> Result<Self, Self::Error> {
        v.parse()
    }
}
