//! Response accumulator
//!
//! Every entry of a response is a handle and the offset of its value within one contiguous
//! storage buffer. The length of an entry is never stored, it is the distance to the offset of the
//! next entry (or to the end of the storage for the last entry).
//!
//! ```
//! # use bt_exchange_att::Response;
//! let mut response = Response::new();
//!
//! response.add(0x0003, &[0xAA]);
//! response.add(0x0005, &[0xBB, 0xCC]);
//!
//! response.reset();
//!
//! assert!(response.advance());
//! assert_eq!(Some(0x0003), response.handle());
//! assert_eq!(1, response.length());
//!
//! assert!(response.advance());
//! assert_eq!(&[0xBB, 0xCC], response.data());
//!
//! assert!(!response.advance());
//! ```

use crate::pdu::ErrorCode;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Response {
    entries: Vec<(u16, usize)>,
    storage: Vec<u8>,
    /// One past the current entry, zero is before the first entry
    cursor: usize,
    error: Option<ErrorCode>,
    mtu: Option<u16>,
}

impl Response {
    pub fn new() -> Self {
        Response::default()
    }

    /// Remove every entry and the recorded outcome
    pub fn clear(&mut self) {
        self.entries.clear();
        self.storage.clear();
        self.cursor = 0;
        self.error = None;
        self.mtu = None;
    }

    /// Add an entry
    pub fn add(&mut self, handle: u16, value: &[u8]) {
        self.entries.push((handle, self.storage.len()));
        self.storage.extend_from_slice(value);
    }

    /// Append to the value of the last entry
    ///
    /// An entry for `handle` is added if there are no entries.
    pub fn extend(&mut self, handle: u16, value: &[u8]) {
        if self.entries.is_empty() {
            self.add(handle, value)
        } else {
            self.storage.extend_from_slice(value)
        }
    }

    /// Move the iteration cursor before the first entry
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// Move to the next entry
    ///
    /// `false` is returned once there are no more entries.
    pub fn advance(&mut self) -> bool {
        if self.cursor < self.entries.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn current(&self) -> Option<usize> {
        self.cursor.checked_sub(1).filter(|index| *index < self.entries.len())
    }

    fn span(&self, index: usize) -> (usize, usize) {
        let start = self.entries[index].1;

        let end = self
            .entries
            .get(index + 1)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.storage.len());

        (start, end)
    }

    /// The handle of the current entry
    pub fn handle(&self) -> Option<u16> {
        self.current().map(|index| self.entries[index].0)
    }

    /// The offset of the current entry's value within the storage
    pub fn offset(&self) -> usize {
        self.current().map(|index| self.entries[index].1).unwrap_or_default()
    }

    /// The length of the current entry's value
    pub fn length(&self) -> usize {
        self.current()
            .map(|index| {
                let (start, end) = self.span(index);

                end - start
            })
            .unwrap_or_default()
    }

    /// The value of the current entry
    pub fn data(&self) -> &[u8] {
        match self.current() {
            Some(index) => {
                let (start, end) = self.span(index);

                &self.storage[start..end]
            }
            None => &[],
        }
    }

    /// Iterate over the entries without moving the cursor
    pub fn iter(&self) -> impl Iterator<Item = (u16, &[u8])> + '_ {
        (0..self.entries.len()).map(move |index| {
            let (start, end) = self.span(index);

            (self.entries[index].0, &self.storage[start..end])
        })
    }

    /// The number of entries
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The values of every entry
    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    /// The error of an error response
    pub fn error(&self) -> Option<ErrorCode> {
        self.error
    }

    pub(crate) fn set_error(&mut self, error: ErrorCode) {
        self.error = Some(error);
    }

    /// The MTU of an exchange MTU response
    pub fn mtu(&self) -> Option<u16> {
        self.mtu
    }

    pub(crate) fn set_mtu(&mut self, mtu: u16) {
        self.mtu = Some(mtu);
    }
}
