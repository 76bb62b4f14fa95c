//! Core items of `bt-exchange`
//!
//! These are the value types and the error type shared by the exchange engine and the protocol
//! codecs built on top of it. Generally things within this lib are re-exported by the crate using
//! them.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod address;
pub mod errors;
pub mod uuid;

pub use address::{Address, AddressError, AddressType};
pub use errors::{Error, Result};
pub use uuid::{Uuid, UuidFormatError};
