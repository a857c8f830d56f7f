//! On-disk record formats
//!
//! Fixed records are packed `#[repr(C)]` layouts read and written through
//! `bytemuck`, mirroring their byte offsets exactly. Integers use the host's
//! native byte order.

pub mod blocks;
pub mod node;
pub mod property;
pub mod relationship;
pub mod types;

pub use blocks::{ArrayBlock, StringBlock};
pub use node::Node;
pub use property::{Payload, Property, PropertyType};
pub use relationship::{Direction, Relationship};
pub use types::{SchemaEntry, TypeRecord};

use super::StoreKind;
use super::record_store::IN_USE_FLAG;
use crate::{Error, Result};
use bytemuck::Pod;

/// Decode a packed layout from the start of `bytes`
pub(crate) fn read_layout<T: Pod>(kind: StoreKind, bytes: &[u8]) -> Result<T> {
    let size = std::mem::size_of::<T>();
    if bytes.len() < size {
        return Err(Error::corruption(format!(
            "{kind} record: {} bytes, need {size}",
            bytes.len()
        )));
    }
    Ok(bytemuck::pod_read_unaligned(&bytes[..size]))
}

/// Encode a packed layout into the start of `buf`
pub(crate) fn write_layout<T: Pod>(kind: StoreKind, layout: &T, buf: &mut [u8]) -> Result<()> {
    let raw = bytemuck::bytes_of(layout);
    if buf.len() < raw.len() {
        return Err(Error::storage(format!(
            "{kind} record: slot is {} bytes, need {}",
            buf.len(),
            raw.len()
        )));
    }
    buf[..raw.len()].copy_from_slice(raw);
    Ok(())
}

pub(crate) fn in_use_flags(in_use: bool) -> u8 {
    if in_use { IN_USE_FLAG } else { 0 }
}
