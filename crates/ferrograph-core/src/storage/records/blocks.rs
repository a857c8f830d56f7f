//! Dynamic store blocks
//!
//! Strings and arrays are stored as doubly-linked chains of fixed-size blocks.
//! The header is followed by `block_size` payload bytes; the slot size of the
//! store is `HEADER_SIZE + block_size`.

use super::property::PropertyType;
use super::{in_use_flags, read_layout, write_layout};
use crate::storage::record_store::{IN_USE_FLAG, Record};
use crate::storage::{Index, NULL_INDEX, StoreKind};
use crate::{Error, Result};
use bytemuck::{Pod, Zeroable};

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct StringBlockHeader {
    flags: u8,
    prev: u32,
    length: u32,
    next: u32,
}

/// One segment of a string (or name) chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringBlock {
    /// Index in its store
    pub index: Index,
    /// Live flag
    pub in_use: bool,
    /// Previous block; 0 for the head of a chain
    pub prev: Index,
    /// Next block; 0 for the tail of a chain
    pub next: Index,
    /// Payload bytes held by this block
    pub data: Vec<u8>,
}

impl StringBlock {
    /// Header size in bytes
    pub const HEADER_SIZE: usize = std::mem::size_of::<StringBlockHeader>();

    /// Slot size of a store with `block_size` payload bytes per block
    pub fn record_size(block_size: usize) -> usize {
        Self::HEADER_SIZE + block_size
    }

    /// Live block
    pub fn new(index: Index, prev: Index, next: Index, data: Vec<u8>) -> Self {
        Self {
            index,
            in_use: true,
            prev,
            next,
            data,
        }
    }

    /// Whether this block starts a chain
    pub fn is_head(&self) -> bool {
        self.prev == NULL_INDEX
    }
}

impl Record for StringBlock {
    const KIND: StoreKind = StoreKind::String;

    fn index(&self) -> Index {
        self.index
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        let capacity = buf.len().saturating_sub(Self::HEADER_SIZE);
        if self.data.len() > capacity {
            return Err(Error::storage(format!(
                "String block holds {} bytes, got {}",
                capacity,
                self.data.len()
            )));
        }

        let header = StringBlockHeader {
            flags: in_use_flags(self.in_use),
            prev: self.prev,
            length: self.data.len() as u32,
            next: self.next,
        };
        write_layout(Self::KIND, &header, buf)?;
        buf[Self::HEADER_SIZE..Self::HEADER_SIZE + self.data.len()].copy_from_slice(&self.data);
        Ok(())
    }

    fn decode(index: Index, bytes: &[u8]) -> Result<Self> {
        let header: StringBlockHeader = read_layout(Self::KIND, bytes)?;
        let length = header.length as usize;
        let payload = &bytes[Self::HEADER_SIZE..];
        if length > payload.len() {
            return Err(Error::corruption(format!(
                "String block {index}: length {length} exceeds block size {}",
                payload.len()
            )));
        }

        Ok(Self {
            index,
            in_use: header.flags & IN_USE_FLAG != 0,
            prev: header.prev,
            next: header.next,
            data: payload[..length].to_vec(),
        })
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct ArrayBlockHeader {
    flags: u8,
    element_type: u8,
    prev: u32,
    amount: u32,
    total_blocks: u32,
    next: u32,
}

/// One segment of an array chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayBlock {
    /// Index in the array store
    pub index: Index,
    /// Live flag
    pub in_use: bool,
    /// Element type (a primitive or `String`)
    pub element_type: PropertyType,
    /// Previous block; 0 for the head of a chain
    pub prev: Index,
    /// Elements held by this block
    pub amount: u32,
    /// Number of blocks in the whole chain
    pub total_blocks: u32,
    /// Next block; 0 for the tail of a chain
    pub next: Index,
    /// Encoded elements, `amount * element_size` bytes
    pub data: Vec<u8>,
}

impl ArrayBlock {
    /// Header size in bytes
    pub const HEADER_SIZE: usize = std::mem::size_of::<ArrayBlockHeader>();

    /// Slot size of a store with `block_size` payload bytes per block
    pub fn record_size(block_size: usize) -> usize {
        Self::HEADER_SIZE + block_size
    }

    /// Elements of `element_type` that fit in one block
    pub fn capacity(block_size: usize, element_type: PropertyType) -> usize {
        element_type
            .element_size()
            .map_or(0, |width| block_size / width)
    }

    /// Whether this block starts a chain
    pub fn is_head(&self) -> bool {
        self.prev == NULL_INDEX
    }

    fn element_size(&self) -> usize {
        self.element_type.element_size().unwrap_or(0)
    }
}

impl Record for ArrayBlock {
    const KIND: StoreKind = StoreKind::Array;

    fn index(&self) -> Index {
        self.index
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        let expected = self.amount as usize * self.element_size();
        if self.data.len() != expected {
            return Err(Error::storage(format!(
                "Array block with {} {} elements needs {} bytes, got {}",
                self.amount,
                self.element_type,
                expected,
                self.data.len()
            )));
        }
        let capacity = buf.len().saturating_sub(Self::HEADER_SIZE);
        if self.data.len() > capacity {
            return Err(Error::storage(format!(
                "Array block holds {} bytes, got {}",
                capacity,
                self.data.len()
            )));
        }

        let header = ArrayBlockHeader {
            flags: in_use_flags(self.in_use),
            element_type: self.element_type.tag() as u8,
            prev: self.prev,
            amount: self.amount,
            total_blocks: self.total_blocks,
            next: self.next,
        };
        write_layout(Self::KIND, &header, buf)?;
        buf[Self::HEADER_SIZE..Self::HEADER_SIZE + self.data.len()].copy_from_slice(&self.data);
        Ok(())
    }

    fn decode(index: Index, bytes: &[u8]) -> Result<Self> {
        let header: ArrayBlockHeader = read_layout(Self::KIND, bytes)?;
        let element_type = PropertyType::from_tag(header.element_type as u32)?;
        if element_type.is_array() {
            return Err(Error::corruption(format!(
                "Array block {index}: nested element type {element_type}"
            )));
        }

        let amount = header.amount;
        let used = amount as usize * element_type.element_size().unwrap_or(0);
        let payload = &bytes[Self::HEADER_SIZE..];
        if used > payload.len() {
            return Err(Error::corruption(format!(
                "Array block {index}: {amount} elements exceed block size {}",
                payload.len()
            )));
        }

        Ok(Self {
            index,
            in_use: header.flags & IN_USE_FLAG != 0,
            element_type,
            prev: header.prev,
            amount,
            total_blocks: header.total_blocks,
            next: header.next,
            data: payload[..used].to_vec(),
        })
    }
}
