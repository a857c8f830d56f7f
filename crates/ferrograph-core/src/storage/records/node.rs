//! Node records

use super::{in_use_flags, read_layout, write_layout};
use crate::Result;
use crate::storage::record_store::{IN_USE_FLAG, Record};
use crate::storage::{Index, StoreKind};
use bytemuck::{Pod, Zeroable};

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct NodeLayout {
    flags: u8,
    rel_head: u32,
    prop_head: u32,
    type_ref: u32,
}

/// Node record (13 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    /// Index in the node store
    pub index: Index,
    /// Live flag
    pub in_use: bool,
    /// First relationship in the node's incidence list
    pub rel_head: Index,
    /// First property of the node
    pub prop_head: Index,
    /// Declared type
    pub type_ref: Index,
}

impl Node {
    /// Encoded size in bytes
    pub const SIZE: usize = std::mem::size_of::<NodeLayout>();

    /// Live node
    pub fn new(index: Index, rel_head: Index, prop_head: Index, type_ref: Index) -> Self {
        Self {
            index,
            in_use: true,
            rel_head,
            prop_head,
            type_ref,
        }
    }
}

impl Record for Node {
    const KIND: StoreKind = StoreKind::Node;

    fn index(&self) -> Index {
        self.index
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        let layout = NodeLayout {
            flags: in_use_flags(self.in_use),
            rel_head: self.rel_head,
            prop_head: self.prop_head,
            type_ref: self.type_ref,
        };
        write_layout(Self::KIND, &layout, buf)
    }

    fn decode(index: Index, bytes: &[u8]) -> Result<Self> {
        let layout: NodeLayout = read_layout(Self::KIND, bytes)?;
        Ok(Self {
            index,
            in_use: layout.flags & IN_USE_FLAG != 0,
            rel_head: layout.rel_head,
            prop_head: layout.prop_head,
            type_ref: layout.type_ref,
        })
    }
}
