//! Relationship records
//!
//! A relationship sits in two doubly-linked lists at once: the incidence list
//! of its first node (`first_prev`/`first_next`) and that of its second node
//! (`second_prev`/`second_next`).

use super::{read_layout, write_layout};
use crate::storage::record_store::{IN_USE_FLAG, Record};
use crate::storage::{Index, NULL_INDEX, StoreKind};
use crate::{Error, Result};
use bytemuck::{Pod, Zeroable};

const DIRECTION_SHIFT: u8 = 1;
const DIRECTION_MASK: u8 = 0b110;

/// Direction of a relationship between its two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    /// No direction recorded
    #[default]
    Undefined = 0,
    /// second node -> first node
    Left = 1,
    /// first node -> second node
    Right = 2,
}

impl Direction {
    fn from_bits(bits: u8) -> Result<Self> {
        match bits {
            0 => Ok(Direction::Undefined),
            1 => Ok(Direction::Left),
            2 => Ok(Direction::Right),
            other => Err(Error::corruption(format!("Unknown relationship direction {other}"))),
        }
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RelationshipLayout {
    flags: u8,
    first_node: u32,
    second_node: u32,
    type_ref: u32,
    first_prev: u32,
    first_next: u32,
    second_prev: u32,
    second_next: u32,
    prop_head: u32,
}

/// Relationship record (33 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relationship {
    /// Index in the relationship store
    pub index: Index,
    /// Live flag
    pub in_use: bool,
    /// Direction between the two nodes
    pub direction: Direction,
    /// First endpoint
    pub first_node: Index,
    /// Second endpoint
    pub second_node: Index,
    /// Declared type
    pub type_ref: Index,
    /// Previous relationship of the first node
    pub first_prev: Index,
    /// Next relationship of the first node
    pub first_next: Index,
    /// Previous relationship of the second node
    pub second_prev: Index,
    /// Next relationship of the second node
    pub second_next: Index,
    /// First property of the relationship
    pub prop_head: Index,
}

impl Relationship {
    /// Encoded size in bytes
    pub const SIZE: usize = std::mem::size_of::<RelationshipLayout>();

    /// Live, unlinked relationship between two nodes
    pub fn new(
        index: Index,
        direction: Direction,
        first_node: Index,
        second_node: Index,
        type_ref: Index,
    ) -> Self {
        Self {
            index,
            in_use: true,
            direction,
            first_node,
            second_node,
            type_ref,
            first_prev: NULL_INDEX,
            first_next: NULL_INDEX,
            second_prev: NULL_INDEX,
            second_next: NULL_INDEX,
            prop_head: NULL_INDEX,
        }
    }

    /// Whether both endpoints are the same node
    pub fn is_self_loop(&self) -> bool {
        self.first_node == self.second_node
    }

    /// The endpoint opposite `node`, if `node` is an endpoint
    pub fn other_node(&self, node: Index) -> Option<Index> {
        if node == self.first_node {
            Some(self.second_node)
        } else if node == self.second_node {
            Some(self.first_node)
        } else {
            None
        }
    }

    /// Next relationship in `node`'s incidence list
    ///
    /// Self-loops are threaded through the first-node pointers only.
    pub fn next_for(&self, node: Index) -> Option<Index> {
        if node == self.first_node {
            Some(self.first_next)
        } else if node == self.second_node {
            Some(self.second_next)
        } else {
            None
        }
    }

    /// Previous relationship in `node`'s incidence list
    pub fn prev_for(&self, node: Index) -> Option<Index> {
        if node == self.first_node {
            Some(self.first_prev)
        } else if node == self.second_node {
            Some(self.second_prev)
        } else {
            None
        }
    }

    /// Rewire the next pointer of `node`'s incidence list; false if `node`
    /// is not an endpoint
    pub fn set_next_for(&mut self, node: Index, next: Index) -> bool {
        if node == self.first_node {
            self.first_next = next;
        } else if node == self.second_node {
            self.second_next = next;
        } else {
            return false;
        }
        true
    }

    /// Rewire the previous pointer of `node`'s incidence list; false if
    /// `node` is not an endpoint
    pub fn set_prev_for(&mut self, node: Index, prev: Index) -> bool {
        if node == self.first_node {
            self.first_prev = prev;
        } else if node == self.second_node {
            self.second_prev = prev;
        } else {
            return false;
        }
        true
    }
}

impl Record for Relationship {
    const KIND: StoreKind = StoreKind::Relationship;

    fn index(&self) -> Index {
        self.index
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        let mut flags = (self.direction as u8) << DIRECTION_SHIFT;
        if self.in_use {
            flags |= IN_USE_FLAG;
        }

        let layout = RelationshipLayout {
            flags,
            first_node: self.first_node,
            second_node: self.second_node,
            type_ref: self.type_ref,
            first_prev: self.first_prev,
            first_next: self.first_next,
            second_prev: self.second_prev,
            second_next: self.second_next,
            prop_head: self.prop_head,
        };
        write_layout(Self::KIND, &layout, buf)
    }

    fn decode(index: Index, bytes: &[u8]) -> Result<Self> {
        let layout: RelationshipLayout = read_layout(Self::KIND, bytes)?;
        let flags = layout.flags;
        Ok(Self {
            index,
            in_use: flags & IN_USE_FLAG != 0,
            direction: Direction::from_bits((flags & DIRECTION_MASK) >> DIRECTION_SHIFT)?,
            first_node: layout.first_node,
            second_node: layout.second_node,
            type_ref: layout.type_ref,
            first_prev: layout.first_prev,
            first_next: layout.first_next,
            second_prev: layout.second_prev,
            second_next: layout.second_next,
            prop_head: layout.prop_head,
        })
    }
}
