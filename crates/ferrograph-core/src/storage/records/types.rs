//! Declared types and their schema entries

use super::property::PropertyType;
use super::{in_use_flags, read_layout, write_layout};
use crate::Result;
use crate::storage::record_store::{IN_USE_FLAG, Record};
use crate::storage::{Index, StoreKind};
use bytemuck::{Pod, Zeroable};

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct TypeLayout {
    flags: u8,
    name_ref: u32,
    first_schema_ref: u32,
}

/// Declared node or relationship type (9 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeRecord {
    /// Index in the type store
    pub index: Index,
    /// Live flag
    pub in_use: bool,
    /// Name block in the type name store
    pub name_ref: Index,
    /// First schema entry
    pub first_schema_ref: Index,
}

impl TypeRecord {
    /// Encoded size in bytes
    pub const SIZE: usize = std::mem::size_of::<TypeLayout>();

    /// Live type
    pub fn new(index: Index, name_ref: Index, first_schema_ref: Index) -> Self {
        Self {
            index,
            in_use: true,
            name_ref,
            first_schema_ref,
        }
    }
}

impl Record for TypeRecord {
    const KIND: StoreKind = StoreKind::Type;

    fn index(&self) -> Index {
        self.index
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        let layout = TypeLayout {
            flags: in_use_flags(self.in_use),
            name_ref: self.name_ref,
            first_schema_ref: self.first_schema_ref,
        };
        write_layout(Self::KIND, &layout, buf)
    }

    fn decode(index: Index, bytes: &[u8]) -> Result<Self> {
        let layout: TypeLayout = read_layout(Self::KIND, bytes)?;
        Ok(Self {
            index,
            in_use: layout.flags & IN_USE_FLAG != 0,
            name_ref: layout.name_ref,
            first_schema_ref: layout.first_schema_ref,
        })
    }
}

#[repr(C, packed)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct SchemaLayout {
    flags: u8,
    name_ref: u32,
    type_tag: u32,
    next: u32,
}

/// One declared property of a type (type-of-type record, 13 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaEntry {
    /// Index in the schema store
    pub index: Index,
    /// Live flag
    pub in_use: bool,
    /// Name block in the schema name store
    pub name_ref: Index,
    /// Declared value type
    pub property_type: PropertyType,
    /// Next declared property
    pub next: Index,
}

impl SchemaEntry {
    /// Encoded size in bytes
    pub const SIZE: usize = std::mem::size_of::<SchemaLayout>();

    /// Live schema entry
    pub fn new(index: Index, name_ref: Index, property_type: PropertyType, next: Index) -> Self {
        Self {
            index,
            in_use: true,
            name_ref,
            property_type,
            next,
        }
    }
}

impl Record for SchemaEntry {
    const KIND: StoreKind = StoreKind::TypeSchema;

    fn index(&self) -> Index {
        self.index
    }

    fn in_use(&self) -> bool {
        self.in_use
    }

    fn encode(&self, buf: &mut [u8]) -> Result<()> {
        let layout = SchemaLayout {
            flags: in_use_flags(self.in_use),
            name_ref: self.name_ref,
            type_tag: self.property_type.tag(),
            next: self.next,
        };
        write_layout(Self::KIND, &layout, buf)
    }

    fn decode(index: Index, bytes: &[u8]) -> Result<Self> {
        let layout: SchemaLayout = read_layout(Self::KIND, bytes)?;
        Ok(Self {
            index,
            in_use: layout.flags & IN_USE_FLAG != 0,
            name_ref: layout.name_ref,
            property_type: PropertyType::from_tag(layout.type_tag)?,
            next: layout.next,
        })
    }
}
