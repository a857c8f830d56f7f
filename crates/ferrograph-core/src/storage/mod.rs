//! Storage layer - Fixed-width record stores, free lists and store managers
//!
//! Every entity lives in a fixed-size slot of a binary file. A record's index
//! is both its identity and its position (`offset = index * record_size`).
//! Slot 0 of every file is reserved and zeroed, so index 0 doubles as the
//! null pointer in every record field.
//!
//! # Record Sizes
//!
//! - Node: 13 bytes (flags, rel_head, prop_head, type_ref)
//! - Relationship: 33 bytes (flags/direction, 2 endpoints, type, 4 sibling pointers, prop_head)
//! - Property: 25 bytes (flags, type tag, name, prev, next, 8-byte payload)
//! - Type: 9 bytes, Schema entry: 13 bytes
//! - String block: 13 + block size, Array block: 18 + block size

pub mod id_store;
pub mod record_store;
pub mod records;
pub mod store_manager;
pub mod value;

pub use id_store::IdStore;
pub use record_store::{Record, RecordFile, RecordStore, Slot};
pub use store_manager::StoreManager;

use std::fmt;

/// Record index; also the on-disk pointer representation
pub type Index = u32;

/// Null pointer / reserved slot
pub const NULL_INDEX: Index = 0;

/// Identifies one of the record files of a graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKind {
    /// Node records
    Node,
    /// Relationship records
    Relationship,
    /// Property records
    Property,
    /// Declared types
    Type,
    /// Type-of-type (schema) entries
    TypeSchema,
    /// Name blocks of declared types
    TypeName,
    /// Name blocks of schema entries and properties
    SchemaName,
    /// String value blocks
    String,
    /// Array value blocks
    Array,
}

impl StoreKind {
    /// Every store kind, in the order stores are opened
    pub const ALL: [StoreKind; 9] = [
        StoreKind::Node,
        StoreKind::Relationship,
        StoreKind::Property,
        StoreKind::Type,
        StoreKind::TypeSchema,
        StoreKind::TypeName,
        StoreKind::SchemaName,
        StoreKind::String,
        StoreKind::Array,
    ];

    /// Short name used in logs and error messages
    pub fn name(self) -> &'static str {
        match self {
            StoreKind::Node => "node",
            StoreKind::Relationship => "relationship",
            StoreKind::Property => "property",
            StoreKind::Type => "type",
            StoreKind::TypeSchema => "type_schema",
            StoreKind::TypeName => "type_name",
            StoreKind::SchemaName => "schema_name",
            StoreKind::String => "string",
            StoreKind::Array => "array",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
