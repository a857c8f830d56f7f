//! Ferrograph Core - Graph Storage Engine
//!
//! This crate provides the on-disk storage core of Ferrograph:
//! - Fixed-width record stores for nodes, relationships, properties and schemas
//! - Persistent free lists (id stores) recycling deleted record indices
//! - Dynamic value stores holding strings and arrays as block chains
//! - A defragmenter that compacts a store and rewrites every pointer into it
//! - The entity facade (`GraphStore`) consumed by the command layer
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                GraphStore                    │
//! │   (types, nodes, relationships, properties)  │
//! └──────┬───────────────┬───────────────┬──────┘
//!        │               │               │
//! ┌──────┴──────┐ ┌──────┴──────┐ ┌──────┴──────┐
//! │ ValueStore  │ │Defragmenter │ │ StoreManager│
//! │(strings,    │ │ + reference │ │  (records + │
//! │ arrays)     │ │     map     │ │  id store)  │
//! └──────┬──────┘ └──────┬──────┘ └──────┬──────┘
//!        │               │               │
//! ┌──────┴───────────────┴───────────────┴──────┐
//! │     RecordFile (fixed-width slots, index 0   │
//! │     reserved as the null pointer)            │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use ferrograph_core::{GraphStore, PropertyType, PropertyValue, StoreConfig};
//!
//! # fn main() -> ferrograph_core::Result<()> {
//! let mut graph = GraphStore::open(StoreConfig::new("./data"))?;
//! graph.create_type("Person", &[("name", PropertyType::String), ("age", PropertyType::Int)])?;
//! let (node, _props) = graph.insert_node(
//!     "Person",
//!     &[PropertyValue::String("Ada".into()), PropertyValue::Int(36)],
//! )?;
//! assert!(graph.get_node(node.index)?.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod defrag;
pub mod dynamic;
pub mod error;
pub mod graph;
pub mod logging;
pub mod storage;

pub use config::StoreConfig;
pub use defrag::{DefragReport, Defragmenter};
pub use error::{Error, Result};
pub use graph::GraphStore;
pub use storage::records::{
    Direction, Node, Property, PropertyType, Relationship, SchemaEntry, TypeRecord,
};
pub use storage::value::{ArrayValue, PropertyValue};
pub use storage::{Index, NULL_INDEX, StoreKind};
