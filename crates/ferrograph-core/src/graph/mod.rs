//! Graph store - entity-level facade over the record stores
//!
//! `GraphStore` owns every store of a graph directory:
//! - nodes, relationships and properties
//! - declared types and their schema entries, with two name stores
//! - the dynamic value store (strings and arrays)
//!
//! and keeps the links between them (property chains, relationship
//! incidence lists, schema chains) consistent on every mutation.
//!
//! # Example
//!
//! ```no_run
//! use ferrograph_core::{GraphStore, PropertyType, PropertyValue, StoreConfig};
//!
//! # fn main() -> ferrograph_core::Result<()> {
//! let mut graph = GraphStore::open(StoreConfig::new("./data"))?;
//! graph.create_type("City", &[("name", PropertyType::String)])?;
//! graph.create_type("ROAD", &[("km", PropertyType::Int)])?;
//!
//! let (a, _) = graph.insert_node("City", &[PropertyValue::String("Lyon".into())])?;
//! let (b, _) = graph.insert_node("City", &[PropertyValue::String("Nice".into())])?;
//! graph.insert_relation("ROAD", &[PropertyValue::Int(470)], a.index, b.index)?;
//!
//! for rel in graph.relations_of(a.index)? {
//!     println!("{:?}", rel?);
//! }
//! # Ok(())
//! # }
//! ```

mod alter;
mod entities;
mod iter;
mod properties;
mod schema;

pub use iter::{NodesOfType, RelationsOf, RelationsOfType};

use crate::config::{self, StoreConfig};
use crate::defrag::{DefragReport, Defragmenter, referrers_of};
use crate::dynamic::{ArrayStore, StringStore, ValueStore};
use crate::storage::record_store::RecordFile;
use crate::storage::records::{Node, Property, Relationship, SchemaEntry, TypeRecord};
use crate::storage::{IdStore, Index, StoreKind, StoreManager};
use crate::Result;
use tracing::info;

/// A graph directory opened for reading and writing
#[derive(Debug)]
pub struct GraphStore {
    config: StoreConfig,
    nodes: StoreManager<Node>,
    relationships: StoreManager<Relationship>,
    properties: StoreManager<Property>,
    types: StoreManager<TypeRecord>,
    schemas: StoreManager<SchemaEntry>,
    type_names: StringStore,
    schema_names: StringStore,
    values: ValueStore,
}

impl GraphStore {
    /// Open (or create) every store under `config.data_dir`
    pub fn open(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        std::fs::create_dir_all(&config.data_dir)?;
        let path = |name: &str| config.store_path(name);

        let store = Self {
            nodes: StoreManager::open(path(config::NODE_STORE_FILE), Node::SIZE)?,
            relationships: StoreManager::open(
                path(config::RELATIONSHIP_STORE_FILE),
                Relationship::SIZE,
            )?,
            properties: StoreManager::open(path(config::PROPERTY_STORE_FILE), Property::SIZE)?,
            types: StoreManager::open(path(config::TYPE_STORE_FILE), TypeRecord::SIZE)?,
            schemas: StoreManager::open(path(config::SCHEMA_STORE_FILE), SchemaEntry::SIZE)?,
            type_names: StringStore::open(
                path(config::TYPE_NAME_STORE_FILE),
                config.name_block_size,
                StoreKind::TypeName,
            )?,
            schema_names: StringStore::open(
                path(config::SCHEMA_NAME_STORE_FILE),
                config.name_block_size,
                StoreKind::SchemaName,
            )?,
            values: ValueStore::new(
                StringStore::open(
                    path(config::STRING_STORE_FILE),
                    config.string_block_size,
                    StoreKind::String,
                )?,
                ArrayStore::open(path(config::ARRAY_STORE_FILE), config.array_block_size)?,
            ),
            config,
        };

        info!(
            "Opened graph store at {:?}: {} nodes, {} relationships, {} properties",
            store.config.data_dir,
            store.nodes.count()?,
            store.relationships.count()?,
            store.properties.count()?
        );
        Ok(store)
    }

    /// Configuration the store was opened with
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Number of addressable slots in one store (live and deleted)
    pub fn store_count(&self, kind: StoreKind) -> Result<Index> {
        match kind {
            StoreKind::Node => self.nodes.count(),
            StoreKind::Relationship => self.relationships.count(),
            StoreKind::Property => self.properties.count(),
            StoreKind::Type => self.types.count(),
            StoreKind::TypeSchema => self.schemas.count(),
            StoreKind::TypeName => self.type_names.manager().count(),
            StoreKind::SchemaName => self.schema_names.manager().count(),
            StoreKind::String => self.values.strings.manager().count(),
            StoreKind::Array => self.values.arrays.manager().count(),
        }
    }

    /// Dynamic value store
    pub fn values(&self) -> &ValueStore {
        &self.values
    }

    /// Compact one store and rewrite every pointer into it
    pub fn defragment(&mut self, kind: StoreKind) -> Result<DefragReport> {
        let Self {
            nodes,
            relationships,
            properties,
            types,
            schemas,
            type_names,
            schema_names,
            values,
            ..
        } = self;

        let parts: [(&mut RecordFile, &mut IdStore); 9] = [
            nodes.parts_mut(),
            relationships.parts_mut(),
            properties.parts_mut(),
            types.parts_mut(),
            schemas.parts_mut(),
            type_names.manager_mut().parts_mut(),
            schema_names.manager_mut().parts_mut(),
            values.strings.manager_mut().parts_mut(),
            values.arrays.manager_mut().parts_mut(),
        ];

        let referrers = referrers_of(kind);
        let mut target = None;
        let mut referring = Vec::new();
        for (file, ids) in parts {
            let part_kind = file.kind();
            if part_kind == kind {
                target = Some((file, ids));
            } else if referrers.contains(&part_kind) {
                referring.push(file);
            }
        }

        let (file, ids) = target.ok_or_else(|| {
            crate::Error::storage(format!("Graph store has no {kind} store"))
        })?;
        Defragmenter::new(file, ids, referring).defragment()
    }

    /// Compact every store
    pub fn defragment_all(&mut self) -> Result<Vec<(StoreKind, DefragReport)>> {
        StoreKind::ALL
            .into_iter()
            .map(|kind| Ok((kind, self.defragment(kind)?)))
            .collect()
    }

    /// Flush every store and free list to disk
    pub fn sync(&self) -> Result<()> {
        self.nodes.sync()?;
        self.relationships.sync()?;
        self.properties.sync()?;
        self.types.sync()?;
        self.schemas.sync()?;
        self.type_names.sync()?;
        self.schema_names.sync()?;
        self.values.sync()
    }
}
