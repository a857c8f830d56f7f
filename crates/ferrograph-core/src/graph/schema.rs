//! Declared types and their schema chains

use super::GraphStore;
use crate::storage::records::{PropertyType, SchemaEntry, TypeRecord};
use crate::storage::{Index, NULL_INDEX};
use crate::{Error, Result};
use std::collections::HashSet;
use tracing::{debug, info, warn};

impl GraphStore {
    /// Declare a type with an ordered list of `(property name, type)` pairs
    pub fn create_type(
        &mut self,
        name: &str,
        schema: &[(&str, PropertyType)],
    ) -> Result<TypeRecord> {
        if self.find_type(name)?.is_some() {
            return Err(Error::TypeAlreadyExists(name.to_string()));
        }

        let mut seen = HashSet::new();
        for (property, property_type) in schema {
            if *property_type == PropertyType::Undefined {
                return Err(Error::type_mismatch(
                    "a defined property type",
                    format!("{property}: {property_type}"),
                ));
            }
            if !seen.insert(*property) {
                return Err(Error::PropertyAlreadyExists {
                    type_name: name.to_string(),
                    property: property.to_string(),
                });
            }
        }

        // Built back to front so the chain reads in declaration order.
        let mut next = NULL_INDEX;
        for (property, property_type) in schema.iter().rev() {
            let name_ref = self.schema_names.write_str(property)?;
            let entry = self.schemas.create_item(None, |index| {
                SchemaEntry::new(index, name_ref, *property_type, next)
            })?;
            self.schemas.write_item(&entry)?;
            next = entry.index;
        }

        let name_ref = self.type_names.write_str(name)?;
        let record = self
            .types
            .create_item(None, |index| TypeRecord::new(index, name_ref, next))?;
        self.types.write_item(&record)?;

        info!(
            "Created type {} ({}) with {} properties",
            name,
            record.index,
            schema.len()
        );
        Ok(record)
    }

    /// Type record declared under `name`
    pub fn find_type(&self, name: &str) -> Result<Option<TypeRecord>> {
        let Some(name_ref) = self.type_names.find(name.as_bytes())? else {
            return Ok(None);
        };
        for record in self.types.iter()? {
            let record = record?;
            if record.name_ref == name_ref {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }

    /// Type record and schema entries, in declaration order
    pub fn get_type_data(&self, name: &str) -> Result<(TypeRecord, Vec<SchemaEntry>)> {
        let record = self
            .find_type(name)?
            .ok_or_else(|| Error::TypeDoesNotExist(name.to_string()))?;
        let schema = self.schema_of(&record)?;
        Ok((record, schema))
    }

    /// Name of the type at `type_ref`
    pub fn type_name(&self, type_ref: Index) -> Result<Option<String>> {
        let Some(record) = self.types.get_item(type_ref)? else {
            return Ok(None);
        };
        self.type_names.read_str(record.name_ref)
    }

    /// Name a schema entry or property refers to
    pub fn property_name(&self, name_ref: Index) -> Result<Option<String>> {
        self.schema_names.read_str(name_ref)
    }

    /// Remove a type along with every node and relationship declared with it
    pub fn delete_type(&mut self, name: &str) -> Result<()> {
        let (record, schema) = self.get_type_data(name)?;

        let relations = self
            .relationships
            .iter()?
            .filter(|rel| rel.as_ref().map_or(true, |rel| rel.type_ref == record.index))
            .collect::<Result<Vec<_>>>()?;
        for rel in &relations {
            // An earlier delete may already have unlinked it.
            if let Some(rel) = self.relationships.get_item(rel.index)? {
                self.delete_relation(&rel)?;
            }
        }

        let nodes = self
            .nodes
            .iter()?
            .filter(|node| node.as_ref().map_or(true, |node| node.type_ref == record.index))
            .collect::<Result<Vec<_>>>()?;
        for node in &nodes {
            self.delete_node(node)?;
        }

        for entry in &schema {
            if !self.schema_names.delete(entry.name_ref)? {
                warn!("Schema name {} of type {} was already broken", entry.name_ref, name);
            }
            self.schemas.delete_item(entry)?;
        }
        self.type_names.delete(record.name_ref)?;
        self.types.delete_item(&record)?;

        info!(
            "Deleted type {}: {} nodes, {} relationships",
            name,
            nodes.len(),
            relations.len()
        );
        Ok(())
    }

    /// Schema chain of a type record
    pub(crate) fn schema_of(&self, record: &TypeRecord) -> Result<Vec<SchemaEntry>> {
        let mut entries = Vec::new();
        let mut index = record.first_schema_ref;
        while index != NULL_INDEX {
            let entry = self.schemas.get_item(index)?.ok_or_else(|| {
                Error::corruption(format!(
                    "Schema chain of type {} points at free entry {}",
                    record.index, index
                ))
            })?;
            index = entry.next;
            entries.push(entry);
            if entries.len() > self.schemas.count()? as usize {
                return Err(Error::corruption(format!(
                    "Schema chain of type {} loops",
                    record.index
                )));
            }
        }
        debug!("Type {} has {} schema entries", record.index, entries.len());
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::tests::create_test_graph;
    use crate::storage::records::PropertyType;
    use crate::storage::{NULL_INDEX, StoreKind};
    use crate::Error;

    #[test]
    fn test_schema_keeps_declaration_order() {
        let (mut graph, _dir) = create_test_graph();
        let schema = [
            ("name", PropertyType::String),
            ("age", PropertyType::Int),
            ("tags", PropertyType::StringArray),
        ];
        let record = graph.create_type("Person", &schema).unwrap();

        let (found, entries) = graph.get_type_data("Person").unwrap();
        assert_eq!(found, record);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].index, record.first_schema_ref);
        for (entry, (name, ty)) in entries.iter().zip(schema) {
            assert_eq!(entry.property_type, ty);
            assert_eq!(graph.property_name(entry.name_ref).unwrap().as_deref(), Some(name));
        }
        assert_eq!(entries[2].next, NULL_INDEX);
        assert_eq!(graph.type_name(record.index).unwrap().as_deref(), Some("Person"));
    }

    #[test]
    fn test_empty_schema() {
        let (mut graph, _dir) = create_test_graph();
        let record = graph.create_type("Marker", &[]).unwrap();
        assert_eq!(record.first_schema_ref, NULL_INDEX);
        assert!(graph.get_type_data("Marker").unwrap().1.is_empty());
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let (mut graph, _dir) = create_test_graph();
        graph.create_type("Person", &[("age", PropertyType::Int)]).unwrap();
        assert!(matches!(
            graph.create_type("Person", &[]),
            Err(Error::TypeAlreadyExists(name)) if name == "Person"
        ));
        assert_eq!(graph.store_count(StoreKind::Type).unwrap(), 1);
    }

    #[test]
    fn test_invalid_schema_rejected() {
        let (mut graph, _dir) = create_test_graph();
        assert!(graph
            .create_type("A", &[("x", PropertyType::Undefined)])
            .is_err());
        assert!(graph
            .create_type("B", &[("x", PropertyType::Int), ("x", PropertyType::Long)])
            .is_err());
        assert!(graph.find_type("A").unwrap().is_none());
        assert!(graph.find_type("B").unwrap().is_none());
    }

    #[test]
    fn test_unknown_type() {
        let (mut graph, _dir) = create_test_graph();
        assert!(matches!(
            graph.get_type_data("Ghost"),
            Err(Error::TypeDoesNotExist(_))
        ));
        assert!(matches!(
            graph.delete_type("Ghost"),
            Err(Error::TypeDoesNotExist(_))
        ));
    }

    #[test]
    fn test_delete_type_frees_schema_and_names() {
        let (mut graph, _dir) = create_test_graph();
        graph
            .create_type("Person", &[("a long property name", PropertyType::Int)])
            .unwrap();
        graph.create_type("City", &[("name", PropertyType::String)]).unwrap();

        graph.delete_type("Person").unwrap();
        assert!(graph.find_type("Person").unwrap().is_none());
        assert!(graph.find_type("City").unwrap().is_some());

        let (_, schema) = graph.get_type_data("City").unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(graph.schemas.iter().unwrap().count(), 1);
        assert_eq!(graph.types.iter().unwrap().count(), 1);
    }
}
