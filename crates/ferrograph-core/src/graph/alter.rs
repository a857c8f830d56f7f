//! Schema changes on declared types
//!
//! A property can be appended to, dropped from or renamed in a type's
//! schema. Adding and dropping rewrite the property chain of every node and
//! relationship of the type; renaming only touches the schema-name chain,
//! which the entities' properties share.

use super::GraphStore;
use crate::storage::records::{Node, Property, PropertyType, Relationship, SchemaEntry, TypeRecord};
use crate::storage::value::PropertyValue;
use crate::storage::{Index, NULL_INDEX};
use crate::{Error, Result};
use tracing::info;

/// Entity whose property chain is being rewritten
enum Owner {
    Node(Node),
    Relation(Relationship),
}

impl Owner {
    fn index(&self) -> Index {
        match self {
            Owner::Node(node) => node.index,
            Owner::Relation(rel) => rel.index,
        }
    }

    fn prop_head(&self) -> Index {
        match self {
            Owner::Node(node) => node.prop_head,
            Owner::Relation(rel) => rel.prop_head,
        }
    }
}

impl GraphStore {
    /// Append a property to a type's schema
    ///
    /// Every existing node and relationship of the type gets the zero value
    /// of `property_type` at the end of its property chain.
    pub fn add_property(
        &mut self,
        type_name: &str,
        property: &str,
        property_type: PropertyType,
    ) -> Result<SchemaEntry> {
        let (mut record, schema) = self.get_type_data(type_name)?;
        if self.schema_position(&schema, property)?.is_some() {
            return Err(Error::PropertyAlreadyExists {
                type_name: type_name.to_string(),
                property: property.to_string(),
            });
        }
        let default = PropertyValue::default_for(property_type)?;

        let name_ref = self.schema_names.write_str(property)?;
        let entry = self.schemas.create_item(None, |index| {
            SchemaEntry::new(index, name_ref, property_type, NULL_INDEX)
        })?;
        self.schemas.write_item(&entry)?;
        match schema.last() {
            Some(last) => {
                let mut last = *last;
                last.next = entry.index;
                self.schemas.write_item(&last)?;
            }
            None => {
                record.first_schema_ref = entry.index;
                self.types.write_item(&record)?;
            }
        }

        let owners = self.owners_of(&record)?;
        for owner in &owners {
            let chain = self.property_chain(owner.prop_head())?;
            let payload = self.values.write_value(&default)?;
            let mut appended = self.properties.create_item(None, |index| {
                Property::new(index, property_type, name_ref, payload)
            })?;
            match chain.last() {
                Some(tail) => {
                    appended.prev = tail.index;
                    self.properties.write_item(&appended)?;
                    let mut tail = *tail;
                    tail.next = appended.index;
                    self.properties.write_item(&tail)?;
                }
                None => {
                    self.properties.write_item(&appended)?;
                    self.set_prop_head(owner, appended.index)?;
                }
            }
        }

        info!(
            "Added property {} ({}) to type {}: {} entities updated",
            property,
            property_type,
            type_name,
            owners.len()
        );
        Ok(entry)
    }

    /// Remove a property from a type's schema and from every entity of it
    ///
    /// Returns the number of property records deleted.
    pub fn drop_property(&mut self, type_name: &str, property: &str) -> Result<usize> {
        let (mut record, schema) = self.get_type_data(type_name)?;
        let position = self
            .schema_position(&schema, property)?
            .ok_or_else(|| Error::PropertyDoesNotExist {
                type_name: type_name.to_string(),
                property: property.to_string(),
            })?;
        let entry = schema[position];

        // Every chain is checked before anything is unlinked.
        let mut doomed = Vec::new();
        for owner in self.owners_of(&record)? {
            let chain = self.property_chain(owner.prop_head())?;
            let target = chain
                .iter()
                .position(|p| p.name_ref == entry.name_ref)
                .ok_or_else(|| {
                    Error::corruption(format!(
                        "Entity {} of type {} has no property {}",
                        owner.index(),
                        type_name,
                        property
                    ))
                })?;
            doomed.push((owner, chain, target));
        }

        for (owner, chain, target) in &doomed {
            self.unlink_property(owner, chain, *target)?;
        }

        match position.checked_sub(1).map(|before| &schema[before]) {
            Some(before) => {
                let mut before = *before;
                before.next = entry.next;
                self.schemas.write_item(&before)?;
            }
            None => {
                record.first_schema_ref = entry.next;
                self.types.write_item(&record)?;
            }
        }
        self.schema_names.delete(entry.name_ref)?;
        self.schemas.delete_item(&entry)?;

        info!(
            "Dropped property {} from type {}: {} properties deleted",
            property,
            type_name,
            doomed.len()
        );
        Ok(doomed.len())
    }

    /// Rename a property of a type
    ///
    /// The name chain is rewritten in place, so properties already stored
    /// keep pointing at it.
    pub fn rename_property(
        &mut self,
        type_name: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<SchemaEntry> {
        let (_, schema) = self.get_type_data(type_name)?;
        let position = self
            .schema_position(&schema, old_name)?
            .ok_or_else(|| Error::PropertyDoesNotExist {
                type_name: type_name.to_string(),
                property: old_name.to_string(),
            })?;
        if self.schema_position(&schema, new_name)?.is_some() {
            return Err(Error::PropertyAlreadyExists {
                type_name: type_name.to_string(),
                property: new_name.to_string(),
            });
        }

        let entry = schema[position];
        self.schema_names.update_str(entry.name_ref, new_name)?;
        info!(
            "Renamed property {} of type {} to {}",
            old_name, type_name, new_name
        );
        Ok(entry)
    }

    /// Position of the schema entry named `property`
    fn schema_position(&self, schema: &[SchemaEntry], property: &str) -> Result<Option<usize>> {
        for (position, entry) in schema.iter().enumerate() {
            if self.property_name(entry.name_ref)?.as_deref() == Some(property) {
                return Ok(Some(position));
            }
        }
        Ok(None)
    }

    /// Every node and relationship declared with `record`
    fn owners_of(&self, record: &TypeRecord) -> Result<Vec<Owner>> {
        let mut owners = Vec::new();
        for node in self.nodes.iter()? {
            let node = node?;
            if node.type_ref == record.index {
                owners.push(Owner::Node(node));
            }
        }
        for rel in self.relationships.iter()? {
            let rel = rel?;
            if rel.type_ref == record.index {
                owners.push(Owner::Relation(rel));
            }
        }
        Ok(owners)
    }

    fn set_prop_head(&mut self, owner: &Owner, head: Index) -> Result<()> {
        match owner {
            Owner::Node(node) => {
                let mut node = *node;
                node.prop_head = head;
                self.nodes.write_item(&node)
            }
            Owner::Relation(rel) => {
                let mut rel = *rel;
                rel.prop_head = head;
                self.relationships.write_item(&rel)
            }
        }
    }

    /// Cut `chain[target]` out of its chain and delete it with its value
    fn unlink_property(&mut self, owner: &Owner, chain: &[Property], target: usize) -> Result<()> {
        let property = &chain[target];
        let prev = target.checked_sub(1).map(|before| &chain[before]);
        let next = chain.get(target + 1);

        match prev {
            Some(before) => {
                let mut before = *before;
                before.next = next.map_or(NULL_INDEX, |after| after.index);
                self.properties.write_item(&before)?;
            }
            None => self.set_prop_head(owner, next.map_or(NULL_INDEX, |after| after.index))?,
        }
        if let Some(after) = next {
            let mut after = *after;
            after.prev = prev.map_or(NULL_INDEX, |before| before.index);
            self.properties.write_item(&after)?;
        }

        self.values.delete_value(property.payload)?;
        self.properties.delete_item(property)
    }
}
