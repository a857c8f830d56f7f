//! Property chains of nodes and relationships

use super::GraphStore;
use crate::dynamic::chain::links;
use crate::storage::records::{Node, Property, Relationship, SchemaEntry};
use crate::storage::value::PropertyValue;
use crate::storage::{Index, NULL_INDEX};
use crate::{Error, Result};
use tracing::{debug, warn};

impl GraphStore {
    /// Validate `values` against a schema and write them as one property chain
    pub(crate) fn write_properties(
        &mut self,
        type_name: &str,
        schema: &[SchemaEntry],
        values: &[PropertyValue],
    ) -> Result<Vec<Property>> {
        if schema.len() != values.len() {
            return Err(Error::SchemaArity {
                type_name: type_name.to_string(),
                expected: schema.len(),
                actual: values.len(),
            });
        }
        for (entry, value) in schema.iter().zip(values) {
            if entry.property_type != value.property_type() {
                return Err(Error::type_mismatch(entry.property_type, value.property_type()));
            }
        }

        let payloads = values
            .iter()
            .map(|value| self.values.write_value(value))
            .collect::<Result<Vec<_>>>()?;
        let indexes = self.properties.get_indexes(values.len())?;

        let mut chain = Vec::with_capacity(values.len());
        for (position, (entry, payload)) in schema.iter().zip(payloads).enumerate() {
            let (prev, next) = links(&indexes, position);
            let mut property =
                Property::new(indexes[position], entry.property_type, entry.name_ref, payload);
            property.prev = prev;
            property.next = next;
            self.properties.write_item(&property)?;
            chain.push(property);
        }
        Ok(chain)
    }

    /// Property chain starting at `head`, in chain order
    pub(crate) fn property_chain(&self, head: Index) -> Result<Vec<Property>> {
        let mut chain = Vec::new();
        let mut prev = NULL_INDEX;
        let mut index = head;
        while index != NULL_INDEX {
            let property = self.properties.get_item(index)?.ok_or_else(|| {
                Error::corruption(format!("Property chain at {head} points at free record {index}"))
            })?;
            if property.prev != prev {
                return Err(Error::corruption(format!(
                    "Property {} points back to {}, expected {}",
                    index, property.prev, prev
                )));
            }
            prev = index;
            index = property.next;
            chain.push(property);
        }
        Ok(chain)
    }

    /// Delete a property chain and the dynamic values it owns
    pub(crate) fn delete_properties(&mut self, head: Index) -> Result<usize> {
        let chain = self.property_chain(head)?;
        for property in &chain {
            if !self.values.delete_value(property.payload)? {
                warn!(
                    "Dynamic value of property {} was already broken",
                    property.index
                );
            }
            self.properties.delete_item(property)?;
        }
        Ok(chain.len())
    }

    /// Set the property at `position` of every node to `value`
    ///
    /// Returns the updated property records.
    pub fn update_nodes(
        &mut self,
        pairs: &[(Node, Vec<Property>)],
        position: usize,
        value: &PropertyValue,
    ) -> Result<Vec<Property>> {
        pairs
            .iter()
            .map(|(node, chain)| self.update_property(node.index, chain, position, value))
            .collect()
    }

    /// Set the property at `position` of every relationship to `value`
    pub fn update_relations(
        &mut self,
        pairs: &[(Relationship, Vec<Property>)],
        position: usize,
        value: &PropertyValue,
    ) -> Result<Vec<Property>> {
        pairs
            .iter()
            .map(|(rel, chain)| self.update_property(rel.index, chain, position, value))
            .collect()
    }

    fn update_property(
        &mut self,
        owner: Index,
        chain: &[Property],
        position: usize,
        value: &PropertyValue,
    ) -> Result<Property> {
        let stale = chain.get(position).ok_or_else(|| {
            Error::storage(format!(
                "Entity {owner} has {} properties, no position {position}",
                chain.len()
            ))
        })?;
        let mut property = self
            .properties
            .get_item(stale.index)?
            .ok_or_else(|| Error::not_found(format!("property {}", stale.index)))?;
        if property.property_type != value.property_type() {
            return Err(Error::type_mismatch(property.property_type, value.property_type()));
        }

        let payload = self.values.update_value(property.payload, value)?;
        if payload != property.payload {
            property.payload = payload;
            self.properties.write_item(&property)?;
        }
        debug!("Updated property {} of entity {}", property.index, owner);
        Ok(property)
    }

    /// Decode the property chain at `head` into `(name, value)` pairs
    fn decode_properties(&self, head: Index) -> Result<Vec<(String, PropertyValue)>> {
        self.property_chain(head)?
            .into_iter()
            .map(|property| {
                let name = self.property_name(property.name_ref)?.ok_or_else(|| {
                    Error::corruption(format!("Property {} has no name", property.index))
                })?;
                let value = self
                    .values
                    .read_value(property.property_type, property.payload)?
                    .ok_or_else(|| {
                        Error::corruption(format!("Value of property {} is broken", property.index))
                    })?;
                Ok((name, value))
            })
            .collect()
    }

    /// Named property values of a node
    pub fn node_properties(&self, node: &Node) -> Result<Vec<(String, PropertyValue)>> {
        self.decode_properties(node.prop_head)
    }

    /// Named property values of a relationship
    pub fn relation_properties(&self, rel: &Relationship) -> Result<Vec<(String, PropertyValue)>> {
        self.decode_properties(rel.prop_head)
    }
}
