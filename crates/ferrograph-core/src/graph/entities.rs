//! Node and relationship lifecycle

use super::GraphStore;
use crate::storage::records::{Direction, Node, Property, Relationship};
use crate::storage::value::PropertyValue;
use crate::storage::{Index, NULL_INDEX};
use crate::{Error, Result};
use tracing::debug;

impl GraphStore {
    /// Create a node of `type_name` with one value per declared property
    pub fn insert_node(
        &mut self,
        type_name: &str,
        values: &[PropertyValue],
    ) -> Result<(Node, Vec<Property>)> {
        let (record, schema) = self.get_type_data(type_name)?;
        let properties = self.write_properties(type_name, &schema, values)?;
        let prop_head = properties.first().map_or(NULL_INDEX, |p| p.index);

        let node = self
            .nodes
            .create_item(None, |index| Node::new(index, NULL_INDEX, prop_head, record.index))?;
        self.nodes.write_item(&node)?;

        debug!("Inserted {} node {}", type_name, node.index);
        Ok((node, properties))
    }

    /// Create a relationship `left -> right` of `type_name`
    ///
    /// The relationship becomes the head of both endpoints' incidence lists.
    pub fn insert_relation(
        &mut self,
        type_name: &str,
        values: &[PropertyValue],
        left: Index,
        right: Index,
    ) -> Result<(Relationship, Vec<Property>)> {
        let (record, schema) = self.get_type_data(type_name)?;
        let mut left_node = self.live_node(left)?;
        let mut right_node = self.live_node(right)?;

        let properties = self.write_properties(type_name, &schema, values)?;
        let mut rel = self.relationships.create_item(None, |index| {
            Relationship::new(index, Direction::Right, left, right, record.index)
        })?;
        rel.prop_head = properties.first().map_or(NULL_INDEX, |p| p.index);
        rel.first_next = left_node.rel_head;
        if !rel.is_self_loop() {
            rel.second_next = right_node.rel_head;
        }
        self.relationships.write_item(&rel)?;

        self.link_before(left, left_node.rel_head, rel.index)?;
        left_node.rel_head = rel.index;
        self.nodes.write_item(&left_node)?;
        if !rel.is_self_loop() {
            self.link_before(right, right_node.rel_head, rel.index)?;
            right_node.rel_head = rel.index;
            self.nodes.write_item(&right_node)?;
        }

        debug!(
            "Inserted {} relationship {} ({} -> {})",
            type_name, rel.index, left, right
        );
        Ok((rel, properties))
    }

    /// Point the `node` list's back pointer of `old_head` at `new_head`
    fn link_before(&mut self, node: Index, old_head: Index, new_head: Index) -> Result<()> {
        if old_head == NULL_INDEX {
            return Ok(());
        }
        let mut neighbour = self.live_relation(old_head)?;
        if !neighbour.set_prev_for(node, new_head) {
            return Err(foreign_relation(old_head, node));
        }
        self.relationships.write_item(&neighbour)
    }

    /// Live node with its property chain
    pub fn get_node(&self, index: Index) -> Result<Option<(Node, Vec<Property>)>> {
        match self.nodes.get_item(index)? {
            Some(node) => Ok(Some((node, self.property_chain(node.prop_head)?))),
            None => Ok(None),
        }
    }

    /// Live relationship with its property chain
    pub fn get_relation(&self, index: Index) -> Result<Option<(Relationship, Vec<Property>)>> {
        match self.relationships.get_item(index)? {
            Some(rel) => Ok(Some((rel, self.property_chain(rel.prop_head)?))),
            None => Ok(None),
        }
    }

    /// Unlink a relationship from both endpoints and delete it with its
    /// properties
    pub fn delete_relation(&mut self, rel: &Relationship) -> Result<()> {
        let rel = self.live_relation(rel.index)?;
        let mut endpoints = vec![rel.first_node];
        if !rel.is_self_loop() {
            endpoints.push(rel.second_node);
        }

        for node in endpoints {
            let prev = rel.prev_for(node).unwrap_or(NULL_INDEX);
            let next = rel.next_for(node).unwrap_or(NULL_INDEX);

            if prev == NULL_INDEX {
                let mut owner = self.live_node(node)?;
                owner.rel_head = next;
                self.nodes.write_item(&owner)?;
            } else {
                let mut before = self.live_relation(prev)?;
                if !before.set_next_for(node, next) {
                    return Err(foreign_relation(prev, node));
                }
                self.relationships.write_item(&before)?;
            }

            if next != NULL_INDEX {
                let mut after = self.live_relation(next)?;
                if !after.set_prev_for(node, prev) {
                    return Err(foreign_relation(next, node));
                }
                self.relationships.write_item(&after)?;
            }
        }

        self.delete_properties(rel.prop_head)?;
        self.relationships.delete_item(&rel)?;
        debug!("Deleted relationship {}", rel.index);
        Ok(())
    }

    /// Delete a node, every relationship incident to it and its properties
    pub fn delete_node(&mut self, node: &Node) -> Result<()> {
        let mut current = self.live_node(node.index)?;
        let mut removed = 0usize;
        while current.rel_head != NULL_INDEX {
            let rel = self.live_relation(current.rel_head)?;
            self.delete_relation(&rel)?;
            removed += 1;
            current = self.live_node(node.index)?;
        }

        self.delete_properties(current.prop_head)?;
        self.nodes.delete_item(&current)?;
        debug!(
            "Deleted node {} with {} relationships",
            current.index, removed
        );
        Ok(())
    }

    fn live_node(&self, index: Index) -> Result<Node> {
        self.nodes
            .get_item(index)?
            .ok_or_else(|| Error::not_found(format!("node {index}")))
    }

    fn live_relation(&self, index: Index) -> Result<Relationship> {
        self.relationships
            .get_item(index)?
            .ok_or_else(|| Error::not_found(format!("relationship {index}")))
    }
}

fn foreign_relation(rel: Index, node: Index) -> Error {
    Error::corruption(format!(
        "Relationship {rel} is linked into the list of node {node} but does not touch it"
    ))
}
