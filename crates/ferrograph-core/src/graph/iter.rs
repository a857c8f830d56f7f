//! Lazy traversals over the graph

use super::GraphStore;
use crate::storage::records::{Node, Property, Relationship};
use crate::storage::store_manager::StoreIter;
use crate::storage::{Index, NULL_INDEX};
use crate::{Error, Result};

impl GraphStore {
    /// Every live node of `type_name` with its property chain
    pub fn get_nodes_of_type(&self, type_name: &str) -> Result<NodesOfType<'_>> {
        let (record, _) = self.get_type_data(type_name)?;
        Ok(NodesOfType {
            graph: self,
            inner: self.nodes.iter()?,
            type_ref: record.index,
        })
    }

    /// Every live relationship of `type_name` with its property chain
    pub fn get_relations_of_type(&self, type_name: &str) -> Result<RelationsOfType<'_>> {
        let (record, _) = self.get_type_data(type_name)?;
        Ok(RelationsOfType {
            graph: self,
            inner: self.relationships.iter()?,
            type_ref: record.index,
        })
    }

    /// Relationships incident to `node`, most recently inserted first
    pub fn relations_of(&self, node: Index) -> Result<RelationsOf<'_>> {
        let record = self
            .nodes
            .get_item(node)?
            .ok_or_else(|| Error::not_found(format!("node {node}")))?;
        Ok(RelationsOf {
            graph: self,
            node,
            next: record.rel_head,
            remaining: self.relationships.count()?,
        })
    }
}

/// Iterator returned by [`GraphStore::get_nodes_of_type`]
pub struct NodesOfType<'a> {
    graph: &'a GraphStore,
    inner: StoreIter<'a, Node>,
    type_ref: Index,
}

impl Iterator for NodesOfType<'_> {
    type Item = Result<(Node, Vec<Property>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(node) if node.type_ref == self.type_ref => {
                    return Some(
                        self.graph
                            .property_chain(node.prop_head)
                            .map(|chain| (node, chain)),
                    );
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Iterator returned by [`GraphStore::get_relations_of_type`]
pub struct RelationsOfType<'a> {
    graph: &'a GraphStore,
    inner: StoreIter<'a, Relationship>,
    type_ref: Index,
}

impl Iterator for RelationsOfType<'_> {
    type Item = Result<(Relationship, Vec<Property>)>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.inner.next()? {
                Ok(rel) if rel.type_ref == self.type_ref => {
                    return Some(
                        self.graph
                            .property_chain(rel.prop_head)
                            .map(|chain| (rel, chain)),
                    );
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

/// Iterator returned by [`GraphStore::relations_of`]
pub struct RelationsOf<'a> {
    graph: &'a GraphStore,
    node: Index,
    next: Index,
    remaining: Index,
}

impl Iterator for RelationsOf<'_> {
    type Item = Result<Relationship>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == NULL_INDEX {
            return None;
        }
        if self.remaining == 0 {
            self.next = NULL_INDEX;
            return Some(Err(Error::corruption(format!(
                "Relationship list of node {} loops",
                self.node
            ))));
        }
        self.remaining -= 1;

        let index = self.next;
        let rel = match self.graph.relationships.get_item(index) {
            Ok(Some(rel)) => rel,
            Ok(None) => {
                self.next = NULL_INDEX;
                return Some(Err(Error::corruption(format!(
                    "Relationship list of node {} points at free record {}",
                    self.node, index
                ))));
            }
            Err(e) => {
                self.next = NULL_INDEX;
                return Some(Err(e));
            }
        };

        match rel.next_for(self.node) {
            Some(next) => {
                self.next = next;
                Some(Ok(rel))
            }
            None => {
                self.next = NULL_INDEX;
                Some(Err(Error::corruption(format!(
                    "Relationship {} is not incident to node {}",
                    index, self.node
                ))))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::graph::tests::create_test_graph;
    use crate::storage::records::PropertyType;
    use crate::storage::value::PropertyValue;
    use crate::Error;

    #[test]
    fn test_nodes_of_type_filters_and_skips_deleted() {
        let (mut graph, _dir) = create_test_graph();
        graph
            .create_type("Person", &[("age", PropertyType::Int)])
            .unwrap();
        graph.create_type("City", &[]).unwrap();

        let mut people = Vec::new();
        for age in [10, 20, 30] {
            people.push(graph.insert_node("Person", &[PropertyValue::Int(age)]).unwrap());
            graph.insert_node("City", &[]).unwrap();
        }
        graph.delete_node(&people[1].0).unwrap();

        let found: Vec<_> = graph
            .get_nodes_of_type("Person")
            .unwrap()
            .collect::<crate::Result<_>>()
            .unwrap();
        assert_eq!(found, vec![people[0].clone(), people[2].clone()]);
        assert_eq!(graph.get_nodes_of_type("City").unwrap().count(), 3);
        assert!(matches!(
            graph.get_nodes_of_type("Ghost"),
            Err(Error::TypeDoesNotExist(_))
        ));
    }

    #[test]
    fn test_relations_of_type() {
        let (mut graph, _dir) = create_test_graph();
        graph.create_type("Stop", &[]).unwrap();
        graph
            .create_type("BUS", &[("line", PropertyType::Short)])
            .unwrap();
        graph.create_type("TRAM", &[]).unwrap();
        let (a, _) = graph.insert_node("Stop", &[]).unwrap();
        let (b, _) = graph.insert_node("Stop", &[]).unwrap();

        let bus = graph
            .insert_relation("BUS", &[PropertyValue::Short(12)], a.index, b.index)
            .unwrap();
        graph.insert_relation("TRAM", &[], b.index, a.index).unwrap();

        let found: Vec<_> = graph
            .get_relations_of_type("BUS")
            .unwrap()
            .collect::<crate::Result<_>>()
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0.index, bus.0.index);
        assert_eq!(found[0].1, bus.1);
    }

    #[test]
    fn test_relations_of_unknown_node() {
        let (graph, _dir) = create_test_graph();
        assert!(matches!(graph.relations_of(3), Err(Error::NotFound(_))));
    }
}
