// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Working graph: the node/link set a single program execution builds up
//!
//! Nodes are keyed by `concept_id`, links by the compound key
//! `(from_id, relationship_type, to_id)`. Both are sets: inserting an
//! existing key is a no-op and the first writer wins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

/// Error types for working graph operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Dangling link {from} -[{relationship_type}]-> {to}: endpoint not present")]
    DanglingLink {
        from: String,
        relationship_type: String,
        to: String,
    },
}

/// Concept node in the working graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub concept_id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ontology: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl GraphNode {
    /// Create a new node with the given concept id and label
    pub fn new(concept_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            concept_id: concept_id.into(),
            label: label.into(),
            ontology: None,
            properties: Map::new(),
        }
    }

    /// Set the ontology this concept belongs to
    pub fn with_ontology(mut self, ontology: impl Into<String>) -> Self {
        self.ontology = Some(ontology.into());
        self
    }

    /// Set a property value
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

/// Compound identity of a link
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinkKey {
    pub from_id: String,
    pub relationship_type: String,
    pub to_id: String,
}

/// Directed, typed link between two concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
    pub from_id: String,
    pub relationship_type: String,
    pub to_id: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub properties: Map<String, Value>,
}

impl GraphLink {
    pub fn new(
        from_id: impl Into<String>,
        relationship_type: impl Into<String>,
        to_id: impl Into<String>,
    ) -> Self {
        Self {
            from_id: from_id.into(),
            relationship_type: relationship_type.into(),
            to_id: to_id.into(),
            properties: Map::new(),
        }
    }

    /// Set a property value
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn key(&self) -> LinkKey {
        LinkKey {
            from_id: self.from_id.clone(),
            relationship_type: self.relationship_type.clone(),
            to_id: self.to_id.clone(),
        }
    }
}

/// Flat wire shape of a working graph: `{ "nodes": [...], "links": [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub links: Vec<GraphLink>,
}

/// The mutable graph owned by one execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "GraphSnapshot", into = "GraphSnapshot")]
pub struct WorkingGraph {
    nodes: BTreeMap<String, GraphNode>,
    links: BTreeMap<LinkKey, GraphLink>,
}

impl WorkingGraph {
    /// Create an empty working graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from parts, dropping duplicate keys (first wins) and
    /// links whose endpoints are not among `nodes`
    pub fn from_parts(nodes: Vec<GraphNode>, links: Vec<GraphLink>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.insert_node(node);
        }
        for link in links {
            graph.insert_link(link);
        }
        graph.enforce_no_dangling();
        graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// True when the graph holds neither nodes nor links
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn contains_node(&self, concept_id: &str) -> bool {
        self.nodes.contains_key(concept_id)
    }

    pub fn contains_link(&self, key: &LinkKey) -> bool {
        self.links.contains_key(key)
    }

    pub fn get_node(&self, concept_id: &str) -> Option<&GraphNode> {
        self.nodes.get(concept_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.nodes.values()
    }

    pub fn links(&self) -> impl Iterator<Item = &GraphLink> {
        self.links.values()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = &String> {
        self.nodes.keys()
    }

    /// Insert a node unless its id is already present. Returns true if inserted.
    pub fn insert_node(&mut self, node: GraphNode) -> bool {
        if self.nodes.contains_key(&node.concept_id) {
            return false;
        }
        self.nodes.insert(node.concept_id.clone(), node);
        true
    }

    /// Insert a link unless its key is already present. Returns true if inserted.
    ///
    /// Endpoints are not checked here; callers re-establish the invariant
    /// with [`WorkingGraph::enforce_no_dangling`].
    pub fn insert_link(&mut self, link: GraphLink) -> bool {
        let key = link.key();
        if self.links.contains_key(&key) {
            return false;
        }
        self.links.insert(key, link);
        true
    }

    pub fn remove_node(&mut self, concept_id: &str) -> Option<GraphNode> {
        self.nodes.remove(concept_id)
    }

    /// Keep only nodes for which `keep` returns true. Returns the number removed.
    pub fn retain_nodes<F>(&mut self, mut keep: F) -> usize
    where
        F: FnMut(&GraphNode) -> bool,
    {
        let before = self.nodes.len();
        self.nodes.retain(|_, node| keep(node));
        before - self.nodes.len()
    }

    /// Remove every link whose endpoints are not both present.
    /// Returns the number of links removed.
    pub fn enforce_no_dangling(&mut self) -> usize {
        let nodes = &self.nodes;
        let before = self.links.len();
        self.links
            .retain(|key, _| nodes.contains_key(&key.from_id) && nodes.contains_key(&key.to_id));
        before - self.links.len()
    }

    /// Check the no-dangling-links invariant without modifying the graph
    pub fn check_invariants(&self) -> Result<(), GraphError> {
        match self.links.keys().find(|key| {
            !self.nodes.contains_key(&key.from_id) || !self.nodes.contains_key(&key.to_id)
        }) {
            Some(key) => Err(GraphError::DanglingLink {
                from: key.from_id.clone(),
                relationship_type: key.relationship_type.clone(),
                to: key.to_id.clone(),
            }),
            None => Ok(()),
        }
    }

    /// True if any node belongs to the named ontology
    pub fn has_ontology(&self, ontology: &str) -> bool {
        self.nodes
            .values()
            .any(|node| node.ontology.as_deref() == Some(ontology))
    }

    /// True if any link carries the given relationship type
    pub fn has_relationship(&self, relationship_type: &str) -> bool {
        self.links
            .keys()
            .any(|key| key.relationship_type == relationship_type)
    }
}

impl From<GraphSnapshot> for WorkingGraph {
    fn from(snapshot: GraphSnapshot) -> Self {
        WorkingGraph::from_parts(snapshot.nodes, snapshot.links)
    }
}

impl From<WorkingGraph> for GraphSnapshot {
    fn from(graph: WorkingGraph) -> Self {
        GraphSnapshot {
            nodes: graph.nodes.into_values().collect(),
            links: graph.links.into_values().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> WorkingGraph {
        WorkingGraph::from_parts(
            vec![
                GraphNode::new("a", "Alpha"),
                GraphNode::new("b", "Beta"),
                GraphNode::new("c", "Gamma").with_ontology("physics"),
            ],
            vec![
                GraphLink::new("a", "SUPPORTS", "b"),
                GraphLink::new("b", "IMPLIES", "c"),
                GraphLink::new("c", "CONTRADICTS", "a"),
            ],
        )
    }

    #[test]
    fn test_first_writer_wins_on_node_collision() {
        let mut graph = WorkingGraph::new();
        assert!(graph.insert_node(GraphNode::new("a", "original")));
        assert!(!graph.insert_node(GraphNode::new("a", "replacement")));
        assert_eq!(graph.get_node("a").unwrap().label, "original");
    }

    #[test]
    fn test_from_parts_drops_dangling_links() {
        let graph = WorkingGraph::from_parts(
            vec![GraphNode::new("a", "A")],
            vec![GraphLink::new("a", "RELATES", "missing")],
        );
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.link_count(), 0);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_removing_node_then_enforcing_cascades() {
        let mut graph = triangle();
        graph.remove_node("a");
        // Direct removal leaves the graph inconsistent until enforcement runs
        assert!(graph.check_invariants().is_err());
        assert_eq!(graph.enforce_no_dangling(), 2);
        assert_eq!(graph.link_count(), 1);
        assert!(graph.check_invariants().is_ok());
    }

    #[test]
    fn test_predicates() {
        let graph = triangle();
        assert!(graph.has_ontology("physics"));
        assert!(!graph.has_ontology("biology"));
        assert!(graph.has_relationship("IMPLIES"));
        assert!(!graph.has_relationship("PART_OF"));
    }

    #[test]
    fn test_json_shape() {
        let graph = triangle();
        let json = serde_json::to_value(&graph).unwrap();
        assert_eq!(json["nodes"].as_array().unwrap().len(), 3);
        assert_eq!(json["links"].as_array().unwrap().len(), 3);

        let back: WorkingGraph = serde_json::from_value(json).unwrap();
        assert_eq!(back, graph);
    }
}
