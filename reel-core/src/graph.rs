//! Reference graph
//!
//! Edges point from a node to the nodes its inputs reference. Used to reject
//! definitions that would make a node (transitively) depend on itself, which
//! would otherwise leave every node of the cycle waiting on readiness forever.

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::node::{Node, NodeInputs, referenced_uuids};

#[derive(Debug, Clone, Default)]
pub struct ReferenceGraph {
    graph: DiGraph<Uuid, ()>,
    /// Mapping from node UUID to its index in `graph`
    indices: HashMap<Uuid, NodeIndex>,
}

impl ReferenceGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph of a pipeline from its stored nodes
    pub fn from_nodes<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> Self {
        let mut graph = Self::new();
        for node in nodes {
            graph.set_inputs(node.uuid, &node.inputs);
        }
        graph
    }

    fn index(&mut self, node: Uuid) -> NodeIndex {
        if let Some(index) = self.indices.get(&node) {
            return *index;
        }
        let index = self.graph.add_node(node);
        self.indices.insert(node, index);
        index
    }

    /// Replaces the outgoing edges of `node`
    pub fn set_inputs(&mut self, node: Uuid, inputs: &NodeInputs) {
        let from = self.index(node);
        while let Some(edge) = self.graph.first_edge(from, Direction::Outgoing) {
            self.graph.remove_edge(edge);
        }
        for referenced in referenced_uuids(inputs) {
            let to = self.index(referenced);
            self.graph.update_edge(from, to, ());
        }
    }

    /// Whether `target` is reachable from `from` by following references
    pub fn reaches(&self, from: Uuid, target: Uuid) -> bool {
        if from == target {
            return true;
        }
        match (self.indices.get(&from), self.indices.get(&target)) {
            (Some(from), Some(target)) => has_path_connecting(&self.graph, *from, *target, None),
            _ => false,
        }
    }

    /// Slots of `inputs` whose references lead back to `node`
    ///
    /// `inputs` is the candidate definition of `node`. Any stored edges of
    /// `node` are only walked after `node` itself was reached, so they never
    /// affect the answer.
    pub fn cyclic_slots(&self, node: Uuid, inputs: &NodeInputs) -> Vec<String> {
        inputs
            .iter()
            .filter(|(_, value)| {
                value
                    .uuids()
                    .iter()
                    .any(|id| self.reaches(*id, node))
            })
            .map(|(slot, _)| slot.clone())
            .collect()
    }
}
