// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Artifact dependency graph
//!
//! Edges are never written by flow authors. A step depends on another step
//! exactly when one of its declared inputs is an output of the other, so
//! flows authored independently connect as soon as their artifact names
//! line up.

use petgraph::algo::{has_path_connecting, tarjan_scc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use crate::errors::{ArtiflowError, ArtiflowResult};
use crate::pipeline::StepDescriptor;
use crate::registry::StepRegistry;

/// Step dependency graph, derived from artifact names
#[derive(Debug, Clone)]
pub struct StepGraph {
    /// Nodes are steps (node index == definition order); edge weights hold
    /// the shared artifacts that justify the edge
    graph: DiGraph<StepDescriptor, Vec<String>>,
    index: HashMap<String, NodeIndex>,
    /// Topological order
    order: Vec<NodeIndex>,
    /// Position of each node in `order`
    rank: Vec<usize>,
    prev: Vec<Vec<NodeIndex>>,
    next: Vec<Vec<NodeIndex>>,
}

impl StepGraph {
    /// Build the graph from a merged registry.
    ///
    /// Fails with [`ArtiflowError::CircularDependency`] naming every step
    /// that sits on a cycle.
    pub fn build(registry: &StepRegistry) -> ArtiflowResult<Self> {
        let mut graph: DiGraph<StepDescriptor, Vec<String>> =
            DiGraph::with_capacity(registry.len(), registry.len());
        let mut index = HashMap::with_capacity(registry.len());

        for step in registry.iter() {
            let node = graph.add_node(step.clone());
            index.insert(step.id.clone(), node);
        }

        // artifact -> producers, in definition order
        let mut producers: HashMap<&str, Vec<NodeIndex>> = HashMap::new();
        for node in graph.node_indices() {
            for artifact in &graph[node].outputs {
                producers.entry(artifact.as_str()).or_default().push(node);
            }
        }

        let mut edges: Vec<(NodeIndex, NodeIndex, String)> = Vec::new();
        for consumer in graph.node_indices() {
            for artifact in &graph[consumer].inputs {
                let Some(sources) = producers.get(artifact.as_str()) else {
                    continue;
                };
                for &producer in sources {
                    if producer != consumer {
                        edges.push((producer, consumer, artifact.clone()));
                    }
                }
            }
        }
        drop(producers);

        // One edge per ordered pair, however many artifacts justify it
        for (producer, consumer, artifact) in edges {
            match graph.find_edge(producer, consumer) {
                Some(edge) => graph[edge].push(artifact),
                None => {
                    graph.add_edge(producer, consumer, vec![artifact]);
                }
            }
        }

        Self::validate_acyclic(&graph)?;

        let adjacency = |dir: Direction| -> Vec<Vec<NodeIndex>> {
            graph
                .node_indices()
                .map(|n| {
                    let mut list: Vec<NodeIndex> = graph.neighbors_directed(n, dir).collect();
                    list.sort_unstable();
                    list
                })
                .collect()
        };
        let prev = adjacency(Direction::Incoming);
        let next = adjacency(Direction::Outgoing);

        let order = Self::kahn_order(&graph, &prev, &next);
        let mut rank = vec![0; order.len()];
        for (pos, node) in order.iter().enumerate() {
            rank[node.index()] = pos;
        }

        tracing::debug!(
            steps = graph.node_count(),
            edges = graph.edge_count(),
            "built artifact graph"
        );

        Ok(Self {
            graph,
            index,
            order,
            rank,
            prev,
            next,
        })
    }

    /// Reject graphs with cycles, naming every step in a strongly connected
    /// component of more than one step
    fn validate_acyclic(graph: &DiGraph<StepDescriptor, Vec<String>>) -> ArtiflowResult<()> {
        let mut members: Vec<NodeIndex> = tarjan_scc(graph)
            .into_iter()
            .filter(|component| component.len() > 1)
            .flatten()
            .collect();

        if members.is_empty() {
            return Ok(());
        }

        members.sort_unstable();
        Err(ArtiflowError::CircularDependency {
            steps: members.into_iter().map(|n| graph[n].id.clone()).collect(),
        })
    }

    /// Kahn's algorithm; ties between ready steps go to the earliest-defined
    fn kahn_order(
        graph: &DiGraph<StepDescriptor, Vec<String>>,
        prev: &[Vec<NodeIndex>],
        next: &[Vec<NodeIndex>],
    ) -> Vec<NodeIndex> {
        let mut in_degree: Vec<usize> = prev.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<NodeIndex>> = graph
            .node_indices()
            .filter(|n| in_degree[n.index()] == 0)
            .map(Reverse)
            .collect();

        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(Reverse(node)) = ready.pop() {
            order.push(node);
            for &succ in &next[node.index()] {
                in_degree[succ.index()] -= 1;
                if in_degree[succ.index()] == 0 {
                    ready.push(Reverse(succ));
                }
            }
        }
        order
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lookups by id
    // ─────────────────────────────────────────────────────────────────────────

    /// Number of steps
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    /// Whether the graph has no steps
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Number of derived edges
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Whether a step id is known
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Look up a step descriptor
    pub fn step(&self, id: &str) -> Option<&StepDescriptor> {
        self.index.get(id).map(|&n| &self.graph[n])
    }

    /// Resolve a step id, failing with a suggestion if it is unknown
    pub fn require(&self, id: &str) -> ArtiflowResult<NodeIndex> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| ArtiflowError::unknown_step(id, self.order_ids()))
    }

    /// Full topological order of step ids
    pub fn order_ids(&self) -> Vec<&str> {
        self.order.iter().map(|&n| self.graph[n].id.as_str()).collect()
    }

    /// Full topological order of descriptors
    pub fn topological_order(&self) -> Vec<&StepDescriptor> {
        self.order.iter().map(|&n| &self.graph[n]).collect()
    }

    /// Direct predecessors of a step, in definition order
    pub fn prev(&self, id: &str) -> ArtiflowResult<Vec<&str>> {
        let node = self.require(id)?;
        Ok(self.ids_of(self.prev_of(node)))
    }

    /// Direct successors of a step, in definition order
    pub fn next(&self, id: &str) -> ArtiflowResult<Vec<&str>> {
        let node = self.require(id)?;
        Ok(self.ids_of(self.next_of(node)))
    }

    /// Artifacts that justify the edge `from -> to`, if there is one
    pub fn edge_artifacts(&self, from: &str, to: &str) -> Option<&[String]> {
        let a = *self.index.get(from)?;
        let b = *self.index.get(to)?;
        self.graph.find_edge(a, b).map(|e| self.graph[e].as_slice())
    }

    /// All edges as `(producer, consumer, artifacts)`, in insertion order
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str, &[String])> {
        self.graph.edge_indices().filter_map(move |e| {
            let (a, b) = self.graph.edge_endpoints(e)?;
            Some((
                self.graph[a].id.as_str(),
                self.graph[b].id.as_str(),
                self.graph[e].as_slice(),
            ))
        })
    }

    /// Check if `a` depends (directly or transitively) on `b`
    pub fn depends_on(&self, a: &str, b: &str) -> bool {
        let (Some(&node_a), Some(&node_b)) = (self.index.get(a), self.index.get(b)) else {
            return false;
        };
        node_a != node_b && has_path_connecting(&self.graph, node_b, node_a, None)
    }

    /// Sort a set of step ids into topological order, dropping unknown ids
    pub fn linearize<'a, I>(&self, ids: I) -> Vec<&str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut nodes: Vec<NodeIndex> = ids
            .into_iter()
            .filter_map(|id| self.index.get(id).copied())
            .collect();
        nodes.sort_unstable_by_key(|n| self.rank[n.index()]);
        nodes.dedup();
        self.ids_of(&nodes)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Index-level access for closure computation and scheduling
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn node(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub(crate) fn descriptor(&self, node: NodeIndex) -> &StepDescriptor {
        &self.graph[node]
    }

    pub(crate) fn prev_of(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.prev[node.index()]
    }

    pub(crate) fn next_of(&self, node: NodeIndex) -> &[NodeIndex] {
        &self.next[node.index()]
    }

    pub(crate) fn rank_of(&self, node: NodeIndex) -> usize {
        self.rank[node.index()]
    }

    fn ids_of(&self, nodes: &[NodeIndex]) -> Vec<&str> {
        nodes.iter().map(|&n| self.graph[n].id.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(name: &str, inputs: &[&str], outputs: &[&str]) -> StepDescriptor {
        StepDescriptor::new(None, name, format!("{}.sh", name), "test")
            .with_inputs(inputs.iter().copied())
            .with_outputs(outputs.iter().copied())
    }

    fn build(steps: Vec<StepDescriptor>) -> ArtiflowResult<StepGraph> {
        StepGraph::build(&steps.into_iter().collect())
    }

    #[test]
    fn test_linear_chain() {
        let graph = build(vec![
            step("A", &[], &["f1"]),
            step("B", &["f1"], &["f2"]),
            step("C", &["f2"], &[]),
        ])
        .unwrap();

        assert_eq!(graph.order_ids(), vec!["A", "B", "C"]);
        assert_eq!(graph.prev("B").unwrap(), vec!["A"]);
        assert_eq!(graph.next("B").unwrap(), vec!["C"]);
        assert!(graph.prev("A").unwrap().is_empty());
    }

    #[test]
    fn test_order_follows_edges_not_definition() {
        let graph = build(vec![
            step("late", &["early.out"], &[]),
            step("early", &[], &["early.out"]),
            step("free", &[], &[]),
        ])
        .unwrap();

        assert_eq!(graph.order_ids(), vec!["early", "late", "free"]);
    }

    #[test]
    fn test_independent_steps_keep_definition_order() {
        let graph = build(vec![
            step("c", &[], &[]),
            step("a", &[], &[]),
            step("b", &[], &[]),
        ])
        .unwrap();

        assert_eq!(graph.order_ids(), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_edges_deduplicated_per_pair() {
        let graph = build(vec![
            step("p", &[], &["x", "y"]),
            step("c", &["x", "y"], &[]),
        ])
        .unwrap();

        assert_eq!(graph.edge_count(), 1);
        assert_eq!(
            graph.edge_artifacts("p", "c").unwrap(),
            &["x".to_string(), "y".to_string()]
        );
    }

    #[test]
    fn test_edges_exist_exactly_where_artifacts_overlap() {
        let steps = vec![
            step("a", &["in"], &["x"]),
            step("b", &["x"], &["y"]),
            step("c", &["y", "x"], &["z"]),
            step("d", &["q"], &["Y"]),
        ];
        let graph = build(steps.clone()).unwrap();

        for producer in &steps {
            for consumer in &steps {
                if producer.id == consumer.id {
                    continue;
                }
                let overlap = !producer.shared_with(consumer).is_empty();
                assert_eq!(
                    graph.edge_artifacts(&producer.id, &consumer.id).is_some(),
                    overlap,
                    "{} -> {}",
                    producer.id,
                    consumer.id
                );
            }
        }
    }

    #[test]
    fn test_fan_in_from_multiple_producers() {
        let graph = build(vec![
            step("p1", &[], &["shared"]),
            step("p2", &[], &["shared"]),
            step("c", &["shared"], &[]),
        ])
        .unwrap();

        assert_eq!(graph.prev("c").unwrap(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_fan_out() {
        let graph = build(vec![
            step("p", &[], &["x"]),
            step("c1", &["x"], &[]),
            step("c2", &["x"], &[]),
        ])
        .unwrap();

        assert_eq!(graph.next("p").unwrap(), vec!["c1", "c2"]);
    }

    #[test]
    fn test_self_consumption_is_not_an_edge() {
        let graph = build(vec![step("s", &["x"], &["x"])]).unwrap();
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_cycle_names_participants() {
        let result = build(vec![
            step("A", &["y"], &["x"]),
            step("B", &["x"], &["y"]),
            step("C", &["y"], &[]),
        ]);

        match result {
            Err(ArtiflowError::CircularDependency { steps }) => {
                assert_eq!(steps, vec!["A", "B"]);
            }
            other => panic!("Expected CircularDependency, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_step() {
        let graph = build(vec![step("a", &[], &[])]).unwrap();
        assert!(matches!(
            graph.prev("nope"),
            Err(ArtiflowError::UnknownStep { .. })
        ));
    }

    #[test]
    fn test_depends_on_check() {
        let graph = build(vec![
            step("a", &[], &["1"]),
            step("b", &["1"], &["2"]),
            step("c", &["2"], &[]),
        ])
        .unwrap();

        assert!(graph.depends_on("c", "a"));
        assert!(graph.depends_on("b", "a"));
        assert!(!graph.depends_on("a", "c"));
        assert!(!graph.depends_on("a", "a"));
    }

    #[test]
    fn test_linearize() {
        let graph = build(vec![
            step("a", &[], &["1"]),
            step("b", &["1"], &["2"]),
            step("c", &["2"], &[]),
        ])
        .unwrap();

        assert_eq!(graph.linearize(["c", "a", "zzz", "a"]), vec!["a", "c"]);
    }
}
