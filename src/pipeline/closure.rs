// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Scheduling closures
//!
//! Turns a scheduling request into the exact set of steps that has to run
//! for the request to be satisfiable.

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::errors::{ArtiflowError, ArtiflowResult};
use crate::pipeline::StepGraph;

/// What the user asked to run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleRequest {
    /// Just this step
    Single(String),
    /// This step and everything that consumes its results
    DownstreamOf(String),
    /// This step and everything it needs
    UpstreamOf(String),
    /// Every step on a dependency path `from -> to`, plus whatever the
    /// steps on that path need from outside it
    Range { from: String, to: String },
}

impl ScheduleRequest {
    /// Build a request from the `--step` / `--from` / `--to` flag combination
    pub fn from_bounds(
        step: Option<String>,
        from: Option<String>,
        to: Option<String>,
    ) -> Option<Self> {
        match (step, from, to) {
            (Some(step), _, _) => Some(Self::Single(step)),
            (None, Some(from), Some(to)) => Some(Self::Range { from, to }),
            (None, Some(from), None) => Some(Self::DownstreamOf(from)),
            (None, None, Some(to)) => Some(Self::UpstreamOf(to)),
            (None, None, None) => None,
        }
    }
}

impl std::fmt::Display for ScheduleRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(id) => write!(f, "{}", id),
            Self::DownstreamOf(id) => write!(f, "{} and downstream", id),
            Self::UpstreamOf(id) => write!(f, "{} and upstream", id),
            Self::Range { from, to } => write!(f, "{} -> {}", from, to),
        }
    }
}

/// Unordered set of steps to run; use [`Closure::ordered`] to linearize
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Closure {
    nodes: BTreeSet<NodeIndex>,
}

impl Closure {
    /// Number of steps
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the closure is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether the closure contains a step id
    pub fn contains(&self, graph: &StepGraph, id: &str) -> bool {
        graph.node(id).is_some_and(|n| self.nodes.contains(&n))
    }

    /// Step ids, in no particular order
    pub fn ids<'g>(&self, graph: &'g StepGraph) -> Vec<&'g str> {
        self.nodes
            .iter()
            .map(|&n| graph.descriptor(n).id.as_str())
            .collect()
    }

    /// Step ids in topological order
    pub fn ordered<'g>(&self, graph: &'g StepGraph) -> Vec<&'g str> {
        let mut nodes: Vec<NodeIndex> = self.nodes.iter().copied().collect();
        nodes.sort_unstable_by_key(|&n| graph.rank_of(n));
        nodes
            .into_iter()
            .map(|n| graph.descriptor(n).id.as_str())
            .collect()
    }

    pub(crate) fn nodes(&self) -> &BTreeSet<NodeIndex> {
        &self.nodes
    }
}

impl FromIterator<NodeIndex> for Closure {
    fn from_iter<T: IntoIterator<Item = NodeIndex>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Computes closures over a step graph
pub struct ClosureComputer<'g> {
    graph: &'g StepGraph,
}

impl<'g> ClosureComputer<'g> {
    pub fn new(graph: &'g StepGraph) -> Self {
        Self { graph }
    }

    /// Resolve a request to its closure
    pub fn compute(&self, request: &ScheduleRequest) -> ArtiflowResult<Closure> {
        match request {
            ScheduleRequest::Single(id) => self.single(id),
            ScheduleRequest::DownstreamOf(id) => self.downstream_of(id),
            ScheduleRequest::UpstreamOf(id) => self.upstream_of(id),
            ScheduleRequest::Range { from, to } => self.range(from, to),
        }
    }

    /// `{id}`
    pub fn single(&self, id: &str) -> ArtiflowResult<Closure> {
        let node = self.graph.require(id)?;
        Ok(std::iter::once(node).collect())
    }

    /// The seed and everything reachable through `next()`
    pub fn downstream_of(&self, id: &str) -> ArtiflowResult<Closure> {
        let node = self.graph.require(id)?;
        Ok(self.walk(node, |n| self.graph.next_of(n)))
    }

    /// The seed and everything reachable through `prev()`
    pub fn upstream_of(&self, id: &str) -> ArtiflowResult<Closure> {
        let node = self.graph.require(id)?;
        Ok(self.walk(node, |n| self.graph.prev_of(n)))
    }

    /// Steps on a dependency path from `from` to `to`, repaired at merge
    /// points.
    ///
    /// Any step in the path set (other than `from` itself) whose direct
    /// predecessor is missing gets that predecessor's whole upstream closure
    /// added, so that `to` and every intermediate step can actually become
    /// ready.
    pub fn range(&self, from: &str, to: &str) -> ArtiflowResult<Closure> {
        let from_node = self.graph.require(from)?;
        let to_node = self.graph.require(to)?;

        let downstream = self.walk(from_node, |n| self.graph.next_of(n));
        let upstream = self.walk(to_node, |n| self.graph.prev_of(n));

        let mut nodes: BTreeSet<NodeIndex> = downstream
            .nodes
            .intersection(&upstream.nodes)
            .copied()
            .collect();

        if !nodes.contains(&to_node) {
            return Err(ArtiflowError::NoDependencyPath {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let mut pending: VecDeque<NodeIndex> =
            nodes.iter().copied().filter(|&n| n != from_node).collect();

        while let Some(node) = pending.pop_front() {
            for &pred in self.graph.prev_of(node) {
                if nodes.contains(&pred) {
                    continue;
                }
                tracing::debug!(
                    step = %self.graph.descriptor(node).id,
                    missing = %self.graph.descriptor(pred).id,
                    "pulling in predecessor branch at merge point"
                );
                for added in self.walk(pred, |n| self.graph.prev_of(n)).nodes {
                    if nodes.insert(added) {
                        pending.push_back(added);
                    }
                }
            }
        }

        Ok(Closure { nodes })
    }

    /// Breadth-first walk from `seed`, seed included; visited set makes it
    /// safe on any graph
    fn walk<'a, F>(&self, seed: NodeIndex, neighbours: F) -> Closure
    where
        F: Fn(NodeIndex) -> &'a [NodeIndex],
    {
        let mut seen = BTreeSet::from([seed]);
        let mut queue = VecDeque::from([seed]);

        while let Some(node) = queue.pop_front() {
            for &n in neighbours(node) {
                if seen.insert(n) {
                    queue.push_back(n);
                }
            }
        }

        Closure { nodes: seen }
    }
}
