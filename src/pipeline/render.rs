// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 artiflow contributors

//! Graph rendering
//!
//! Text, Graphviz DOT and Mermaid views of the derived step graph,
//! optionally narrowed to the neighbourhood of one step.

use indexmap::IndexMap;
use petgraph::graph::NodeIndex;
use std::collections::{BTreeSet, VecDeque};

use crate::errors::ArtiflowResult;
use crate::pipeline::StepGraph;

/// Renders a step graph
pub struct GraphRenderer<'g> {
    graph: &'g StepGraph,
    visible: Option<BTreeSet<NodeIndex>>,
}

impl<'g> GraphRenderer<'g> {
    pub fn new(graph: &'g StepGraph) -> Self {
        Self {
            graph,
            visible: None,
        }
    }

    /// Restrict output to steps within `depth` hops of `step`, following
    /// edges in both directions
    pub fn focus(mut self, step: &str, depth: usize) -> ArtiflowResult<Self> {
        let seed = self.graph.require(step)?;
        let mut seen = BTreeSet::from([seed]);
        let mut queue = VecDeque::from([(seed, 0usize)]);

        while let Some((node, hops)) = queue.pop_front() {
            if hops == depth {
                continue;
            }
            let neighbours = self
                .graph
                .prev_of(node)
                .iter()
                .chain(self.graph.next_of(node));
            for &n in neighbours {
                if seen.insert(n) {
                    queue.push_back((n, hops + 1));
                }
            }
        }

        self.visible = Some(seen);
        Ok(self)
    }

    /// Numbered topological listing
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        for (i, node) in self.nodes().into_iter().enumerate() {
            let step = self.graph.descriptor(node);
            out.push_str(&format!("{}. {}", i + 1, step.id));

            let after: Vec<&str> = self
                .graph
                .prev_of(node)
                .iter()
                .map(|&p| self.graph.descriptor(p).id.as_str())
                .collect();
            if !after.is_empty() {
                out.push_str(&format!(" [after: {}]", after.join(", ")));
            }
            out.push('\n');
        }

        out
    }

    /// Graphviz DOT, one cluster per namespace
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph artiflow {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n");

        let mut clusters: IndexMap<Option<&str>, Vec<&str>> = IndexMap::new();
        for node in self.nodes() {
            let step = self.graph.descriptor(node);
            clusters
                .entry(step.namespace.as_deref())
                .or_default()
                .push(step.id.as_str());
        }

        for (namespace, ids) in &clusters {
            out.push('\n');
            match namespace {
                Some(ns) => {
                    let cluster = format!("cluster_{}", ns);
                    out.push_str(&format!("    subgraph {} {{\n", dot_quote(&cluster)));
                    out.push_str(&format!("        label={};\n", dot_quote(ns)));
                    for id in ids {
                        out.push_str(&format!("        {};\n", dot_quote(id)));
                    }
                    out.push_str("    }\n");
                }
                None => {
                    for id in ids {
                        out.push_str(&format!("    {};\n", dot_quote(id)));
                    }
                }
            }
        }

        let edges = self.edges();
        if !edges.is_empty() {
            out.push('\n');
        }
        for (from, to, artifacts) in edges {
            out.push_str(&format!(
                "    {} -> {} [label={}];\n",
                dot_quote(from),
                dot_quote(to),
                dot_quote(&edge_label(artifacts))
            ));
        }

        out.push_str("}\n");
        out
    }

    /// Mermaid flowchart; node ids are positional since step ids contain dots
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");
        let nodes = self.nodes();

        let key: IndexMap<&str, String> = nodes
            .iter()
            .enumerate()
            .map(|(i, &n)| (self.graph.descriptor(n).id.as_str(), format!("s{}", i)))
            .collect();

        for (id, k) in &key {
            out.push_str(&format!("    {}[\"{}\"]\n", k, id.replace('"', "#quot;")));
        }

        for (from, to, artifacts) in self.edges() {
            if let (Some(f), Some(t)) = (key.get(from), key.get(to)) {
                out.push_str(&format!("    {} -->|{}| {}\n", f, edge_label(artifacts), t));
            }
        }

        out
    }

    /// Visible nodes in topological order
    fn nodes(&self) -> Vec<NodeIndex> {
        self.graph
            .order_ids()
            .into_iter()
            .filter_map(|id| self.graph.node(id))
            .filter(|n| self.is_visible(*n))
            .collect()
    }

    fn is_visible(&self, node: NodeIndex) -> bool {
        self.visible.as_ref().map_or(true, |v| v.contains(&node))
    }

    /// Edges between visible nodes
    fn edges(&self) -> Vec<(&'g str, &'g str, &'g [String])> {
        self.graph
            .edges()
            .filter(|(from, to, _)| {
                [from, to]
                    .iter()
                    .all(|id| self.graph.node(id).is_some_and(|n| self.is_visible(n)))
            })
            .collect()
    }
}

/// First shared artifact, with a count of the rest
fn edge_label(artifacts: &[String]) -> String {
    match artifacts {
        [] => String::new(),
        [only] => only.clone(),
        [first, rest @ ..] => format!("{} +{}", first, rest.len()),
    }
}

/// Quote a DOT identifier
fn dot_quote(s: &str) -> String {
    let mut quoted = String::with_capacity(s.len() + 2);
    quoted.push('"');
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                quoted.push('\\');
                quoted.push(c);
            }
            '\n' => quoted.push_str("\\n"),
            _ => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::StepDescriptor;

    fn fixture() -> StepGraph {
        let steps = vec![
            StepDescriptor::new(Some("pnr"), "place", "p", "t").with_outputs(["place.pass"]),
            StepDescriptor::new(Some("pnr"), "route", "r", "t")
                .with_inputs(["place.pass"])
                .with_outputs(["route.pass", "route.def"]),
            StepDescriptor::new(Some("pv"), "drc", "d", "t")
                .with_inputs(["route.pass", "route.def"]),
            StepDescriptor::new(None, "lonely", "l", "t"),
        ];
        StepGraph::build(&steps.into_iter().collect()).unwrap()
    }

    #[test]
    fn test_text() {
        let graph = fixture();
        insta::assert_snapshot!(GraphRenderer::new(&graph).to_text(), @r###"
        1. pnr.place
        2. pnr.route [after: pnr.place]
        3. pv.drc [after: pnr.route]
        4. lonely
        "###);
    }

    #[test]
    fn test_dot_clusters_and_labels() {
        let graph = fixture();
        let dot = GraphRenderer::new(&graph).to_dot();

        assert!(dot.starts_with("digraph artiflow {"));
        assert!(dot.contains("subgraph \"cluster_pnr\" {"));
        assert!(dot.contains("subgraph \"cluster_pv\" {"));
        assert!(dot.contains("    \"lonely\";\n"));
        assert!(dot.contains("\"pnr.place\" -> \"pnr.route\" [label=\"place.pass\"];"));
        assert!(dot.contains("\"pnr.route\" -> \"pv.drc\" [label=\"route.pass +1\"];"));
        assert!(dot.ends_with("}\n"));
    }

    #[test]
    fn test_mermaid() {
        let graph = fixture();
        let mermaid = GraphRenderer::new(&graph).to_mermaid();

        assert!(mermaid.starts_with("graph TD\n"));
        assert!(mermaid.contains("    s0[\"pnr.place\"]\n"));
        assert!(mermaid.contains("    s0 -->|place.pass| s1\n"));
        assert!(mermaid.contains("    s1 -->|route.pass +1| s2\n"));
    }

    #[test]
    fn test_focus_limits_neighbourhood() {
        let graph = fixture();
        let text = GraphRenderer::new(&graph)
            .focus("pv.drc", 1)
            .unwrap()
            .to_text();

        assert_eq!(text, "1. pnr.route [after: pnr.place]\n2. pv.drc [after: pnr.route]\n");

        let zero = GraphRenderer::new(&graph).focus("pnr.route", 0).unwrap();
        assert_eq!(zero.to_mermaid(), "graph TD\n    s0[\"pnr.route\"]\n");
    }

    #[test]
    fn test_dot_escapes_quotes() {
        let steps = vec![
            StepDescriptor::new(Some("q\"ns"), "say \"hi\"", "s", "t").with_outputs(["a\\b"]),
            StepDescriptor::new(None, "next", "n", "t").with_inputs(["a\\b"]),
        ];
        let graph = StepGraph::build(&steps.into_iter().collect()).unwrap();
        let dot = GraphRenderer::new(&graph).to_dot();

        assert!(dot.contains(r#"subgraph "cluster_q\"ns" {"#));
        assert!(dot.contains(r#"label="q\"ns";"#));
        assert!(dot.contains(r#""q\"ns.say \"hi\"" -> "next" [label="a\\b"];"#));

        let mermaid = GraphRenderer::new(&graph).to_mermaid();
        assert!(mermaid.contains("s0[\"q#quot;ns.say #quot;hi#quot;\"]"));
    }

    #[test]
    fn test_focus_unknown_step() {
        let graph = fixture();
        assert!(GraphRenderer::new(&graph).focus("pv.lvs", 2).is_err());
    }
}
