use std::collections::HashSet;
use std::fmt::Write;

use indexmap::IndexMap;
use petgraph::graph::UnGraph;
use petgraph::prelude::NodeIndex;
use petgraph::unionfind::UnionFind;
use petgraph::visit::EdgeRef;
use serde::{Deserialize, Serialize};

pub type GraphId = String;

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct NodeAttributes {
    pub label: Option<String>,
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct EdgeAttributes {
    pub weight: Option<f64>,
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGraph {
    pub nodes: Vec<RawNode>,
    pub edges: Vec<RawEdge>,
    #[serde(default)]
    pub graph_attributes: IndexMap<String, serde_json::Value>,
    #[serde(default)]
    pub directed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub id: GraphId,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEdge {
    pub source: GraphId,
    pub target: GraphId,
    #[serde(default)]
    pub attributes: IndexMap<String, serde_json::Value>,
}

pub type LabeledGraph = UnGraph<NodeAttributes, EdgeAttributes>;

/// An undirected attributed graph, either a target graph or an induced
/// subgraph of one. Subgraph instances carry at most one anchor node.
#[derive(Debug, Clone)]
pub struct GraphInstance {
    pub graph: LabeledGraph,
    pub node_lookup: IndexMap<GraphId, NodeIndex>,
    pub reverse_lookup: IndexMap<NodeIndex, GraphId>,
    pub graph_attributes: IndexMap<String, serde_json::Value>,
    pub anchor: Option<NodeIndex>,
}

impl GraphInstance {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn node_id(&self, idx: NodeIndex) -> Option<&GraphId> {
        self.reverse_lookup.get(&idx)
    }

    pub fn anchor_id(&self) -> Option<&GraphId> {
        self.anchor.and_then(|idx| self.node_id(idx))
    }

    /// Distinct neighbors of `node`, in adjacency order, excluding `node` itself.
    pub fn distinct_neighbors(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.graph
            .neighbors(node)
            .filter(|&neighbor| neighbor != node && seen.insert(neighbor))
            .collect()
    }

    pub fn has_self_loops(&self) -> bool {
        self.graph
            .edge_references()
            .any(|edge| edge.source() == edge.target())
    }

    /// Remove every loop edge. Node indices are untouched.
    pub fn strip_self_loops(&mut self) -> usize {
        let before = self.graph.edge_count();
        self.graph.retain_edges(|graph, edge| {
            graph
                .edge_endpoints(edge)
                .map(|(source, target)| source != target)
                .unwrap_or(true)
        });
        before - self.graph.edge_count()
    }

    pub fn is_connected(&self) -> bool {
        self.node_count() == 0 || self.largest_component_size() == self.node_count()
    }

    pub fn largest_component_size(&self) -> usize {
        if self.node_count() == 0 {
            return 0;
        }
        let mut components = UnionFind::<usize>::new(self.node_count());
        for edge in self.graph.edge_references() {
            components.union(edge.source().index(), edge.target().index());
        }
        let mut sizes: IndexMap<usize, usize> = IndexMap::new();
        for node in self.graph.node_indices() {
            *sizes.entry(components.find(node.index())).or_insert(0) += 1;
        }
        sizes.values().copied().max().unwrap_or_default()
    }

    /// Multi-line summary of nodes and edges with their attributes, for logging.
    pub fn describe(&self, title: &str, max_nodes: usize, max_edges: usize) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "--- {title} ---");
        let _ = writeln!(
            out,
            "Nodes: {}, Edges: {}, Anchor: {}",
            self.node_count(),
            self.edge_count(),
            self.anchor_id().map(String::as_str).unwrap_or("-")
        );

        let _ = writeln!(out, "--- Nodes (showing up to {max_nodes}) ---");
        for idx in self.graph.node_indices().take(max_nodes) {
            let id = self.node_id(idx).map(String::as_str).unwrap_or("?");
            if let Some(attrs) = self.graph.node_weight(idx) {
                let _ = writeln!(
                    out,
                    "Node {id}: label={:?} weight={:?} extra={:?}",
                    attrs.label, attrs.weight, attrs.extra
                );
            }
        }

        let _ = writeln!(out, "--- Edges (showing up to {max_edges}) ---");
        for edge in self.graph.edge_references().take(max_edges) {
            let source = self.node_id(edge.source()).map(String::as_str).unwrap_or("?");
            let target = self.node_id(edge.target()).map(String::as_str).unwrap_or("?");
            let attrs = edge.weight();
            let _ = writeln!(
                out,
                "Edge ({source}, {target}): weight={:?} extra={:?}",
                attrs.weight, attrs.extra
            );
        }
        out
    }
}
