use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use petgraph::prelude::NodeIndex;
use petgraph::visit::EdgeRef;

use crate::graph::model::{
    EdgeAttributes, GraphId, GraphInstance, LabeledGraph, NodeAttributes, RawGraph,
};

pub(crate) const ANCHOR_ATTRIBUTE: &str = "anchor";

/// High-level loader responsible for turning JSON representations into in-memory graphs.
#[derive(Debug, Default)]
pub struct GraphLoader;

impl GraphLoader {
    /// Parse a JSON string into a graph instance.
    pub fn from_json_str(json: &str) -> Result<GraphInstance> {
        let raw: RawGraph = serde_json::from_str(json)?;
        Self::from_raw_graph(raw)
    }

    /// Read JSON graph data from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<GraphInstance> {
        let mut buf = String::new();
        reader.read_to_string(&mut buf)?;
        Self::from_json_str(&buf)
    }

    pub fn from_path(path: &Path) -> Result<GraphInstance> {
        let file = File::open(path).with_context(|| format!("open graph file {:?}", path))?;
        Self::from_reader(BufReader::new(file))
            .with_context(|| format!("parse graph file {:?}", path))
    }

    /// Unattributed graph over nodes `0..node_count` named by their decimal index.
    /// Repeated pairs are kept once. Every endpoint must be below `node_count`.
    pub fn from_edge_list(node_count: usize, edges: &[(usize, usize)]) -> GraphInstance {
        let mut graph = LabeledGraph::with_capacity(node_count, edges.len());
        let mut node_lookup = IndexMap::new();
        let mut reverse_lookup = IndexMap::new();
        for i in 0..node_count {
            let idx = graph.add_node(NodeAttributes::default());
            node_lookup.insert(i.to_string(), idx);
            reverse_lookup.insert(idx, i.to_string());
        }
        for &(source, target) in edges {
            debug_assert!(
                source < node_count && target < node_count,
                "edge ({source}, {target}) outside 0..{node_count}"
            );
            if source >= node_count || target >= node_count {
                continue;
            }
            let (source, target) = (NodeIndex::new(source), NodeIndex::new(target));
            if graph.find_edge(source, target).is_none() {
                graph.add_edge(source, target, EdgeAttributes::default());
            }
        }
        GraphInstance {
            graph,
            node_lookup,
            reverse_lookup,
            graph_attributes: IndexMap::new(),
            anchor: None,
        }
    }

    /// Extract an induced subgraph over the provided node identifiers.
    pub fn induced_subgraph(
        graph: &GraphInstance,
        node_ids: &IndexSet<GraphId>,
    ) -> Result<GraphInstance> {
        let mut retain_indices = Vec::with_capacity(node_ids.len());
        for node_id in node_ids {
            let idx = graph
                .node_lookup
                .get(node_id)
                .ok_or_else(|| anyhow!("Node id '{}' not found in graph", node_id))?;
            retain_indices.push(*idx);
        }
        Self::induced_by_indices(graph, &retain_indices, None)
    }

    /// Extract the subgraph induced by `indices`, in that order, optionally
    /// marking one of them as anchor.
    pub fn induced_by_indices(
        graph: &GraphInstance,
        indices: &[NodeIndex],
        anchor: Option<NodeIndex>,
    ) -> Result<GraphInstance> {
        let mut new_graph = LabeledGraph::with_capacity(indices.len(), indices.len());
        let mut node_lookup = IndexMap::new();
        let mut reverse_lookup = IndexMap::new();
        let mut index_mapping: IndexMap<NodeIndex, NodeIndex> = IndexMap::new();

        for idx in indices {
            if index_mapping.contains_key(idx) {
                continue;
            }
            let weight = graph
                .graph
                .node_weight(*idx)
                .ok_or_else(|| anyhow!("Node index {} not found in graph", idx.index()))?;
            let new_idx = new_graph.add_node(weight.clone());
            let node_id = graph
                .reverse_lookup
                .get(idx)
                .cloned()
                .unwrap_or_else(|| idx.index().to_string());
            node_lookup.insert(node_id.clone(), new_idx);
            reverse_lookup.insert(new_idx, node_id);
            index_mapping.insert(*idx, new_idx);
        }

        for &old in index_mapping.keys() {
            for edge in graph.graph.edges(old) {
                let other = if edge.source() == old {
                    edge.target()
                } else {
                    edge.source()
                };
                // Each undirected edge is visited from both ends; keep it once.
                if other.index() < old.index() {
                    continue;
                }
                if let Some(&new_other) = index_mapping.get(&other) {
                    new_graph.add_edge(index_mapping[&old], new_other, edge.weight().clone());
                }
            }
        }

        let anchor = match anchor {
            Some(idx) => Some(
                *index_mapping
                    .get(&idx)
                    .ok_or_else(|| anyhow!("Anchor {} is not part of the subgraph", idx.index()))?,
            ),
            None => None,
        };

        Ok(GraphInstance {
            graph: new_graph,
            node_lookup,
            reverse_lookup,
            graph_attributes: graph.graph_attributes.clone(),
            anchor,
        })
    }

    fn from_raw_graph(raw: RawGraph) -> Result<GraphInstance> {
        if raw.directed {
            bail!("Directed graphs are not supported; expected an undirected graph");
        }
        let node_count = raw.nodes.len();
        let mut graph = LabeledGraph::with_capacity(node_count, raw.edges.len());
        let mut node_lookup = IndexMap::new();
        let mut reverse_lookup = IndexMap::new();
        let mut anchor = None;

        for raw_node in raw.nodes {
            if node_lookup.contains_key(&raw_node.id) {
                bail!("Duplicate node id: {}", raw_node.id);
            }
            let mut attributes = raw_node.attributes;
            let is_anchor = extract_anchor(&mut attributes);
            let label = extract_label(&mut attributes);
            let weight = extract_weight(&mut attributes);
            let node_attr = NodeAttributes {
                label,
                weight,
                extra: attributes,
            };
            let idx = graph.add_node(node_attr);
            if is_anchor {
                if anchor.is_some() {
                    bail!("More than one anchor node (second: {})", raw_node.id);
                }
                anchor = Some(idx);
            }
            node_lookup.insert(raw_node.id.clone(), idx);
            reverse_lookup.insert(idx, raw_node.id);
        }

        for raw_edge in raw.edges {
            let source_idx = *node_lookup
                .get(&raw_edge.source)
                .ok_or_else(|| anyhow!("Unknown source node id: {}", raw_edge.source))?;
            let target_idx = *node_lookup
                .get(&raw_edge.target)
                .ok_or_else(|| anyhow!("Unknown target node id: {}", raw_edge.target))?;
            // Edges form a set of unordered pairs; the first occurrence wins.
            if graph.find_edge(source_idx, target_idx).is_some() {
                debug!(
                    "Skipping repeated edge {} - {}",
                    raw_edge.source, raw_edge.target
                );
                continue;
            }

            let mut attributes = raw_edge.attributes;
            let weight = extract_weight(&mut attributes);
            let edge_attr = EdgeAttributes {
                weight,
                extra: attributes,
            };
            graph.add_edge(source_idx, target_idx, edge_attr);
        }

        Ok(GraphInstance {
            graph,
            node_lookup,
            reverse_lookup,
            graph_attributes: raw.graph_attributes,
            anchor,
        })
    }
}

fn extract_anchor(attrs: &mut IndexMap<String, serde_json::Value>) -> bool {
    match attrs.shift_remove(ANCHOR_ATTRIBUTE) {
        Some(serde_json::Value::Number(num)) => num.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Some(serde_json::Value::Bool(b)) => b,
        _ => false,
    }
}

fn extract_label(attrs: &mut IndexMap<String, serde_json::Value>) -> Option<String> {
    attrs.shift_remove("label").and_then(value_to_string)
}

fn extract_weight(attrs: &mut IndexMap<String, serde_json::Value>) -> Option<f64> {
    attrs.shift_remove("weight").and_then(|value| match value {
        serde_json::Value::Number(num) => num.as_f64(),
        serde_json::Value::String(s) => s.parse::<f64>().ok(),
        serde_json::Value::Bool(b) => Some(if b { 1.0 } else { 0.0 }),
        _ => None,
    })
}

fn value_to_string(value: serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(num) => Some(num.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_graph_json() -> String {
        r#"{
            "directed": false,
            "nodes": [
                {"id": "u", "attributes": {"label": "U", "anchor": 1}},
                {"id": "v", "attributes": {"label": "V"}},
                {"id": "w", "attributes": {"label": "W"}}
            ],
            "edges": [
                {"source": "u", "target": "v", "attributes": {"weight": 1.0}},
                {"source": "v", "target": "w", "attributes": {}}
            ]
        }"#
        .to_string()
    }

    #[test]
    fn load_json_graph_counts_match() {
        let graph = GraphLoader::from_json_str(&sample_graph_json()).expect("load graph");
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 2, "undirected edges are stored once");
        assert!(graph.node_lookup.contains_key("u"));
        assert!(graph.reverse_lookup.values().any(|id| id == "w"));
        assert_eq!(graph.anchor_id().map(String::as_str), Some("u"));
    }

    #[test]
    fn repeated_and_reversed_edges_load_once() {
        let json = r#"{
            "nodes": [{"id": "a"}, {"id": "b"}, {"id": "c"}],
            "edges": [
                {"source": "a", "target": "b", "attributes": {"weight": 2.0}},
                {"source": "b", "target": "a", "attributes": {"weight": 5.0}},
                {"source": "a", "target": "b"},
                {"source": "a", "target": "c"}
            ]
        }"#;
        let graph = GraphLoader::from_json_str(json).expect("load graph");
        assert_eq!(graph.edge_count(), 2);
        let a = graph.node_lookup["a"];
        let b = graph.node_lookup["b"];
        let edge = graph.graph.find_edge(a, b).expect("a-b edge");
        assert_eq!(graph.graph[edge].weight, Some(2.0));

        let listed = GraphLoader::from_edge_list(2, &[(0, 1), (1, 0), (0, 1)]);
        assert_eq!(listed.edge_count(), 1);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "outside")]
    fn edge_list_endpoint_out_of_range_panics_in_debug() {
        GraphLoader::from_edge_list(2, &[(0, 2)]);
    }

    #[test]
    fn directed_input_is_rejected() {
        let json = r#"{"directed": true, "nodes": [{"id": "a"}], "edges": []}"#;
        assert!(GraphLoader::from_json_str(json).is_err());
    }

    #[test]
    fn induced_subgraph_preserves_structure() {
        let graph = GraphLoader::from_json_str(&sample_graph_json()).expect("load graph");
        let mut nodes = IndexSet::new();
        nodes.insert("u".to_string());
        nodes.insert("v".to_string());
        let subgraph = GraphLoader::induced_subgraph(&graph, &nodes).expect("subgraph");
        assert_eq!(subgraph.node_count(), 2);
        assert_eq!(subgraph.edge_count(), 1);
        assert!(subgraph.node_lookup.contains_key("u"));
        assert!(subgraph.anchor.is_none());
    }

    #[test]
    fn induced_by_indices_keeps_loops_once_and_marks_anchor() {
        let graph = GraphLoader::from_edge_list(4, &[(0, 1), (1, 2), (2, 2), (2, 3)]);
        let nodes = [NodeIndex::new(2), NodeIndex::new(1)];
        let subgraph =
            GraphLoader::induced_by_indices(&graph, &nodes, Some(NodeIndex::new(2))).expect("sub");
        assert_eq!(subgraph.node_count(), 2);
        assert_eq!(subgraph.edge_count(), 2);
        assert_eq!(subgraph.anchor_id().map(String::as_str), Some("2"));
    }

    #[test]
    fn anchor_outside_subgraph_is_an_error() {
        let graph = GraphLoader::from_edge_list(3, &[(0, 1), (1, 2)]);
        let nodes = [NodeIndex::new(0), NodeIndex::new(1)];
        assert!(GraphLoader::induced_by_indices(&graph, &nodes, Some(NodeIndex::new(2))).is_err());
    }
}
