use petgraph::visit::EdgeRef;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::Value;

use crate::graph::construction::ANCHOR_ATTRIBUTE;
use crate::graph::model::{
    EdgeAttributes, GraphInstance, NodeAttributes, RawEdge, RawGraph, RawNode,
};

/// Helper for exporting graphs back to JSON files compatible with the loader format.
pub struct GraphWriter;

impl GraphWriter {
    pub fn to_raw_graph(graph: &GraphInstance) -> RawGraph {
        let mut nodes = Vec::with_capacity(graph.node_count());
        for idx in graph.graph.node_indices() {
            let Some(id) = graph.reverse_lookup.get(&idx) else {
                continue;
            };
            let mut attributes = graph
                .graph
                .node_weight(idx)
                .map(build_node_attributes)
                .unwrap_or_default();
            if let Some(anchor) = graph.anchor {
                let flag = if anchor == idx { 1 } else { 0 };
                attributes.insert(ANCHOR_ATTRIBUTE.to_string(), Value::from(flag));
            }
            nodes.push(RawNode {
                id: id.clone(),
                attributes,
            });
        }

        let mut edges = Vec::with_capacity(graph.edge_count());
        for edge_ref in graph.graph.edge_references() {
            let (Some(source), Some(target)) = (
                graph.reverse_lookup.get(&edge_ref.source()),
                graph.reverse_lookup.get(&edge_ref.target()),
            ) else {
                continue;
            };
            edges.push(RawEdge {
                source: source.clone(),
                target: target.clone(),
                attributes: build_edge_attributes(edge_ref.weight()),
            });
        }

        RawGraph {
            nodes,
            edges,
            graph_attributes: graph.graph_attributes.clone(),
            directed: false,
        }
    }

    pub fn to_json_string(graph: &GraphInstance) -> Result<String> {
        let raw = Self::to_raw_graph(graph);
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    pub fn write_to_path(graph: &GraphInstance, path: &Path) -> Result<()> {
        let json = Self::to_json_string(graph)?;
        let mut file =
            File::create(path).with_context(|| format!("create graph file {:?}", path))?;
        file.write_all(json.as_bytes())
            .with_context(|| format!("write graph file {:?}", path))?;
        Ok(())
    }
}

fn build_node_attributes(node: &NodeAttributes) -> IndexMap<String, Value> {
    let mut map = IndexMap::new();
    if let Some(label) = &node.label {
        map.insert("label".to_string(), Value::String(label.clone()));
    }
    if let Some(weight) = node.weight {
        if let Some(number) = serde_json::Number::from_f64(weight) {
            map.insert("weight".to_string(), Value::Number(number));
        }
    }
    for (key, value) in &node.extra {
        map.insert(key.clone(), value.clone());
    }
    map
}

fn build_edge_attributes(edge: &EdgeAttributes) -> IndexMap<String, Value> {
    let mut map = IndexMap::new();
    if let Some(weight) = edge.weight {
        if let Some(number) = serde_json::Number::from_f64(weight) {
            map.insert("weight".to_string(), Value::Number(number));
        }
    }
    for (key, value) in &edge.extra {
        map.insert(key.clone(), value.clone());
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphLoader;
    use petgraph::prelude::NodeIndex;

    #[test]
    fn anchor_marker_survives_export() {
        let graph = GraphLoader::from_edge_list(3, &[(0, 1), (1, 2)]);
        let nodes: Vec<NodeIndex> = graph.graph.node_indices().collect();
        let anchored =
            GraphLoader::induced_by_indices(&graph, &nodes, Some(NodeIndex::new(1))).expect("sub");

        let json = GraphWriter::to_json_string(&anchored).expect("serialize");
        let reloaded = GraphLoader::from_json_str(&json).expect("reload");

        assert_eq!(reloaded.anchor_id().map(String::as_str), Some("1"));
        assert_eq!(reloaded.edge_count(), 2);
        let raw = GraphWriter::to_raw_graph(&anchored);
        let flags: Vec<_> = raw
            .nodes
            .iter()
            .map(|node| node.attributes[ANCHOR_ATTRIBUTE].as_i64())
            .collect();
        assert_eq!(flags, vec![Some(0), Some(1), Some(0)]);
    }

    #[test]
    fn unanchored_graph_has_no_marker() {
        let graph = GraphLoader::from_edge_list(2, &[(0, 1)]);
        let raw = GraphWriter::to_raw_graph(&graph);
        assert!(raw
            .nodes
            .iter()
            .all(|node| !node.attributes.contains_key(ANCHOR_ATTRIBUTE)));
    }
}
