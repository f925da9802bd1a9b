use anyhow::Result;
use log::{debug, trace};
use petgraph::prelude::NodeIndex;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::Deserialize;

use crate::error::MotifError;
use crate::graph::{GraphInstance, GraphLoader};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Upper bound on discarded draws before a request is abandoned.
    pub max_attempts: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 100_000,
        }
    }
}

/// One connected node set drawn from `graphs[graph]`. `nodes[0]` is the
/// start node and every prefix of `nodes` is connected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampledNeighborhood {
    pub graph: usize,
    pub nodes: Vec<NodeIndex>,
}

impl SampledNeighborhood {
    pub fn start(&self) -> NodeIndex {
        self.nodes[0]
    }
}

/// Draws random connected induced subgraphs by frontier expansion.
///
/// Source graphs are picked with probability proportional to their node count.
pub struct NeighborhoodSampler<'a> {
    graphs: &'a [GraphInstance],
    weights: WeightedIndex<usize>,
    largest_component: usize,
    config: SamplerConfig,
}

impl<'a> NeighborhoodSampler<'a> {
    pub fn new(graphs: &'a [GraphInstance], config: SamplerConfig) -> Result<Self> {
        let sizes: Vec<usize> = graphs.iter().map(GraphInstance::node_count).collect();
        let weights = WeightedIndex::new(&sizes).map_err(|_| MotifError::EmptyInput)?;
        let largest_component = graphs
            .iter()
            .map(GraphInstance::largest_component_size)
            .max()
            .unwrap_or_default();
        debug!(
            "Neighborhood sampler over {} graphs, largest component {}",
            graphs.len(),
            largest_component
        );
        Ok(Self {
            graphs,
            weights,
            largest_component,
            config,
        })
    }

    pub fn largest_component(&self) -> usize {
        self.largest_component
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        size: usize,
        rng: &mut R,
    ) -> Result<SampledNeighborhood> {
        if size == 0 {
            return Err(MotifError::InvalidSize.into());
        }
        if size > self.largest_component {
            return Err(MotifError::NoLargeComponent {
                requested: size,
                largest: self.largest_component,
            }
            .into());
        }

        for attempt in 0..self.config.max_attempts {
            let graph_idx = self.weights.sample(rng);
            let graph = &self.graphs[graph_idx];
            let start = NodeIndex::new(rng.gen_range(0..graph.node_count()));
            if let Some(nodes) = grow_neighborhood(graph, start, size, rng) {
                trace!("Sampled size {size} neighborhood after {} attempts", attempt + 1);
                return Ok(SampledNeighborhood {
                    graph: graph_idx,
                    nodes,
                });
            }
        }

        Err(MotifError::SamplingBudgetExhausted {
            requested: size,
            attempts: self.config.max_attempts,
        }
        .into())
    }

    /// Sample and materialize the induced subgraph, anchored at the start
    /// node and with self-loops removed.
    pub fn sample_subgraph<R: Rng + ?Sized>(
        &self,
        size: usize,
        rng: &mut R,
    ) -> Result<GraphInstance> {
        let neighborhood = self.sample(size, rng)?;
        let source = &self.graphs[neighborhood.graph];
        let mut subgraph = GraphLoader::induced_by_indices(
            source,
            &neighborhood.nodes,
            Some(neighborhood.start()),
        )?;
        subgraph.strip_self_loops();
        Ok(subgraph)
    }
}

/// Random frontier growth from `start`. The frontier holds one entry per
/// adjacency to the growing set, so well-attached nodes are favored.
/// Returns `None` when the component of `start` is smaller than `size`.
fn grow_neighborhood<R: Rng + ?Sized>(
    graph: &GraphInstance,
    start: NodeIndex,
    size: usize,
    rng: &mut R,
) -> Option<Vec<NodeIndex>> {
    let mut neigh = Vec::with_capacity(size);
    let mut visited = vec![false; graph.node_count()];
    neigh.push(start);
    visited[start.index()] = true;
    let mut frontier = graph.distinct_neighbors(start);

    while neigh.len() < size && !frontier.is_empty() {
        let pick = rng.gen_range(0..frontier.len());
        let node = frontier[pick];
        neigh.push(node);
        visited[node.index()] = true;
        frontier.extend(graph.distinct_neighbors(node));
        frontier.retain(|candidate| !visited[candidate.index()]);
    }

    (neigh.len() == size).then_some(neigh)
}
