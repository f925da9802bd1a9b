use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use petgraph::prelude::NodeIndex;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::MotifError;
use crate::graph::{GraphInstance, GraphLoader};
use crate::wl::{CanonicalHasher, CanonicalKey};

/// Subgraph instances grouped by canonical key, in first-seen key order.
pub type MotifBuckets = IndexMap<CanonicalKey, Vec<GraphInstance>>;

#[derive(Debug, Clone, Copy)]
pub struct EnumerationConfig {
    pub max_size: usize,
    pub anchored: bool,
}

#[derive(Debug, Default)]
pub struct EnumerationOutcome {
    pub buckets: MotifBuckets,
    pub explored: usize,
    pub explored_max_size: usize,
}

/// Keep probabilities per level: `ps[i] = (1 - i / (k + 1))^1.5` for `i` in `0..=k`.
pub fn sampling_schedule(max_size: usize) -> Vec<f64> {
    let denom = (max_size + 1) as f64;
    (0..=max_size)
        .map(|i| (1.0 - i as f64 / denom).powf(1.5))
        .collect()
}

/// `floor(n * p)` plus one more with probability equal to the fractional part.
pub fn stochastic_count<R: Rng + ?Sized>(n: usize, p: f64, rng: &mut R) -> usize {
    let expected = n as f64 * p;
    let whole = expected.floor();
    let extra = usize::from(rng.gen::<f64>() < expected - whole);
    (whole as usize + extra).min(n)
}

fn subsample<R: Rng + ?Sized>(
    candidates: Vec<NodeIndex>,
    p: f64,
    rng: &mut R,
) -> Vec<NodeIndex> {
    let keep = stochastic_count(candidates.len(), p, rng);
    candidates.choose_multiple(rng, keep).copied().collect()
}

struct Frame {
    /// Candidates not yet tried at this level.
    pending: IndexSet<NodeIndex>,
    /// All candidates this level started with; siblings exclude them.
    excluded: IndexSet<NodeIndex>,
}

impl Frame {
    fn new(candidates: IndexSet<NodeIndex>) -> Self {
        Self {
            excluded: candidates.clone(),
            pending: candidates,
        }
    }
}

pub struct SubgraphEnumerator<'h> {
    hasher: &'h CanonicalHasher,
    config: EnumerationConfig,
    schedule: Vec<f64>,
}

impl<'h> SubgraphEnumerator<'h> {
    pub fn new(hasher: &'h CanonicalHasher, config: EnumerationConfig) -> Result<Self> {
        if config.max_size == 0 {
            return Err(MotifError::InvalidSize.into());
        }
        Ok(Self {
            hasher,
            config,
            schedule: sampling_schedule(config.max_size),
        })
    }

    pub fn enumerate<R: Rng + ?Sized>(
        &self,
        target: &GraphInstance,
        rng: &mut R,
    ) -> Result<EnumerationOutcome> {
        let mut outcome = EnumerationOutcome::default();
        for root in target.graph.node_indices() {
            let before = outcome.explored;
            self.extend_from_root(target, root, rng, &mut outcome)?;
            trace!(
                "Root {}: {} subgraphs",
                root.index(),
                outcome.explored - before
            );
        }
        debug!(
            "Enumerated {} subgraphs ({} of size {}) into {} buckets",
            outcome.explored,
            outcome.explored_max_size,
            self.config.max_size,
            outcome.buckets.len()
        );
        Ok(outcome)
    }

    /// All subgraphs reachable from `root`, recorded into `outcome`.
    pub fn extend_from_root<R: Rng + ?Sized>(
        &self,
        target: &GraphInstance,
        root: NodeIndex,
        rng: &mut R,
        outcome: &mut EnumerationOutcome,
    ) -> Result<()> {
        let k = self.config.max_size;
        let initial: Vec<NodeIndex> = target
            .distinct_neighbors(root)
            .into_iter()
            .filter(|nbr| *nbr > root)
            .collect();
        let initial: IndexSet<NodeIndex> =
            subsample(initial, self.schedule[1.min(k)], rng).into_iter().collect();

        let mut current: IndexSet<NodeIndex> = IndexSet::with_capacity(k);
        current.insert(root);
        self.record(target, &current, root, outcome)?;
        if k == 1 {
            return Ok(());
        }

        let mut stack = vec![Frame::new(initial)];
        while let Some(frame) = stack.last_mut() {
            let Some(candidate) = frame.pending.pop() else {
                stack.pop();
                // The root frame has no added node to undo.
                if !stack.is_empty() {
                    current.pop();
                }
                continue;
            };

            let fresh: Vec<NodeIndex> = target
                .distinct_neighbors(candidate)
                .into_iter()
                .filter(|nbr| {
                    *nbr > root && !current.contains(nbr) && !frame.excluded.contains(nbr)
                })
                .collect();
            let fresh = subsample(fresh, self.schedule[current.len() + 1], rng);
            let mut child = frame.pending.clone();
            child.extend(fresh);

            current.insert(candidate);
            self.record(target, &current, root, outcome)?;
            if current.len() == k {
                current.pop();
            } else {
                stack.push(Frame::new(child));
            }
        }
        Ok(())
    }

    fn record(
        &self,
        target: &GraphInstance,
        current: &IndexSet<NodeIndex>,
        root: NodeIndex,
        outcome: &mut EnumerationOutcome,
    ) -> Result<()> {
        let nodes: Vec<NodeIndex> = current.iter().copied().collect();
        let anchor = self.config.anchored.then_some(root);
        let subgraph = GraphLoader::induced_by_indices(target, &nodes, anchor)?;
        let key = self.hasher.key(&subgraph, self.config.anchored);
        outcome.explored += 1;
        if key.size == self.config.max_size {
            outcome.explored_max_size += 1;
        }
        outcome.buckets.entry(key).or_default().push(subgraph);
        Ok(())
    }
}
