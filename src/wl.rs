use std::fmt;
use std::sync::Arc;

use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::{SplitMix64, Xoshiro256PlusPlus};

use crate::graph::GraphInstance;

pub const DEFAULT_HASH_DIM: usize = 64;
const MASK_SEED: u64 = 2019;

/// Per-coordinate masks shared by every fingerprint that must be comparable.
///
/// Masks are derived from a fixed seed, so two instances with the same
/// dimension are identical, in this process or any other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashMasks {
    masks: Arc<[u64]>,
}

impl HashMasks {
    pub fn new(dim: usize) -> Self {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(MASK_SEED);
        let masks: Vec<u64> = (0..dim.max(1)).map(|_| rng.gen::<u32>() as u64).collect();
        Self {
            masks: masks.into(),
        }
    }

    pub fn dim(&self) -> usize {
        self.masks.len()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.masks
    }
}

impl Default for HashMasks {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIM)
    }
}

/// Coordinate-wise sum of the final color vectors.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(Box<[u64]>);

impl Fingerprint {
    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().take(2).enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{value:016x}")?;
        }
        if self.0.len() > 2 {
            f.write_str("..")?;
        }
        Ok(())
    }
}

/// Bucket key: subgraph size plus fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalKey {
    pub size: usize,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Default)]
pub struct CanonicalHasher {
    masks: HashMasks,
}

impl CanonicalHasher {
    pub fn new(masks: HashMasks) -> Self {
        Self { masks }
    }

    pub fn with_dim(dim: usize) -> Self {
        Self::new(HashMasks::new(dim))
    }

    pub fn dim(&self) -> usize {
        self.masks.dim()
    }

    pub fn key(&self, graph: &GraphInstance, anchored: bool) -> CanonicalKey {
        CanonicalKey {
            size: graph.node_count(),
            fingerprint: self.fingerprint(graph, anchored),
        }
    }

    /// Fingerprint of `graph`. With `anchored` set, the anchor node (if any)
    /// starts from an all-ones vector so its position affects the result.
    pub fn fingerprint(&self, graph: &GraphInstance, anchored: bool) -> Fingerprint {
        let dim = self.dim();
        let masks = self.masks.as_slice();
        let n = graph.node_count();

        // Petgraph indices are already dense in 0..n.
        let adjacency: Vec<Vec<usize>> = graph
            .graph
            .node_indices()
            .map(|node| {
                graph
                    .distinct_neighbors(node)
                    .into_iter()
                    .map(|neighbor| neighbor.index())
                    .collect()
            })
            .collect();

        let mut colors = vec![0u64; n * dim];
        if anchored {
            if let Some(anchor) = graph.anchor.filter(|a| a.index() < n) {
                let row = anchor.index() * dim;
                colors[row..row + dim].fill(1);
            }
        }

        let mut next = vec![0u64; n * dim];
        let mut acc = vec![0u64; dim];
        for _ in 0..n {
            for (node, neighbors) in adjacency.iter().enumerate() {
                acc.copy_from_slice(&colors[node * dim..(node + 1) * dim]);
                for &neighbor in neighbors {
                    let row = &colors[neighbor * dim..(neighbor + 1) * dim];
                    for (slot, value) in acc.iter_mut().zip(row) {
                        *slot = slot.wrapping_add(*value);
                    }
                }
                let out = &mut next[node * dim..(node + 1) * dim];
                for ((slot, value), mask) in out.iter_mut().zip(&acc).zip(masks) {
                    *slot = mix(*value) ^ mask;
                }
            }
            std::mem::swap(&mut colors, &mut next);
        }

        let mut summary = vec![0u64; dim];
        for row in colors.chunks_exact(dim) {
            for (slot, value) in summary.iter_mut().zip(row) {
                *slot = slot.wrapping_add(*value);
            }
        }
        Fingerprint(summary.into_boxed_slice())
    }
}

fn mix(value: u64) -> u64 {
    SplitMix64::seed_from_u64(value).next_u64()
}
