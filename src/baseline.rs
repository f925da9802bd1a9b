use anyhow::{Context, Result};
use indexmap::IndexMap;
use log::{debug, info, warn};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;
use serde::Deserialize;

use crate::enumeration::{
    EnumerationConfig, EnumerationOutcome, MotifBuckets, SubgraphEnumerator,
};
use crate::error::MotifError;
use crate::graph::GraphInstance;
use crate::sampling::{NeighborhoodSampler, SamplerConfig};
use crate::wl::{CanonicalHasher, HashMasks, DEFAULT_HASH_DIM};

const DEFAULT_SAMPLES: usize = 10_000;
const SELECTION_STREAM: u64 = 0x5eed_5e1e_c7ed_0001;

fn default_samples() -> usize {
    DEFAULT_SAMPLES
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BaselineStrategy {
    /// Bounded ESU over every target graph.
    Enumeration,
    /// Repeated neighborhood sampling per requested size.
    Sampling {
        #[serde(default = "default_samples")]
        n_samples: usize,
    },
}

impl Default for BaselineStrategy {
    fn default() -> Self {
        Self::Sampling {
            n_samples: DEFAULT_SAMPLES,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub strategy: BaselineStrategy,
    pub node_anchored: bool,
    pub hash_dim: usize,
    pub seed: u64,
    pub sampler: SamplerConfig,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            strategy: BaselineStrategy::default(),
            node_anchored: false,
            hash_dim: DEFAULT_HASH_DIM,
            seed: 42,
            sampler: SamplerConfig::default(),
        }
    }
}

/// Number of reference graphs per node count, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeHistogram(IndexMap<usize, usize>);

impl SizeHistogram {
    pub fn from_queries(queries: &[GraphInstance]) -> Self {
        let mut counts = IndexMap::new();
        for query in queries {
            *counts.entry(query.node_count()).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Drop the entry for graphs without nodes, which no strategy can supply.
    fn without_empty_graphs(&self) -> Self {
        let mut counts = self.0.clone();
        if let Some(count) = counts.shift_remove(&0) {
            warn!("Ignoring {} reference graphs without nodes", count);
        }
        Self(counts)
    }

    pub fn max_size(&self) -> Option<usize> {
        self.0.keys().copied().max()
    }

    pub fn count(&self, size: usize) -> usize {
        self.0.get(&size).copied().unwrap_or_default()
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.0.iter().map(|(size, count)| (*size, *count))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SizeReport {
    pub requested: usize,
    pub selected: usize,
    pub buckets: usize,
}

#[derive(Debug, Clone, Default)]
pub struct BaselineStats {
    pub subgraphs_explored: usize,
    pub max_size_explored: usize,
    pub buckets_found: usize,
    pub skipped_targets: usize,
    pub per_size: IndexMap<usize, SizeReport>,
}

#[derive(Debug)]
pub struct BaselineQueries {
    pub queries: Vec<GraphInstance>,
    pub buckets: MotifBuckets,
    pub stats: BaselineStats,
}

/// Picks canonically distinct subgraph instances from target graphs so that
/// the output size histogram follows a reference query set.
pub struct BaselineQueryBuilder {
    config: BaselineConfig,
    hasher: CanonicalHasher,
}

impl BaselineQueryBuilder {
    pub fn new(config: BaselineConfig) -> Self {
        let hasher = CanonicalHasher::new(HashMasks::new(config.hash_dim));
        Self { config, hasher }
    }

    pub fn config(&self) -> &BaselineConfig {
        &self.config
    }

    pub fn build(
        &self,
        queries: &[GraphInstance],
        targets: &[GraphInstance],
    ) -> Result<BaselineQueries> {
        let histogram = SizeHistogram::from_queries(queries);
        self.build_for_histogram(&histogram, targets)
    }

    pub fn build_for_histogram(
        &self,
        histogram: &SizeHistogram,
        targets: &[GraphInstance],
    ) -> Result<BaselineQueries> {
        if targets.is_empty() {
            return Err(MotifError::EmptyInput.into());
        }
        let histogram = &histogram.without_empty_graphs();
        let mut stats = BaselineStats::default();
        let Some(max_size) = histogram.max_size() else {
            return Ok(BaselineQueries {
                queries: Vec::new(),
                buckets: MotifBuckets::new(),
                stats,
            });
        };

        let buckets = match &self.config.strategy {
            BaselineStrategy::Enumeration => {
                self.enumerate_targets(targets, max_size, &mut stats)?
            }
            BaselineStrategy::Sampling { n_samples } => {
                self.sample_targets(histogram, targets, *n_samples, &mut stats)?
            }
        };
        stats.buckets_found = buckets.len();
        info!(
            "{} subgraphs explored ({} of max size {}), {} buckets",
            stats.subgraphs_explored, stats.max_size_explored, max_size, stats.buckets_found
        );

        let mut rng = stream_rng(self.config.seed, SELECTION_STREAM);
        let mut queries = Vec::with_capacity(histogram.total());
        for (size, count) in histogram.iter() {
            let available = buckets.keys().filter(|key| key.size == size).count();
            let chosen = select_representatives(&buckets, size, count, &mut rng);
            if chosen.len() < count {
                warn!(
                    "Size {}: only {} of {} requested buckets available",
                    size,
                    chosen.len(),
                    count
                );
            }
            stats.per_size.insert(
                size,
                SizeReport {
                    requested: count,
                    selected: chosen.len(),
                    buckets: available,
                },
            );
            queries.extend(chosen);
        }

        Ok(BaselineQueries {
            queries,
            buckets,
            stats,
        })
    }

    fn enumerate_targets(
        &self,
        targets: &[GraphInstance],
        max_size: usize,
        stats: &mut BaselineStats,
    ) -> Result<MotifBuckets> {
        let enumerator = SubgraphEnumerator::new(
            &self.hasher,
            EnumerationConfig {
                max_size,
                anchored: self.config.node_anchored,
            },
        )?;
        let seed = self.config.seed;

        let outcomes: Vec<Result<EnumerationOutcome>> = targets
            .par_iter()
            .enumerate()
            .map(|(idx, target)| {
                let mut rng = stream_rng(seed, idx as u64);
                enumerator
                    .enumerate(target, &mut rng)
                    .with_context(|| format!("enumerate subgraphs of target {idx}"))
            })
            .collect();

        let mut merged = MotifBuckets::new();
        for (idx, outcome) in outcomes.into_iter().enumerate() {
            let outcome = match outcome {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("Skipping target {}: {:#}", idx, err);
                    stats.skipped_targets += 1;
                    continue;
                }
            };
            debug!(
                "Target {}: {} subgraphs, {} buckets",
                idx,
                outcome.explored,
                outcome.buckets.len()
            );
            stats.subgraphs_explored += outcome.explored;
            stats.max_size_explored += outcome.explored_max_size;
            for (key, instances) in outcome.buckets {
                merged.entry(key).or_default().extend(instances);
            }
        }
        Ok(merged)
    }

    fn sample_targets(
        &self,
        histogram: &SizeHistogram,
        targets: &[GraphInstance],
        n_samples: usize,
        stats: &mut BaselineStats,
    ) -> Result<MotifBuckets> {
        let sampler = NeighborhoodSampler::new(targets, self.config.sampler.clone())?;
        let seed = self.config.seed;
        let max_size = histogram.max_size().unwrap_or_default();
        let mut buckets = MotifBuckets::new();

        for (size, _) in histogram.iter() {
            let drawn: Vec<GraphInstance> = (0..n_samples)
                .into_par_iter()
                .map(|trial| {
                    let mut rng = stream_rng(seed, ((size as u64) << 32) | trial as u64);
                    sampler.sample_subgraph(size, &mut rng)
                })
                .collect::<Result<_>>()
                .with_context(|| format!("sample subgraphs of size {size}"))?;

            let before = buckets.len();
            for subgraph in drawn {
                let key = self.hasher.key(&subgraph, self.config.node_anchored);
                stats.subgraphs_explored += 1;
                if size == max_size {
                    stats.max_size_explored += 1;
                }
                buckets.entry(key).or_default().push(subgraph);
            }
            debug!(
                "Size {}: {} samples, {} buckets",
                size,
                n_samples,
                buckets.len() - before
            );
        }
        Ok(buckets)
    }
}

/// Independent generator for one unit of work (a target, a sampling trial).
fn stream_rng(seed: u64, stream: u64) -> Xoshiro256PlusPlus {
    Xoshiro256PlusPlus::seed_from_u64(seed.wrapping_add(stream))
}

/// One random instance from each of the `count` most populated buckets of
/// `size`. Ties keep bucket insertion order.
pub fn select_representatives<R: Rng + ?Sized>(
    buckets: &MotifBuckets,
    size: usize,
    count: usize,
    rng: &mut R,
) -> Vec<GraphInstance> {
    let mut ranked: Vec<&Vec<GraphInstance>> = buckets
        .iter()
        .filter(|(key, _)| key.size == size)
        .map(|(_, instances)| instances)
        .collect();
    ranked.sort_by(|a, b| b.len().cmp(&a.len()));

    ranked
        .into_iter()
        .take(count)
        .filter_map(|instances| {
            debug!("Size {}: bucket with {} instances", size, instances.len());
            instances.choose(rng).cloned()
        })
        .collect()
}
