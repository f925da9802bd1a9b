use indexmap::IndexMap;
use log::debug;
use petgraph::algo::isomorphism::is_isomorphic_matching;
use petgraph::graph::UnGraph;

use crate::enumeration::MotifBuckets;
use crate::graph::GraphInstance;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollisionReport {
    pub comparisons: usize,
    /// Pairs of distinct keys whose representatives are isomorphic.
    pub split_classes: usize,
    /// Bucket members not isomorphic to their bucket's first instance.
    pub merged_classes: usize,
}

/// Structure plus anchor flag; attributes are ignored like in the hash.
fn shape(graph: &GraphInstance) -> UnGraph<bool, ()> {
    graph
        .graph
        .map(|idx, _| graph.anchor == Some(idx), |_, _| ())
}

fn isomorphic(left: &UnGraph<bool, ()>, right: &UnGraph<bool, ()>, anchored: bool) -> bool {
    is_isomorphic_matching(
        left,
        right,
        |a: &bool, b: &bool| !anchored || a == b,
        |_: &(), _: &()| true,
    )
}

/// Audit at most `limit` comparisons of each kind.
pub fn audit_collisions(buckets: &MotifBuckets, anchored: bool, limit: usize) -> CollisionReport {
    let mut report = CollisionReport::default();

    let mut by_size: IndexMap<usize, Vec<UnGraph<bool, ()>>> = IndexMap::new();
    let mut within = 0usize;
    for (key, instances) in buckets {
        let Some(first) = instances.first() else {
            continue;
        };
        let first_shape = shape(first);
        for other in instances.iter().skip(1) {
            if within >= limit {
                break;
            }
            within += 1;
            report.comparisons += 1;
            if !isomorphic(&first_shape, &shape(other), anchored) {
                report.merged_classes += 1;
                debug!("Bucket of size {} ({}) mixes classes", key.size, key.fingerprint);
            }
        }
        by_size.entry(key.size).or_default().push(first_shape);
    }

    let mut across = 0usize;
    'sizes: for shapes in by_size.values() {
        for (i, left) in shapes.iter().enumerate() {
            for right in &shapes[i + 1..] {
                if across >= limit {
                    break 'sizes;
                }
                across += 1;
                report.comparisons += 1;
                if isomorphic(left, right, anchored) {
                    report.split_classes += 1;
                }
            }
        }
    }

    report
}
