use motifbase::{
    BaselineConfig, BaselineQueryBuilder, BaselineStrategy, CanonicalHasher, EnumerationConfig,
    GraphInstance, GraphLoader, MotifError, NeighborhoodSampler, SamplerConfig, SizeHistogram,
    SubgraphEnumerator,
};
use petgraph::prelude::NodeIndex;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

fn cycle(n: usize) -> GraphInstance {
    let edges: Vec<_> = (0..n).map(|i| (i, (i + 1) % n)).collect();
    GraphLoader::from_edge_list(n, &edges)
}

/// Square 0-1-2-3 with a roof node 4 on top of edge 2-3.
fn house() -> GraphInstance {
    GraphLoader::from_edge_list(5, &[(0, 1), (1, 2), (2, 3), (3, 0), (2, 4), (3, 4)])
}

fn reference(sizes: &[usize]) -> Vec<GraphInstance> {
    sizes.iter().map(|&n| cycle(n.max(1))).collect()
}

fn signature(graphs: &[GraphInstance]) -> Vec<(Vec<String>, Option<String>)> {
    graphs
        .iter()
        .map(|g| {
            let ids: Vec<String> = g.node_lookup.keys().cloned().collect();
            (ids, g.anchor_id().cloned())
        })
        .collect()
}

fn assert_matches_histogram(result: &motifbase::BaselineQueries, histogram: &SizeHistogram) {
    for (size, count) in histogram.iter() {
        let produced = result
            .queries
            .iter()
            .filter(|q| q.node_count() == size)
            .count();
        let report = &result.stats.per_size[&size];
        assert!(produced <= count, "size {size}: {produced} > {count}");
        assert_eq!(produced, report.selected);
        assert_eq!(report.selected, count.min(report.buckets));
    }
    assert!(result.queries.iter().all(GraphInstance::is_connected));
}

#[test]
fn sampling_strategy_follows_reference_histogram() {
    let queries = reference(&[3, 3, 4, 5]);
    let targets = vec![house(), cycle(8), house()];
    let config = BaselineConfig {
        strategy: BaselineStrategy::Sampling { n_samples: 400 },
        node_anchored: true,
        ..BaselineConfig::default()
    };
    let builder = BaselineQueryBuilder::new(config);
    let result = builder.build(&queries, &targets).expect("baseline");

    let histogram = SizeHistogram::from_queries(&queries);
    assert_matches_histogram(&result, &histogram);
    assert_eq!(result.stats.subgraphs_explored, 400 * 3);
    assert_eq!(result.stats.max_size_explored, 400);
    // Anchored size-3 shapes: path from an end, path from the middle, triangle.
    assert_eq!(result.stats.per_size[&3].selected, 2);
    assert!(result.queries.iter().all(|q| q.anchor.is_some()));
}

#[test]
fn enumeration_strategy_follows_reference_histogram() {
    let queries = reference(&[2, 3, 3]);
    let targets: Vec<GraphInstance> = (0..6).map(|_| house()).collect();
    let config = BaselineConfig {
        strategy: BaselineStrategy::Enumeration,
        ..BaselineConfig::default()
    };
    let builder = BaselineQueryBuilder::new(config);
    let result = builder.build(&queries, &targets).expect("baseline");

    let histogram = SizeHistogram::from_queries(&queries);
    assert_matches_histogram(&result, &histogram);
    assert_eq!(result.stats.per_size[&2].selected, 1);
    assert_eq!(result.stats.skipped_targets, 0);
    assert!(result.stats.subgraphs_explored >= 5 * targets.len());
}

#[test]
fn fixed_seed_reproduces_output() {
    let queries = reference(&[3, 4, 4]);
    let targets = vec![house(), cycle(7)];
    for strategy in [
        BaselineStrategy::Enumeration,
        BaselineStrategy::Sampling { n_samples: 200 },
    ] {
        let config = BaselineConfig {
            strategy,
            node_anchored: true,
            seed: 1234,
            ..BaselineConfig::default()
        };
        let first = BaselineQueryBuilder::new(config.clone())
            .build(&queries, &targets)
            .expect("first run");
        let second = BaselineQueryBuilder::new(config)
            .build(&queries, &targets)
            .expect("second run");
        assert_eq!(signature(&first.queries), signature(&second.queries));
    }
}

#[test]
fn unsatisfiable_size_aborts_sampling() {
    let queries = reference(&[5]);
    let targets = vec![GraphLoader::from_edge_list(8, &[(0, 1), (1, 2), (4, 5), (5, 6)])];
    let config = BaselineConfig {
        strategy: BaselineStrategy::Sampling { n_samples: 10 },
        ..BaselineConfig::default()
    };
    let err = BaselineQueryBuilder::new(config)
        .build(&queries, &targets)
        .expect_err("no component of size 5");
    assert_eq!(
        err.downcast_ref::<MotifError>(),
        Some(&MotifError::NoLargeComponent {
            requested: 5,
            largest: 3
        })
    );
}

#[test]
fn unsatisfiable_size_underfills_enumeration() {
    let queries = reference(&[2, 5]);
    // A star with three leaves: at least two of them survive the root subsample.
    let targets = vec![GraphLoader::from_edge_list(4, &[(0, 1), (0, 2), (0, 3)])];
    let config = BaselineConfig {
        strategy: BaselineStrategy::Enumeration,
        ..BaselineConfig::default()
    };
    let result = BaselineQueryBuilder::new(config)
        .build(&queries, &targets)
        .expect("enumeration tolerates small targets");
    assert_eq!(result.stats.per_size[&5].selected, 0);
    assert_eq!(result.stats.per_size[&2].selected, 1);
    assert_eq!(result.queries.len(), 1);
}

#[test]
fn six_cycle_sampler_reaches_node_zero() {
    let graphs = vec![cycle(6)];
    let sampler = NeighborhoodSampler::new(&graphs, SamplerConfig::default()).expect("sampler");
    let zero = graphs[0].node_lookup["0"];
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(6);
    let mut containing_zero = 0;
    for _ in 0..100 {
        let drawn = sampler.sample(4, &mut rng).expect("sample");
        let subgraph =
            GraphLoader::induced_by_indices(&graphs[0], &drawn.nodes, Some(drawn.start()))
                .expect("induced");
        assert_eq!(subgraph.node_count(), 4);
        assert!(subgraph.is_connected());
        if drawn.nodes.contains(&zero) {
            containing_zero += 1;
        }
    }
    assert!(containing_zero > 0);
}

#[test]
fn six_cycle_enumeration_records_path_from_root_zero() {
    let graph = cycle(6);
    let hasher = CanonicalHasher::default();
    let enumerator = SubgraphEnumerator::new(
        &hasher,
        EnumerationConfig {
            max_size: 4,
            anchored: true,
        },
    )
    .expect("enumerator");

    let found = (0..50u64).any(|seed| {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let outcome = enumerator.enumerate(&graph, &mut rng).expect("enumerate");
        outcome
            .buckets
            .iter()
            .filter(|(key, _)| key.size == 4)
            .flat_map(|(_, instances)| instances)
            .any(|instance| {
                instance.anchor_id().map(String::as_str) == Some("0") && instance.edge_count() == 3
            })
    });
    assert!(found);
}

#[test]
fn disjoint_triangles_fall_into_one_bucket() {
    let graph = GraphLoader::from_edge_list(6, &[(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3)]);
    let hasher = CanonicalHasher::default();
    let first = GraphLoader::induced_by_indices(
        &graph,
        &[NodeIndex::new(0), NodeIndex::new(1), NodeIndex::new(2)],
        Some(NodeIndex::new(0)),
    )
    .expect("first");
    let second = GraphLoader::induced_by_indices(
        &graph,
        &[NodeIndex::new(3), NodeIndex::new(4), NodeIndex::new(5)],
        Some(NodeIndex::new(3)),
    )
    .expect("second");
    assert_eq!(hasher.key(&first, true), hasher.key(&second, true));

    let enumerator = SubgraphEnumerator::new(
        &hasher,
        EnumerationConfig {
            max_size: 3,
            anchored: true,
        },
    )
    .expect("enumerator");
    let both_roots = (0..50u64).any(|seed| {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let outcome = enumerator.enumerate(&graph, &mut rng).expect("enumerate");
        let triangles: Vec<_> = outcome
            .buckets
            .iter()
            .filter(|(key, _)| key.size == 3)
            .collect();
        if triangles.len() != 1 {
            return false;
        }
        let anchors: Vec<&str> = triangles[0]
            .1
            .iter()
            .filter_map(|instance| instance.anchor_id().map(String::as_str))
            .collect();
        anchors.contains(&"0") && anchors.contains(&"3")
    });
    assert!(both_roots);
}
