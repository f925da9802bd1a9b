use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info};

use motifbase::{
    audit_collisions, BaselineConfig, BaselineQueryBuilder, BaselineStrategy, DatasetLoader,
    GraphWriter,
};

const AUDIT_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StrategyArg {
    Enumeration,
    Sampling,
}

/// Build baseline motif queries from target graphs.
#[derive(Debug, Parser)]
#[command(name = "motifbase", version)]
struct Cli {
    /// Directory of reference query graphs (JSON); only their sizes are used.
    #[arg(long)]
    queries: PathBuf,
    /// Directory of target graphs (JSON).
    #[arg(long)]
    targets: PathBuf,
    /// Output directory for the selected subgraphs.
    #[arg(long)]
    out: PathBuf,
    /// JSON file with a baseline configuration; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    strategy: Option<StrategyArg>,
    /// Sampler draws per requested size (sampling strategy).
    #[arg(long)]
    samples: Option<usize>,
    #[arg(long)]
    anchored: bool,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    hash_dim: Option<usize>,
    /// Check buckets with exact isomorphism tests and log the result.
    #[arg(long)]
    audit: bool,
}

fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}

fn load_config(cli: &Cli) -> Result<BaselineConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let file = File::open(path).with_context(|| format!("open config {:?}", path))?;
            serde_json::from_reader(BufReader::new(file))
                .with_context(|| format!("parse config {:?}", path))?
        }
        None => BaselineConfig::default(),
    };

    let samples = match &config.strategy {
        BaselineStrategy::Sampling { n_samples } => cli.samples.unwrap_or(*n_samples),
        BaselineStrategy::Enumeration => cli.samples.unwrap_or(10_000),
    };
    match cli.strategy {
        Some(StrategyArg::Enumeration) => config.strategy = BaselineStrategy::Enumeration,
        Some(StrategyArg::Sampling) => {
            config.strategy = BaselineStrategy::Sampling { n_samples: samples }
        }
        None => {
            if let BaselineStrategy::Sampling { n_samples } = &mut config.strategy {
                *n_samples = samples;
            }
        }
    }
    if cli.anchored {
        config.node_anchored = true;
    }
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }
    if let Some(dim) = cli.hash_dim {
        config.hash_dim = dim;
    }
    Ok(config)
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    info!("Configuration: {:?}", config);

    let loader = DatasetLoader::new(".");
    let queries = loader
        .load_dir(&cli.queries)
        .with_context(|| format!("load query graphs from {:?}", cli.queries))?;
    let targets = loader
        .load_dir(&cli.targets)
        .with_context(|| format!("load target graphs from {:?}", cli.targets))?;
    info!(
        "Loaded {} query graphs and {} target graphs",
        queries.len(),
        targets.len()
    );

    let start = Instant::now();
    let builder = BaselineQueryBuilder::new(config);
    let baseline = builder.build(&queries, &targets)?;
    info!(
        "Selected {} baseline queries in {:?}",
        baseline.queries.len(),
        start.elapsed()
    );
    for (size, report) in &baseline.stats.per_size {
        info!(
            "Size {}: selected {} of {} requested ({} buckets)",
            size, report.selected, report.requested, report.buckets
        );
    }
    if baseline.stats.skipped_targets > 0 {
        info!("Skipped {} target graphs", baseline.stats.skipped_targets);
    }

    if cli.audit {
        let report = audit_collisions(
            &baseline.buckets,
            builder.config().node_anchored,
            AUDIT_LIMIT,
        );
        info!(
            "Audit: {} comparisons, {} split classes, {} merged classes",
            report.comparisons, report.split_classes, report.merged_classes
        );
    }

    write_queries(&cli.out, &baseline.queries)
}

fn write_queries(dir: &Path, queries: &[motifbase::GraphInstance]) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create output directory {:?}", dir))?;
    for (idx, query) in queries.iter().enumerate() {
        debug!("{}", query.describe(&format!("baseline {idx}"), 10, 10));
        let path = dir.join(format!("baseline_{idx:03}.json"));
        GraphWriter::write_to_path(query, &path)
            .with_context(|| format!("write baseline query to {:?}", path))?;
    }
    info!("Wrote {} graphs to {:?}", queries.len(), dir);
    Ok(())
}
