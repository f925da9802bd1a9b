use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::graph::{GraphInstance, GraphLoader};

/// Loads graph collections stored as one JSON file per graph.
#[derive(Debug, Clone)]
pub struct DatasetLoader {
    root: PathBuf,
}

impl DatasetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn load(&self, relative: impl AsRef<Path>) -> Result<GraphInstance> {
        let path = self.root.join(relative);
        GraphLoader::from_path(&path).with_context(|| format!("load dataset from {:?}", path))
    }

    /// Every `*.json` graph directly under `root/relative`, sorted by file name.
    pub fn load_dir(&self, relative: impl AsRef<Path>) -> Result<Vec<GraphInstance>> {
        let dir = self.root.join(relative);
        let paths = collect_graph_files(&dir)
            .with_context(|| format!("enumerate graph files in {:?}", dir))?;
        let mut graphs = Vec::with_capacity(paths.len());
        for path in paths {
            let graph = GraphLoader::from_path(&path)
                .with_context(|| format!("load dataset graph {:?}", path))?;
            debug!(
                "Loaded {:?}: {} nodes, {} edges",
                path.file_name().unwrap_or_else(|| OsStr::new("<unknown>")),
                graph.node_count(),
                graph.edge_count()
            );
            graphs.push(graph);
        }
        Ok(graphs)
    }
}

pub fn collect_graph_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)?;
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(OsStr::to_str)
                    .map(|ext| ext.eq_ignore_ascii_case("json"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}
