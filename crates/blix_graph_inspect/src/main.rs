// SPDX-License-Identifier: MIT OR Apache-2.0
//! Blix graph inspector.
//!
//! Rebuilds a saved graph snapshot against a toolbox registry and reports
//! which nodes and edges survived validation.
//!
//! ```text
//! blix-graph-inspect <toolbox.ron> <snapshot.json> [--config graph.ron] [--emit]
//! ```

use blix_graph::{ConfigError, GraphConfig, GraphSnapshot, GraphStore, SnapshotError, ToolboxRegistry};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Debug, Error)]
enum InspectError {
    #[error("usage: blix-graph-inspect <toolbox.ron> <snapshot.json> [--config graph.ron] [--emit]")]
    Usage,

    #[error("Failed to read {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid toolbox registry: {0}")]
    Toolbox(#[from] ron::error::SpannedError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

#[derive(Debug)]
struct Args {
    toolbox: PathBuf,
    snapshot: PathBuf,
    config: Option<PathBuf>,
    emit: bool,
}

impl Args {
    fn parse(mut args: impl Iterator<Item = String>) -> Result<Self, InspectError> {
        let mut positional = Vec::new();
        let mut config = None;
        let mut emit = false;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => config = Some(PathBuf::from(args.next().ok_or(InspectError::Usage)?)),
                "--emit" => emit = true,
                _ if arg.starts_with("--") => return Err(InspectError::Usage),
                _ => positional.push(PathBuf::from(arg)),
            }
        }

        let [toolbox, snapshot] = <[PathBuf; 2]>::try_from(positional).map_err(|_| InspectError::Usage)?;
        Ok(Self {
            toolbox,
            snapshot,
            config,
            emit,
        })
    }
}

fn read(path: &Path) -> Result<String, InspectError> {
    std::fs::read_to_string(path).map_err(|source| InspectError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn run(args: Args) -> Result<bool, InspectError> {
    let config = match &args.config {
        Some(path) => GraphConfig::load(path)?,
        None => GraphConfig::default(),
    };
    let toolbox: ToolboxRegistry = ron::from_str(&read(&args.toolbox)?)?;
    tracing::info!("Toolbox has {} node types", toolbox.len());

    let snapshot = GraphSnapshot::from_json(&read(&args.snapshot)?)?;
    let mut store = GraphStore::with_config(config);
    let (id, report) = store.load_graph(&snapshot, &toolbox)?;

    println!(
        "loaded {} of {} nodes, {} of {} edges",
        report.nodes_loaded,
        snapshot.nodes.len(),
        report.edges_loaded,
        snapshot.edges.len()
    );
    for item in &report.skipped {
        println!("  skipped {item}");
    }

    if let Some(graph) = store.graph(id) {
        println!("evaluation order:");
        for node_id in graph.topological_order() {
            if let Some(node) = graph.node(node_id) {
                println!("  {} {}", node_id, node.signature());
            }
        }
    }

    if args.emit {
        if let Some(json) = store.snapshot_json(id) {
            println!("{}", json?);
        }
    }
    Ok(report.is_clean())
}

fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("blix_graph=debug,blix_graph_inspect=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = Args::parse(std::env::args().skip(1)).and_then(run);
    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            tracing::error!("{e}");
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
