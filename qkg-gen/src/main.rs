use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use thiserror::Error;

use qkg_core::graph::{build_dependency_graph, KnowledgeBuildConfig, KnowledgeGraphBuilder};
use qkg_core::morphology::Corpus;
use qkg_core::scoring::{self, ScoringConfig};
use qkg_core::{codec, stats};

mod data_loader;
mod debug;

#[derive(Parser)]
#[command(name = "qkg-gen")]
#[command(about = "Builds and inspects the Quranic knowledge graph", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the compressed graph file from an offline bundle and morphology TSV
    BuildGraph {
        /// Offline data bundle root (§6.1)
        #[arg(long)]
        bundle: PathBuf,
        /// Morphology TSV (§6.2)
        #[arg(long)]
        morphology: PathBuf,
        /// Output `.cbor.zst` path
        #[arg(long)]
        out: PathBuf,
        /// Optional GraphML dump for R&D visualization
        #[arg(long)]
        debug_graphml: Option<PathBuf>,
        /// Fail instead of filling in unweighted `auto` edges when a target
        /// mixes weighted and unweighted incoming edges
        #[arg(long)]
        strict_compile: bool,
    },
    /// Build the relational content store from the same inputs
    BuildContent {
        #[arg(long)]
        bundle: PathBuf,
        #[arg(long)]
        morphology: PathBuf,
        /// Output SQLite database path
        #[arg(long)]
        out: PathBuf,
    },
    /// Print the header, node-type histogram, and edge-attr histogram of a graph file
    InspectGraph {
        path: PathBuf,
    },
}

/// Tags a failure with the exit-code family of §6.5/§7, independent of
/// which crate error enum produced it.
#[derive(Debug, Error)]
enum CliError {
    #[error("{0:#}")]
    InputRead(anyhow::Error),
    #[error("{0:#}")]
    InvariantViolation(anyhow::Error),
    #[error("{0:#}")]
    OutputWrite(anyhow::Error),
}

impl CliError {
    fn exit_code(&self) -> i32 {
        match self {
            CliError::InputRead(_) => 3,
            CliError::InvariantViolation(_) => 4,
            CliError::OutputWrite(_) => 5,
        }
    }
}

trait InputRead<T> {
    fn input_read(self) -> Result<T, CliError>;
}
impl<T, E: Into<anyhow::Error>> InputRead<T> for Result<T, E> {
    fn input_read(self) -> Result<T, CliError> {
        self.map_err(|e| CliError::InputRead(e.into()))
    }
}

trait Invariant<T> {
    fn invariant(self) -> Result<T, CliError>;
}
impl<T, E: Into<anyhow::Error>> Invariant<T> for Result<T, E> {
    fn invariant(self) -> Result<T, CliError> {
        self.map_err(|e| CliError::InvariantViolation(e.into()))
    }
}

trait OutputWrite<T> {
    fn output_write(self) -> Result<T, CliError>;
}
impl<T, E: Into<anyhow::Error>> OutputWrite<T> for Result<T, E> {
    fn output_write(self) -> Result<T, CliError> {
        self.map_err(|e| CliError::OutputWrite(e.into()))
    }
}

fn load_morphology(path: &PathBuf) -> Result<Corpus, CliError> {
    let file = File::open(path).input_read()?;
    Corpus::parse(BufReader::new(file)).input_read()
}

fn build_graph(
    bundle: PathBuf,
    morphology: PathBuf,
    out: PathBuf,
    debug_graphml: Option<PathBuf>,
    strict_compile: bool,
) -> Result<(), CliError> {
    let quran = data_loader::load_quran(&bundle).input_read()?;
    let corpus = load_morphology(&morphology)?;

    tracing::info!(
        chapters = quran.chapters.len(),
        "offline bundle and morphology loaded"
    );

    let mut reg = build_dependency_graph(&quran, &corpus);
    tracing::info!(
        nodes = reg.graph.node_count(),
        edges = reg.graph.edge_count(),
        "dependency graph built"
    );

    let config = KnowledgeBuildConfig {
        strict_compile,
        ..KnowledgeBuildConfig::default()
    };
    let kmgr = KnowledgeGraphBuilder::new(config).build(&mut reg, &quran).invariant()?;

    scoring::score(&mut reg, &kmgr, ScoringConfig::default()).invariant()?;

    let report = stats::compute(&reg).invariant()?;
    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }

    let export_stats = codec::export_to_path(&reg.graph, &out, codec::DEFAULT_ZSTD_LEVEL)
        .output_write()?;
    tracing::info!(
        nodes = export_stats.nodes_exported,
        edges = export_stats.edges_exported,
        path = %out.display(),
        "graph exported"
    );

    if let Some(graphml_path) = debug_graphml {
        debug::save_graphml(&reg.graph, &graphml_path).output_write()?;
        tracing::info!(path = %graphml_path.display(), "debug GraphML written");
    }

    Ok(())
}

fn build_content(bundle: PathBuf, morphology: PathBuf, out: PathBuf) -> Result<(), CliError> {
    let quran = data_loader::load_quran(&bundle).input_read()?;
    let corpus = load_morphology(&morphology)?;

    qkg_storage::build_content_store(&out, &quran, &corpus).map_err(|err| match &err {
        qkg_storage::StorageError::Io(_) => CliError::OutputWrite(err.into()),
        qkg_storage::StorageError::MissingRequiredFile(_) => CliError::InputRead(err.into()),
        _ => CliError::InvariantViolation(err.into()),
    })?;

    tracing::info!(path = %out.display(), "content store built");
    Ok(())
}

fn inspect_graph(path: PathBuf) -> Result<(), CliError> {
    let file = File::open(&path).input_read()?;
    let result = codec::import(BufReader::new(file)).map_err(|err| match &err {
        codec::CodecError::Io(_) | codec::CodecError::Decode(_) => CliError::InputRead(err.into()),
        _ => CliError::InvariantViolation(err.into()),
    })?;

    println!("format version : {}", result.header.format_version);
    println!("created at     : {}", result.header.created_at);
    println!(
        "nodes          : {} (declared {})",
        result.stats.nodes_imported, result.header.declared_node_count
    );
    println!(
        "edges          : {} (declared {})",
        result.stats.edges_imported, result.header.declared_edge_count
    );
    if result.stats.node_count_mismatch || result.stats.edge_count_mismatch {
        println!("warning: record count mismatch against the declared header");
    }

    let report = stats::compute(&result.registry).invariant()?;

    println!("\nnode counts by type:");
    for (kind, count) in &report.node_count_by_type {
        println!("  {kind:<16} {count}");
    }

    println!("\nedge counts by type:");
    for (kind, count) in &report.edge_count_by_type {
        println!("  {kind:<16} {count}");
    }
    println!("\nknowledge edges by axis:");
    for (axis, count) in &report.edge_count_by_axis {
        println!("  {axis:<24} {count}");
    }
    println!("\nknowledge edges by distribution:");
    for (dist, count) in &report.edge_count_by_distribution {
        println!("  {dist:<10} {count}");
    }

    if !report.warnings.is_empty() {
        println!("\nwarnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }

    Ok(())
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::BuildGraph { bundle, morphology, out, debug_graphml, strict_compile } => {
            build_graph(bundle, morphology, out, debug_graphml, strict_compile)
        }
        Commands::BuildContent { bundle, morphology, out } => {
            build_content(bundle, morphology, out)
        }
        Commands::InspectGraph { path } => inspect_graph(path),
    }
}

fn main() {
    tracing_subscriber::fmt().with_target(false).compact().init();

    let cli = Cli::parse();
    let start = Instant::now();
    if let Err(err) = run(cli) {
        tracing::error!("{err}");
        std::process::exit(err.exit_code());
    }
    tracing::info!(elapsed = ?start.elapsed(), "done");
}
