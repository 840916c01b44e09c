//! # pregel-maxflow
//!
//! Command-line front end for the superstep max-flow engine.
//!
//! ## Quick Start
//! ```bash
//! cargo run -- generate 200 graph.txt --seed 7
//! cargo run -- run graph.txt --environment embedded
//! ```

// =============================================================================
// MODULE DECLARATIONS
// =============================================================================

/// Configuration management
mod config;

// =============================================================================
// IMPORTS
// =============================================================================
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use flow_pregel::graph::{min_cut, small_world, FlowNetwork, GeneratorConfig, MinCut};
use flow_pregel::pregel::{
    create_checkpointer, AugmentationMap, CheckpointerConfig, FlowResult, LineFileStore,
    MemoryStore, PregelError, PregelRuntime, VertexStore,
};

use crate::config::Config;

// =============================================================================
// CLI ARGUMENTS
// =============================================================================
/// # Rust Concept: Subcommands
///
/// `#[derive(Subcommand)]` on an enum gives each variant its own argument
/// set, like `git commit` and `git push`.
#[derive(Parser, Debug)]
#[command(
    name = "pregel-maxflow",
    version,
    about = "Maximum flow by superstep augmenting-path search",
    long_about = r#"
Computes the maximum s-t flow of a directed, capacitated graph with a
Pregel-style superstep engine, then reports the matching minimum cut.

GRAPH FORMAT:
  One line per vertex: <json vertex>\t[[<json dest>, <capacity>], ...]
  The graph must contain the vertices "s" (source) and "t" (sink).

EXAMPLES:
  # Generate a random 500-vertex graph
  pregel-maxflow generate 500 graph.txt --seed 42

  # Run in memory
  pregel-maxflow run graph.txt --environment embedded

  # Run with line files in ./work and checkpoints every 5 rounds
  pregel-maxflow run graph.txt -e staged --checkpoint-dir ckpt --checkpoint-interval 5
"#
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (debug logging)
    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        help = "Enable verbose/debug logging",
        default_value = "false"
    )]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute the maximum flow of a graph file
    Run(RunArgs),

    /// Write a random small-world graph file
    Generate(GenerateArgs),
}

/// Where rounds hand their records to each other
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Environment {
    /// In-memory hand-off
    Embedded,
    /// Line files in a work directory
    Staged,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Adjacency-list graph file
    #[arg(value_name = "GRAPH")]
    graph: PathBuf,

    /// Execution environment
    #[arg(short = 'e', long, value_enum, env = "FLOW_ENVIRONMENT")]
    environment: Environment,

    /// Work directory for the staged environment
    #[arg(long, value_name = "DIR")]
    work_dir: Option<PathBuf>,

    /// Unchanged rounds required before stopping
    #[arg(short = 'w', long)]
    window: Option<usize>,

    /// Paths kept per vertex per round
    #[arg(long)]
    max_paths: Option<usize>,

    /// Evaluate candidates in path-signature order
    #[arg(long, default_value = "false")]
    deterministic: bool,

    /// Directory for checkpoints (enables checkpointing)
    #[arg(long, value_name = "DIR")]
    checkpoint_dir: Option<PathBuf>,

    /// Checkpoint every N rounds
    #[arg(long)]
    checkpoint_interval: Option<usize>,

    /// Keep only the newest N checkpoints (0 keeps all)
    #[arg(long, value_name = "N")]
    keep_checkpoints: Option<usize>,

    /// Resume the given run id from its latest checkpoint
    #[arg(long, value_name = "RUN_ID", requires = "checkpoint_dir")]
    resume: Option<String>,

    /// Print the result as JSON
    #[arg(long, default_value = "false")]
    json: bool,
}

#[derive(clap::Args, Debug)]
struct GenerateArgs {
    /// Number of numbered vertices (plus s and t)
    #[arg(value_name = "NODES")]
    nodes: usize,

    /// Output graph file
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// RNG seed for a reproducible graph
    #[arg(long)]
    seed: Option<u64>,

    /// Lattice degree
    #[arg(long, default_value_t = 4)]
    neighbors: usize,

    /// Rewiring probability
    #[arg(long, default_value_t = 0.2)]
    rewire: f64,
}

impl RunArgs {
    /// Apply command-line overrides on top of the environment config
    fn apply(&self, config: &mut Config) {
        if let Some(dir) = &self.work_dir {
            config.work_dir = dir.clone();
        }
        if let Some(window) = self.window {
            config.convergence_window = window;
        }
        if let Some(max_paths) = self.max_paths {
            config.max_paths = max_paths;
        }
        if self.deterministic {
            config.deterministic = true;
        }
        if let Some(dir) = &self.checkpoint_dir {
            config.checkpoint_dir = Some(dir.clone());
        }
        if let Some(interval) = self.checkpoint_interval {
            config.checkpoint_interval = interval;
        }
        if let Some(keep) = self.keep_checkpoints {
            config.keep_checkpoints = keep;
        }
    }
}

// =============================================================================
// REPORT
// =============================================================================
/// Printable outcome of a run
#[derive(Debug, Serialize)]
struct Report<'a> {
    run_id: &'a str,
    max_flow: i64,
    supersteps: usize,
    cut_value: i64,
    sink_reachable: bool,
    cut_edges: &'a [(flow_pregel::VertexId, flow_pregel::VertexId, i64)],
    augmentation: &'a AugmentationMap,
}

impl<'a> Report<'a> {
    fn new(result: &'a FlowResult, cut: &'a MinCut) -> Self {
        Self {
            run_id: &result.run_id,
            max_flow: result.flow_value(),
            supersteps: result.supersteps,
            cut_value: cut.value,
            sink_reachable: cut.sink_reachable,
            cut_edges: &cut.cut_edges,
            augmentation: &result.augmentation,
        }
    }

    fn print(&self) {
        println!("\n{}", "=".repeat(60));
        println!("MAX FLOW RESULTS");
        println!("{}\n", "=".repeat(60));
        println!("Run id:     {}", self.run_id);
        println!("Max flow:   {}", self.max_flow);
        println!("Supersteps: {}", self.supersteps);
        println!("Cut value:  {}", self.cut_value);
        println!("Cut edges:");
        for (from, to, capacity) in self.cut_edges {
            println!("  {from} -> {to} ({capacity})");
        }
        println!("\n{}", "=".repeat(60));
    }
}

// =============================================================================
// MAIN FUNCTION
// =============================================================================
#[tokio::main]
async fn main() -> Result<()> {
    // .env may supply FLOW_ENVIRONMENT, which clap reads during parsing
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    match cli.command {
        Command::Run(args) => run(args).await,
        Command::Generate(args) => generate(args).await,
    }
}

/// Load, materialize, run and extract.
async fn run(args: RunArgs) -> Result<()> {
    let mut config = Config::from_env()?;
    args.apply(&mut config);
    config.validate()?;
    info!(environment = ?args.environment, config = ?config, "Configuration loaded");

    let network = FlowNetwork::load(&args.graph)
        .await
        .with_context(|| format!("Failed to load graph {}", args.graph.display()))?;
    info!(
        vertices = network.vertex_count(),
        edges = network.edge_count(),
        "Graph loaded"
    );
    // Missing endpoints fail here, before any round runs
    let input = network.materialize()?;

    let store: Arc<dyn VertexStore> = match args.environment {
        Environment::Embedded => Arc::new(MemoryStore::new()),
        Environment::Staged => Arc::new(LineFileStore::new(&config.work_dir)),
    };

    let mut runtime = PregelRuntime::new(store).with_config(config.to_pregel_config());
    if let Some(run_id) = &args.resume {
        runtime = runtime.with_run_id(run_id);
    }
    if let Some(dir) = &config.checkpoint_dir {
        let checkpointer = create_checkpointer(
            CheckpointerConfig::File {
                path: dir.clone(),
                compression: config.compress_checkpoints,
            },
            runtime.run_id(),
        )?;
        runtime = runtime.with_checkpointer(checkpointer);
    }

    // Stop between rounds on Ctrl-C
    let abort = runtime.abort_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current round");
            abort.abort();
        }
    });

    let outcome = if args.resume.is_some() {
        runtime
            .resume()
            .await
            .map(|result| result.context("No checkpoint found for this run id"))
    } else {
        runtime.run(input).await.map(Ok)
    };

    let result = match outcome {
        Ok(result) => result?,
        Err(e) => {
            error!(error = %e, "Max-flow run failed");
            report_failure(&e);
            return Err(e.into());
        }
    };

    network
        .verify(&result.augmentation)
        .context("Accepted flow is not feasible")?;
    let cut = min_cut(&network, &result.augmentation)?;
    if cut.sink_reachable {
        warn!("Sink is still reachable in the residual graph; the flow is not maximal");
    }

    let report = Report::new(&result, &cut);
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }

    info!(max_flow = report.max_flow, "Run completed successfully");
    Ok(())
}

/// Print user-facing hints for a failed run
fn report_failure(e: &PregelError) {
    eprintln!("\nMax-flow run failed: {e}");
    match e {
        PregelError::MissingEndpoint(_) => {
            eprintln!("\nTip: the graph needs both a \"s\" and a \"t\" vertex.");
        }
        PregelError::MaxSuperstepsExceeded(_) => {
            eprintln!("\nTip: raise FLOW_MAX_SUPERSTEPS or lower --window.");
        }
        _ => {}
    }
    if let Some(partial) = e.partial_augmentation() {
        eprintln!(
            "Partial flow accepted before the abort: {}",
            partial.net_flow_into(&flow_pregel::VertexId::sink())
        );
    }
}

/// Generate a random graph file.
async fn generate(args: GenerateArgs) -> Result<()> {
    let mut generator = GeneratorConfig::new(args.nodes)
        .with_neighbors(args.neighbors)
        .with_rewire(args.rewire);
    if let Some(seed) = args.seed {
        generator = generator.with_seed(seed);
    }

    let network = small_world(&generator)?;
    network
        .save(&args.output)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        vertices = network.vertex_count(),
        edges = network.edge_count(),
        output = %args.output.display(),
        "Graph written"
    );
    Ok(())
}

// =============================================================================
// LOGGING INITIALIZATION
// =============================================================================
/// Initialize the tracing subscriber for structured logging.
///
/// `RUST_LOG` takes precedence; otherwise `--verbose` selects DEBUG over INFO.
fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_str())),
        )
        .with_target(true)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set logging subscriber: {}", e))?;

    Ok(())
}

// =============================================================================
// CLI TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_args_parsing() {
        let cli = Cli::parse_from(["test", "run", "graph.txt", "--environment", "embedded"]);
        assert!(!cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.graph, PathBuf::from("graph.txt"));
        assert_eq!(args.environment, Environment::Embedded);
        assert!(!args.deterministic);
        assert!(args.resume.is_none());
    }

    #[test]
    fn test_run_args_with_flags() {
        let cli = Cli::parse_from([
            "test",
            "run",
            "g.txt",
            "-e",
            "staged",
            "--window",
            "3",
            "--max-paths",
            "4",
            "--deterministic",
            "--checkpoint-dir",
            "ckpt",
            "--keep-checkpoints",
            "3",
            "--resume",
            "run-1",
            "--verbose",
        ]);
        assert!(cli.verbose);
        let Command::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.environment, Environment::Staged);

        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.convergence_window, 3);
        assert_eq!(config.max_paths, 4);
        assert!(config.deterministic);
        assert_eq!(config.checkpoint_dir, Some(PathBuf::from("ckpt")));
        assert_eq!(config.keep_checkpoints, 3);
        assert_eq!(config.to_pregel_config().keep_checkpoints, 3);
        assert_eq!(args.resume.as_deref(), Some("run-1"));
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let result = Cli::try_parse_from(["test", "run", "g.txt", "--environment", "cluster"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_resume_requires_checkpoint_dir() {
        let result = Cli::try_parse_from(["test", "run", "g.txt", "-e", "embedded", "--resume", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_args() {
        let cli = Cli::parse_from(["test", "generate", "50", "out.txt", "--seed", "9"]);
        let Command::Generate(args) = cli.command else {
            panic!("expected generate");
        };
        assert_eq!(args.nodes, 50);
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.neighbors, 4);
    }
}
