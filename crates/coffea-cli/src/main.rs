use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use coffea_builder::Builder;
use coffea_core::{
    Config, GraphReport, GraphSummary, Granularity, Model, ReportMetadata, SizeMetric,
};

/// Coffea - dependency graphs from compiled Java classes
#[derive(Parser)]
#[command(name = "coffea")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: coffea.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a dependency graph from class files
    Build {
        /// Directories or class files to scan (default: roots from config)
        roots: Vec<PathBuf>,

        /// Node granularity: class or package
        #[arg(short, long)]
        granularity: Option<String>,

        /// Node size metric: none, class or code
        #[arg(short, long)]
        size: Option<String>,

        /// Leave out classes matching this pattern (repeatable)
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Descend into symlinked directories
        #[arg(long)]
        follow_links: bool,

        /// Write the graph report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show nodes of a saved graph report
    Show {
        /// Graph report written by `coffea build --output`
        report: PathBuf,

        /// Node to show dependencies for
        key: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    // Load config if specified
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)
            .with_context(|| format!("Failed to load config {}", config_path.display()))?
    } else if Path::new("coffea.toml").exists() {
        Config::from_file(Path::new("coffea.toml")).context("Failed to load coffea.toml")?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    match cli.command {
        Commands::Build { roots, granularity, size, exclude, follow_links, output } => {
            config.exclude.extend(exclude);
            config.follow_links |= follow_links;
            build_command(config, roots, granularity, size, output.as_deref(), cli.verbose)
        }
        Commands::Show { report, key } => show_command(&report, key.as_deref()),
    }
}

/// Log to stderr; RUST_LOG overrides the default level
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Build command - scan roots and summarize the resulting graph
fn build_command(
    mut config: Config,
    roots: Vec<PathBuf>,
    granularity: Option<String>,
    size: Option<String>,
    output: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    // Flags override the config file
    if let Some(granularity) = granularity {
        config.granularity = granularity.parse::<Granularity>()?;
    }
    if let Some(size) = size {
        config.size = size.parse::<SizeMetric>()?;
    }
    tracing::debug!(?config, "Resolved configuration");

    let roots = if roots.is_empty() { config.resolved_roots() } else { roots };
    if roots.is_empty() {
        anyhow::bail!("No roots to scan. Pass directories or set `roots` in coffea.toml.");
    }

    if verbose {
        eprintln!(
            "{} granularity={}, size={}",
            "Using".cyan(),
            config.granularity,
            config.size
        );
    }

    let mut builder = Builder::from_config(&config);
    for root in &roots {
        let classes = builder
            .append(root)
            .with_context(|| format!("Failed to scan {}", root.display()))?;

        if verbose {
            eprintln!("  {} {} ({} class files)", "Scanned".cyan(), root.display(), classes);
        }
    }

    let model = builder.into_model();
    print_summary(&model);

    if let Some(output) = output {
        let metadata = ReportMetadata {
            granularity: config.granularity,
            size: config.size,
            roots: roots.clone(),
        };
        GraphReport::from_model(&model)
            .with_metadata(metadata)
            .save_to_file(output)
            .with_context(|| format!("Failed to write report {}", output.display()))?;

        println!("{} {}", "Report saved to:".green(), output.display());
    }

    Ok(())
}

/// Show command - list nodes or one node's dependencies
fn show_command(report_path: &Path, key: Option<&str>) -> Result<()> {
    let report = GraphReport::from_file(report_path)
        .with_context(|| format!("Failed to load report {}", report_path.display()))?;
    let model = report.into_model();

    let Some(key) = key else {
        for node in model.nodes() {
            println!("{} {}", node.key.green(), format!("(size {})", node.size).dimmed());
        }
        print_summary(&model);
        return Ok(());
    };

    let node = model
        .get(key)
        .ok_or_else(|| anyhow::anyhow!("Node '{}' not found in {}", key, report_path.display()))?;

    println!("{} {}", "Node:".bold(), node.key.green());
    println!("{} {}", "Size:".bold(), node.size);
    println!("{} {}", "Dependencies:".bold(), node.dependencies.len());

    for dep in &node.dependencies {
        if model.contains(dep) {
            println!("  {}", dep);
        } else {
            println!("  {} {}", dep.yellow(), "(not scanned)".dimmed());
        }
    }

    Ok(())
}

fn print_summary(model: &Model) {
    let summary = GraphSummary::from_model(model);

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Dependency Graph Summary".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!("{} {}", "Nodes:".bold(), summary.nodes);
    println!("{} {}", "Edges:".bold(), summary.edges);
    println!("{} {}", "Unscanned dependencies:".bold(), summary.dangling);
    println!("{} {}", "Total size:".bold(), summary.total_size);
    println!("{}", "=".repeat(60).bright_blue());
}
