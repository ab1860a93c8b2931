//! Sumi-Linkcheck main entry point
//!
//! This is the command-line interface for the Sumi-Linkcheck hyperlink
//! verifier.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use sumi_linkcheck::checker::{run_linkcheck, Hyperlink};
use sumi_linkcheck::collector::{collect_documents, load_manifest};
use sumi_linkcheck::config::{load_config_with_hash, Config};
use sumi_linkcheck::output::print_statistics;
use tracing_subscriber::EnvFilter;

/// Sumi-Linkcheck: an external hyperlink verifier
///
/// Sumi-Linkcheck checks every external link in a tree of built HTML
/// documents, honours server rate limits, verifies anchors, and writes
/// `output.txt` and `output.json` reports.
#[derive(Parser, Debug)]
#[command(name = "sumi-linkcheck")]
#[command(version)]
#[command(about = "An external hyperlink verifier", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Read links from a JSON-lines manifest instead of the source directory
    #[arg(long, value_name = "FILE")]
    links: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be checked without checking
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<u8> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let hyperlinks = gather_links(&config, cli.links.as_deref())?;

    if cli.dry_run {
        handle_dry_run(&config, &hyperlinks);
        return Ok(0);
    }

    let outcome = run_linkcheck(&config, hyperlinks)
        .await
        .context("Link check failed")?;

    if !cli.quiet {
        print_statistics(&outcome.stats);
    }
    tracing::info!(
        "Reports written to {} (output.txt, output.json)",
        config.output.directory
    );

    Ok(outcome.exit_code())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sumi_linkcheck=info,warn"),
            1 => EnvFilter::new("sumi_linkcheck=debug,info"),
            2 => EnvFilter::new("sumi_linkcheck=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads links from the manifest if given, otherwise from the source tree
fn gather_links(config: &Config, manifest: Option<&Path>) -> anyhow::Result<Vec<Hyperlink>> {
    match manifest {
        Some(path) => {
            tracing::info!("Reading links from manifest {}", path.display());
            load_manifest(path).context("Failed to read link manifest")
        }
        None => {
            let dir = Path::new(&config.source.directory);
            tracing::info!("Collecting links from {}", dir.display());
            collect_documents(dir).context("Failed to collect links")
        }
    }
}

/// Handles the --dry-run mode: shows the configuration and the links found
fn handle_dry_run(config: &Config, hyperlinks: &[Hyperlink]) {
    println!("=== Sumi-Linkcheck Dry Run ===\n");

    println!("Checker Configuration:");
    println!("  Workers: {}", config.linkcheck.workers);
    println!("  Retries: {}", config.linkcheck.retries);
    println!("  Timeout: {:?}", config.linkcheck.timeout());
    println!("  Anchors: {}", config.linkcheck.anchors);
    println!(
        "  Rate limit ceiling: {:?}",
        config.linkcheck.max_delay()
    );
    println!("  Ignore patterns: {}", config.linkcheck.ignore.len());
    println!("  Auth entries: {}", config.linkcheck.auth.len());

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Sorted: {}", config.output.sort_entries);

    println!("\nLinks ({}):", hyperlinks.len());
    for link in hyperlinks {
        println!(
            "  - {} ({}:{})",
            link.uri,
            link.docname.as_deref().unwrap_or("?"),
            link.lineno.unwrap_or(0)
        );
    }

    println!("\n✓ Configuration is valid");
}
