//! DisamGraph main entry point
//!
//! This is the command-line interface for the DisamGraph sense-graph builder.

use anyhow::Context;
use clap::Parser;
use disamgraph::config::{load_config_with_hash, validate, Config};
use disamgraph::output::{compute_statistics, print_statistics, write_outputs};
use disamgraph::{crawl, CrawlParams};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// DisamGraph: sense graphs for ambiguous terms
///
/// DisamGraph fetches the disambiguation page for TERM, follows a bounded
/// number of links below each listed sense, and records which articles are
/// reached from more than one sense.
#[derive(Parser, Debug)]
#[command(name = "disamgraph")]
#[command(version)]
#[command(about = "Builds sense graphs from disambiguation pages", long_about = None)]
struct Cli {
    /// The ambiguous term, e.g. "Shot"
    #[arg(value_name = "TERM")]
    term: String,

    /// Path to TOML configuration file
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Number of link levels to expand below each sense
    #[arg(short = 'n', long = "levels", value_name = "LEVELS")]
    num_levels: Option<u32>,

    /// Number of senses to take from the disambiguation page
    #[arg(short = 'd', long = "disambig-links", value_name = "N")]
    num_disambig_links: Option<usize>,

    /// Number of links to follow from each page
    #[arg(short = 'p', long = "page-links", value_name = "N")]
    num_page_links: Option<usize>,

    /// Refetch articles even if they are cached
    #[arg(short = 'o', long)]
    overwrite: bool,

    /// Stop after this many remote fetches
    #[arg(long, value_name = "N")]
    max_fetches: Option<u64>,

    /// Where to write the JSON graph description
    #[arg(long, value_name = "PATH")]
    output: Option<String>,

    /// Where to write the full graph as DOT
    #[arg(long, value_name = "PATH")]
    dot: Option<String>,

    /// Where to write the duplicates-only graph as DOT
    #[arg(long, value_name = "PATH")]
    dupgraph: Option<String>,

    /// Where to write the markdown summary
    #[arg(long, value_name = "PATH")]
    summary: Option<String>,

    /// Directory for the plain text of fetched articles, one folder per sense
    #[arg(long, value_name = "DIR")]
    articles: Option<String>,

    /// Persistent article cache database
    #[arg(long, value_name = "PATH")]
    cache: Option<String>,

    /// Validate the configuration and show the effective settings without crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    apply_overrides(&mut config, &cli);
    validate(&config).context("Invalid settings")?;

    let params = CrawlParams::from_config(&config.crawl, &cli.term);
    params.validate().context("Invalid crawl parameters")?;

    if cli.dry_run {
        return handle_dry_run(&config, &params);
    }

    handle_crawl(&config, &cli.term, cli.quiet).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("disamgraph=info,warn"),
            1 => EnvFilter::new("disamgraph=debug,info"),
            2 => EnvFilter::new("disamgraph=trace,debug"),
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

/// Command-line flags win over the configuration file
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(levels) = cli.num_levels {
        config.crawl.num_levels = levels;
    }
    if let Some(links) = cli.num_disambig_links {
        config.crawl.num_disambig_links = Some(links);
    }
    if let Some(links) = cli.num_page_links {
        config.crawl.num_page_links = links;
    }
    if cli.overwrite {
        config.crawl.force_refresh = true;
    }
    if let Some(max) = cli.max_fetches {
        config.crawl.max_fetches = Some(max);
    }
    if let Some(path) = &cli.output {
        config.output.graph_path = path.clone();
    }
    if let Some(path) = &cli.dot {
        config.output.dot_path = Some(path.clone());
    }
    if let Some(path) = &cli.dupgraph {
        config.output.duplicates_dot_path = Some(path.clone());
    }
    if let Some(path) = &cli.summary {
        config.output.summary_path = Some(path.clone());
    }
    if let Some(dir) = &cli.articles {
        config.output.articles_dir = Some(dir.clone());
    }
    if let Some(path) = &cli.cache {
        config.output.cache_path = Some(path.clone());
    }
}

/// Handles the --dry-run mode: shows the effective settings
fn handle_dry_run(config: &Config, params: &CrawlParams) -> anyhow::Result<()> {
    println!("=== DisamGraph Dry Run ===\n");

    let page = params.disambiguation_page(&config.source.disambiguation_suffix)?;
    println!("Term: {}", params.root_term);
    println!("Disambiguation page: {}\n", page);

    let effective = toml::to_string_pretty(config).context("Failed to render settings")?;
    println!("{}", effective);

    println!("✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: &Config, term: &str, quiet: bool) -> anyhow::Result<()> {
    let report = match crawl(config, term).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    if report.status.cap_exceeded() {
        tracing::warn!(
            "Crawl halted early ({} titles skipped); the graph is partial",
            report.status.skipped
        );
    } else if report.status.degraded() {
        tracing::warn!(
            "{} branches were lost to fetch failures",
            report.status.failures.len()
        );
    } else {
        tracing::info!("Crawl completed successfully");
    }

    write_outputs(&report, &config.output).context("Failed to write outputs")?;

    if !quiet {
        print_statistics(&compute_statistics(&report));
    }

    Ok(())
}
