//! Unipage-Scout main entry point
//!
//! This is the command-line interface for the Unipage-Scout university scraper.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use unipage_scout::config::{load_config_with_hash, validate, Config, CountrySource};
use unipage_scout::llm::{LlmClient, OpenRouterClient};
use unipage_scout::page::HttpPageClient;
use unipage_scout::runner::print_statistics;
use unipage_scout::{CountryFilter, RunController};

/// Unipage-Scout: a university listing scraper
///
/// Unipage-Scout discovers countries and universities on a listing site,
/// extracts one structured record per university, optionally with LLM help
/// for data the page selectors miss, and writes each record as JSON under
/// `country/city/`.
#[derive(Parser, Debug)]
#[command(name = "unipage-scout")]
#[command(version)]
#[command(about = "A university listing scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Comma-separated country names or codes to scrape, or "all"
    #[arg(long, default_value = "all")]
    countries: String,

    /// API key for the LLM endpoint (overrides config and environment)
    #[arg(long)]
    api_key: Option<String>,

    /// Output directory (overrides output.directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only discover countries and write university listings
    #[arg(long)]
    listings_only: bool,

    /// Validate config and show what would be scraped without scraping
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

    let (mut config, config_hash) = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (config, Some(hash))
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            let config = Config::default();
            validate(&config).context("Invalid default configuration")?;
            (config, None)
        }
    };

    if let Some(output) = &cli.output {
        config.output.directory = output.to_string_lossy().to_string();
    }

    let filter = CountryFilter::parse(&cli.countries);

    if cli.dry_run {
        handle_dry_run(&config, &filter, cli.listings_only);
        return Ok(());
    }

    handle_scrape(config, config_hash, &filter, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("unipage_scout=info,warn"),
            1 => EnvFilter::new("unipage_scout=debug,info"),
            2 => EnvFilter::new("unipage_scout=trace,debug"),
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

/// Builds the LLM client, or `None` when AI is disabled or no key is available
fn build_llm(config: &Config, cli_key: Option<&str>) -> anyhow::Result<Option<Box<dyn LlmClient>>> {
    if !config.ai.enabled {
        tracing::info!("AI assistance disabled by configuration");
        return Ok(None);
    }

    let Some(api_key) = config.ai.resolve_api_key(cli_key) else {
        tracing::warn!(
            "No API key found (--api-key, ai.api-key or ${}), continuing without AI",
            config.ai.api_key_env
        );
        return Ok(None);
    };

    let client = OpenRouterClient::new(&config.ai, &api_key)
        .context("Failed to create LLM client")?
        .with_app_name("Unipage-Scout");
    tracing::info!("AI assistance enabled with model {}", config.ai.model);

    Ok(Some(Box::new(client)))
}

/// Handles the scrape mode
async fn handle_scrape(
    config: Config,
    config_hash: Option<String>,
    filter: &CountryFilter,
    cli: &Cli,
) -> anyhow::Result<()> {
    let page = HttpPageClient::new(&config.browser).context("Failed to create page client")?;
    let llm = build_llm(&config, cli.api_key.as_deref())?;

    let start = std::time::Instant::now();
    let mut controller = RunController::new(config, Box::new(page), llm)?
        .listings_only(cli.listings_only);
    if let Some(hash) = config_hash {
        controller = controller.with_config_hash(hash);
    }

    let stats = controller.run(filter).await?;

    if !cli.quiet {
        println!();
        print_statistics(&stats, start.elapsed(), cli.listings_only);
    }

    Ok(())
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config, filter: &CountryFilter, listings_only: bool) {
    println!("=== Unipage-Scout Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Listing path: {}", config.site.listing_path);
    println!("  Country URL template: {}", config.site.country_url_template);
    println!("  University pattern: {}", config.site.university_pattern);
    println!(
        "  Sitemap: {} (limit {})",
        config.site.sitemap_path, config.site.sitemap_limit
    );

    println!("\nDiscovery:");
    println!("  Country source: {:?}", config.discovery.country_source);
    match config.discovery.max_universities_per_country {
        Some(max) => println!("  Max universities per country: {}", max),
        None => println!("  Max universities per country: unlimited"),
    }
    match filter {
        CountryFilter::All => println!("  Country filter: all"),
        CountryFilter::Only(wanted) => println!("  Country filter: {}", wanted.join(", ")),
    }
    println!("  Listings only: {}", listings_only);

    println!("\nExtraction:");
    println!("  Strategy: {:?}", config.extraction.strategy);
    match config.extraction.expected_programs {
        Some(expected) => println!("  Expected programs: {}", expected),
        None => println!("  Expected programs: from page"),
    }
    println!(
        "  Max follow-up passes: {}",
        config.extraction.max_followup_passes
    );
    println!(
        "  Program pages: {} (max {})",
        config.site.programs_page_template, config.extraction.max_program_pages
    );

    println!("\nPacing:");
    println!("  Settle delay: {}ms", config.browser.settle_ms);
    println!("  Request delay: {}ms", config.pacing.request_delay_ms);
    println!("  Country delay: {}ms", config.pacing.country_delay_ms);

    println!("\nAI:");
    println!("  Enabled: {}", config.ai.enabled);
    if config.ai.enabled {
        println!("  Endpoint: {}", config.ai.api_url);
        println!("  Model: {}", config.ai.model);
        println!("  API key env: {}", config.ai.api_key_env);
    }

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory);
    println!("  Country summaries: {}", config.output.country_summaries);
    println!("  Summary file: {}", config.output.summary_file);

    if config.discovery.country_source == CountrySource::Fixed || !config.countries.is_empty() {
        println!("\nConfigured Countries ({}):", config.countries.len());
        for entry in &config.countries {
            println!("  - {} ({})", entry.name, entry.code);
        }
    }

    println!("\n✓ Configuration is valid");
}
