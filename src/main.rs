//! Odds comparison arbitrage crawler entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use odds_arb::api::{create_router, AppState};
use odds_arb::config::Config;
use odds_arb::error::{BotError, Result};
use odds_arb::crawl::{CrawlSummary, Crawler, NodeOutcome};
use odds_arb::metrics;
use odds_arb::page::HttpPageProvider;
use odds_arb::sink::{
    load_opportunities, AlertNotifier, LogNotifier, OpportunityCollector, ReportWriter,
};
use odds_arb::utils::shutdown_signal;

/// Sports betting arbitrage crawler.
#[derive(Parser, Debug)]
#[command(name = "odds-arb")]
#[command(about = "Crawl an odds comparison site for sports betting arbitrage")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl the whole site once (default).
    Run {
        /// Re-check every opportunity once the crawl finishes.
        #[arg(long)]
        verify: bool,

        /// Serve health, status and metrics on this port.
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Evaluate a single market page.
    Check {
        /// Market page URL.
        url: String,

        /// Name used in the report (defaults to the URL).
        #[arg(long)]
        name: Option<String>,
    },

    /// Re-check the opportunities listed in the JSON report.
    Verify,

    /// Check configuration validity.
    CheckConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("odds_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(args.json.then(|| fmt::layer().json()))
        .with((!args.json).then(fmt::layer))
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(),
        Some(Command::Check { url, name }) => cmd_check(url, name).await,
        Some(Command::Verify) => cmd_verify().await,
        Some(Command::Run { verify, port }) => cmd_run(verify, port).await,
        None => cmd_run(false, None).await,
    }?;

    Ok(())
}

/// Load and validate configuration.
fn load_config() -> Result<Config> {
    let config = Config::load().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(BotError::InvalidConfig(e));
    }

    Ok(config)
}

/// Collector wired to the report files, log and alert notifications, and
/// optionally the status API.
fn build_collector(config: &Config, state: Option<&AppState>) -> OpportunityCollector {
    let report = ReportWriter::new(&config.report_path).with_json(&config.report_json_path);
    let mut collector = OpportunityCollector::new()
        .with_sink(report)
        .with_sink(LogNotifier);

    if config.audible_alert {
        collector = collector.with_sink(AlertNotifier::stderr());
    }
    if let Some(state) = state {
        collector = collector.with_sink(state.sink());
    }
    collector
}

fn log_summary(label: &str, summary: &CrawlSummary) {
    info!("========================================");
    info!("{} SUMMARY", label);
    info!("Sports: {}", summary.sports);
    info!("Leagues: {}", summary.leagues);
    info!("Markets evaluated: {}", summary.markets_evaluated);
    info!("Opportunities: {}", summary.opportunities);
    info!(
        "Skipped: {} ({} failures)",
        summary.skipped.len(),
        summary.failures()
    );
    info!("========================================");
}

/// Check configuration validity.
fn cmd_check_config() -> Result<()> {
    println!("======================================================================");
    println!("ODDS ARB CRAWLER - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Loading configuration... ");
    let config = match Config::load() {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(e.into());
        }
    };

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(BotError::InvalidConfig(e));
        }
    }

    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Home URL: {}", config.home_url);
    println!("  Bet Amount: ${}", config.bet_amount);
    println!(
        "  Implied Payout Window: ({}, {})",
        config.min_implied, config.max_implied
    );
    println!(
        "  In-Play Games: {}",
        if config.include_in_play { "Included" } else { "Skipped" }
    );
    println!("  Excluded Markets: {}", config.excluded_markets.len());
    println!("  Market Concurrency: {}", config.market_concurrency);
    println!("  Request Delay: {}ms", config.request_delay_ms);
    println!("  Report: {} / {}", config.report_path, config.report_json_path);
    println!(
        "  Audible Alert: {}",
        if config.audible_alert { "Enabled" } else { "Disabled" }
    );
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Crawl the site once.
async fn cmd_run(verify: bool, port: Option<u16>) -> Result<()> {
    info!("Loading configuration...");
    let config = load_config()?;

    info!("Configuration loaded successfully");
    info!("Home: {}", config.home_url);
    info!("Bet amount: ${}", config.bet_amount);
    info!(
        "Implied payout window: ({}, {})",
        config.min_implied, config.max_implied
    );

    let mut app_state = AppState::new();
    match metrics::install_recorder() {
        Ok(handle) => app_state = app_state.with_metrics(handle),
        Err(e) => warn!("Metrics recorder not installed: {}", e),
    }

    // Start HTTP server
    let server = match port {
        Some(port) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = TcpListener::bind(addr).await?;
            info!("HTTP server listening on {}", addr);

            let router = create_router(app_state.clone());
            Some(tokio::spawn(async move {
                axum::serve(listener, router)
                    .with_graceful_shutdown(shutdown_signal())
                    .await
            }))
        }
        None => None,
    };

    let provider = HttpPageProvider::new(&config)?;
    let crawler =
        Crawler::new(provider, config.clone()).with_progress(app_state.progress.clone());
    let mut collector = build_collector(&config, Some(&app_state));

    // Start from an empty report
    ReportWriter::new(&config.report_path)
        .with_json(&config.report_json_path)
        .write_all(&[])?;

    app_state.set_ready(true);
    info!("Starting crawl...");

    let summary = tokio::select! {
        result = crawler.run(&mut collector) => result?,
        _ = shutdown_signal() => {
            warn!("Crawl interrupted");
            return Ok(());
        }
    };
    log_summary("CRAWL", &summary);

    if verify && !collector.is_empty() {
        let summary = crawler.reverify(&mut collector).await;
        log_summary("RE-VERIFICATION", &summary);
    }

    info!(
        "{} opportunities written to {}",
        collector.len(),
        config.report_path
    );

    if let Some(server) = server {
        info!("Crawl finished; status server still running, Ctrl+C to exit");
        match server.await {
            Ok(served) => served?,
            Err(e) => error!("Status server task failed: {}", e),
        }
    }

    Ok(())
}

/// Evaluate one market page.
async fn cmd_check(url: String, name: Option<String>) -> Result<()> {
    let config = load_config()?;
    let provider = HttpPageProvider::new(&config)?;
    let crawler = Crawler::new(provider, config.clone());
    let mut collector = build_collector(&config, None);

    let name = name.unwrap_or_else(|| url.clone());
    match crawler.check_single(&name, &url, &mut collector).await {
        NodeOutcome::Evaluated { found: true } => info!("Arbitrage opportunity found"),
        NodeOutcome::Evaluated { found: false } => info!("No arbitrage opportunity"),
        NodeOutcome::Skipped(reason) => {
            error!("Market check failed: {}", reason);
            return Err(reason.into());
        }
        NodeOutcome::Visited { .. } => {}
    }

    Ok(())
}

/// Re-check the opportunities in the JSON report.
async fn cmd_verify() -> Result<()> {
    let config = load_config()?;
    let previous = load_opportunities(&config.report_json_path)?;
    info!(
        "Loaded {} opportunities from {}",
        previous.len(),
        config.report_json_path
    );

    let provider = HttpPageProvider::new(&config)?;
    let crawler = Crawler::new(provider, config.clone());
    let mut collector = build_collector(&config, None);
    collector.restore(previous);

    let summary = crawler.reverify(&mut collector).await;
    log_summary("RE-VERIFICATION", &summary);

    Ok(())
}
