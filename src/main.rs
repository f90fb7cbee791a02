//! # RSVP Relay
//!
//! Polls the RSVP sheet and emails every new respondent exactly once.
//!
//! Usage:
//!   rsvp-relay                      # Poll every 60s until Ctrl-C
//!   rsvp-relay --once               # Single pass (auto when CI / GITHUB_ACTIONS is set)
//!   rsvp-relay --config relay.toml  # Settings file, environment still wins
//!   rsvp-relay --interval 30        # Custom polling period

use anyhow::Result;
use clap::Parser;
use rsvp_core::RsvpConfig;
use rsvp_core::config::expand_path;
use rsvp_scheduler::{LedgerStore, Reconciler, RunMode};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "rsvp-relay",
    version,
    about = "💌 RSVP Relay — reply to every new RSVP exactly once"
)]
struct Cli {
    /// Run a single pass and exit (exit code 1 if the pass faults)
    #[arg(long)]
    once: bool,

    /// TOML settings file (defaults to ~/.rsvp-relay/config.toml when present)
    #[arg(short, long)]
    config: Option<String>,

    /// Polling period in seconds (overrides POLL_INTERVAL_SECS)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn is_set(value: &str) -> &'static str {
    if value.trim().is_empty() { "NOT SET" } else { "Set" }
}

fn load_config(cli: &Cli) -> Result<RsvpConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let mut config = RsvpConfig::load_from(&expand_path(path))?;
            config.apply_env();
            config
        }
        None => RsvpConfig::load()?,
    };
    if let Some(secs) = cli.interval.filter(|s| *s > 0) {
        config.poll.interval_secs = secs;
    }
    Ok(config)
}

fn in_ci() -> bool {
    ["CI", "GITHUB_ACTIONS"]
        .iter()
        .any(|key| std::env::var(key).is_ok_and(|v| !v.is_empty()))
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional; real environment variables take precedence
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "rsvp_relay=debug,rsvp_scheduler=debug,rsvp_sheets=debug,rsvp_mail=debug,rsvp_core=debug"
    } else {
        "rsvp_relay=info,rsvp_scheduler=info,rsvp_sheets=info,rsvp_mail=info,rsvp_core=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("=== Workflow failed ===");
            tracing::error!("Error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<u8> {
    let config = load_config(&cli)?;

    tracing::info!("💌 RSVP Relay v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("   Mail user:      {}", is_set(&config.mail.username));
    tracing::info!("   Mail password:  {}", is_set(&config.mail.password));
    tracing::info!("   Spreadsheet ID: {}", is_set(&config.sheet.spreadsheet_id));
    tracing::info!("   Sheet tab:      {}", config.sheet.tab_name);
    tracing::info!("   Ledger:         {}", config.ledger.path);

    let source = rsvp_sheets::row_source_from_config(&config.sheet);
    let dispatcher = rsvp_mail::dispatcher_from_config(&config.mail);
    let store = LedgerStore::new(expand_path(&config.ledger.path));
    let mut reconciler = Reconciler::new(Box::new(source), dispatcher, store);

    let every = Duration::from_secs(config.poll.interval_secs);
    match RunMode::select(cli.once, in_ci(), every) {
        RunMode::Once => {
            let result = rsvp_scheduler::run_once(&mut reconciler).await;
            Ok(rsvp_scheduler::exit_code(&result))
        }
        RunMode::Continuous { every } => {
            tracing::info!("👀 Monitoring sheet: {}", config.sheet.spreadsheet_id);
            let shared = Arc::new(Mutex::new(reconciler));
            let poller = rsvp_scheduler::spawn_poller(shared.clone(), every);

            tokio::signal::ctrl_c().await?;
            tracing::info!("🛑 Shutting down poller");
            // wait out an in-flight pass so its ledger write completes
            let _idle = shared.lock().await;
            poller.abort();
            Ok(0)
        }
    }
}
