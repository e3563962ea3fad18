//! # ZapDrip — WhatsApp campaign dispatcher
//!
//! Reads recipient rows from a Google Sheets spreadsheet and sends one
//! WhatsApp message per row, inside a daily send window, pacing sends and
//! checkpointing progress so a restart resumes where it left off.
//!
//! Usage:
//!   zapdrip                      # Run with ~/.zapdrip/config.toml
//!   zapdrip --config camp.toml   # Explicit config
//!   zapdrip --yes                # Skip the confirmation prompt (unattended)
//!   zapdrip --dry-run            # Rehearse: narrate sends, touch nothing

use std::path::Path;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use zapdrip_channels::{ConsoleTransport, WhatsAppTransport};
use zapdrip_core::traits::Transport;
use zapdrip_core::ZapDripConfig;
use zapdrip_dispatch::{CheckpointStore, FailureLog, SendWindow, Supervisor};
use zapdrip_sheets::GoogleSheetsSource;

#[derive(Parser)]
#[command(
    name = "zapdrip",
    version,
    about = "🤖 ZapDrip — resumable WhatsApp campaign dispatcher"
)]
struct Cli {
    /// Config file (default: ~/.zapdrip/config.toml)
    #[arg(short, long)]
    config: Option<String>,

    /// Skip the interactive confirmation prompt
    #[arg(short = 'y', long)]
    yes: bool,

    /// Narrate sends instead of calling the WhatsApp API
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn expand_path(p: &str) -> String {
    shellexpand::tilde(p).to_string()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let config = match &cli.config {
        Some(path) => ZapDripConfig::load_from(Path::new(&expand_path(path)))?,
        None => ZapDripConfig::load()?,
    };
    config.validate()?;

    println!("{}", "=".repeat(70));
    println!("🤖 ZapDrip v{} — WhatsApp campaign dispatcher", env!("CARGO_PKG_VERSION"));
    println!("{}", "=".repeat(70));
    println!(
        "⏰ Send window:    {}h–{}h ({})",
        config.window.start_hour, config.window.end_hour, config.window.timezone
    );
    println!("⏳ Send pacing:    one message every {}s", config.dispatch.message_delay_secs);
    println!("💾 Checkpoint:     {}", config.storage.checkpoint_file.display());
    println!("📝 Failure log:    {}", config.storage.failure_log.display());
    if cli.dry_run {
        println!("🧪 Dry-run:        nothing will actually be sent");
    }
    println!("{}", "=".repeat(70));

    if !cli.yes {
        println!("\n✋ Press ENTER to start (or Ctrl+C to abort)...");
        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
    }

    let window = SendWindow::from_config(&config.window)?;
    let checkpoint = CheckpointStore::new(
        config.storage.checkpoint_file.clone(),
        config.dispatch.header_rows,
    );
    let failures = FailureLog::new(config.storage.failure_log.clone());
    let source = Box::new(GoogleSheetsSource::new(config.sheet.clone()));
    let transport: Box<dyn Transport> = if cli.dry_run {
        Box::new(ConsoleTransport)
    } else {
        Box::new(WhatsAppTransport::new(config.whatsapp.clone()))
    };

    let failure_log_path = config.storage.failure_log.clone();
    let mut supervisor = Supervisor::new(
        source,
        transport,
        window,
        checkpoint,
        failures,
        config.dispatch.clone(),
    );

    tokio::select! {
        result = supervisor.run() => {
            let summary = result?;
            println!();
            println!("{}", "=".repeat(70));
            println!("📊 CAMPAIGN SUMMARY");
            println!("{}", "=".repeat(70));
            println!("✅ Messages sent:  {}", summary.sent);
            println!("❌ Send failures:  {}", summary.failed);
            println!("⚠️ Rows skipped:   {}", summary.skipped);
            println!("📝 Total handled:  {}", summary.total_processed());
            if summary.failed > 0 {
                println!("\n⚠️ See {} for failure details", failure_log_path.display());
            }
            println!("\n✅ Done.");
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\n\n⚠️ Interrupted. Progress is saved — run again to resume where you left off.");
        }
    }

    Ok(())
}
