//! Binary entry point. Wiring a real CLI (loading [`SchedulerConfig`] from
//! flags/files, constructing the scheduler's collaborators against live
//! scrapers/trainers) is out of scope (§1); this surface only demonstrates
//! that the façade assembles, logs, and exposes the scheduler's triggers.

use arbihawk::core::{logging, logs::LogBuffer, SchedulerConfig};
use clap::Parser;

/// Arbihawk scheduler control core.
#[derive(Debug, Parser)]
#[command(name = "arbihawk", about = "Self-hosted sports-betting and trading automation scheduler")]
struct Cli {
    /// Emit logs as JSON instead of human-readable text.
    #[arg(long)]
    json_logs: bool,
}

fn main() {
    let cli = Cli::parse();
    let logs = LogBuffer::new(1000);
    if cli.json_logs {
        logging::init_json_logging(logs);
    } else {
        logging::init_logging(logs);
    }

    let config = SchedulerConfig::default();
    tracing::info!(?config, "arbihawk scheduler config loaded; wire a Store and collaborators to run tasks");
}
