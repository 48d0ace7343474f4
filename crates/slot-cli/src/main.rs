//! `slots` CLI — resolve onboarding slot availability from a captured snapshot.
//!
//! ## Usage
//!
//! ```sh
//! # Free slots for a principal on a date
//! slots resolve -s snapshot.json -p asha -d 2025-03-10 -m physical
//!
//! # Force the long-session templates and use a config file
//! slots resolve -s snapshot.json -p meera -d 2025-03-10 -m virtual \
//!     --class long-session --config resolver.toml
//!
//! # Full report: busy intervals, merged blocks, unreadable windows
//! slots resolve -s snapshot.json -p asha -d 2025-03-10 -m physical --detailed
//!
//! # Decode a stored slot-window string
//! slots decode "2 PM - 5 PM"
//! ```
//!
//! Logs go to stderr (`RUST_LOG`, default `warn`); results go to stdout as JSON.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use slot_engine::memory::Snapshot;
use slot_engine::{decode, AvailabilityQuery, AvailabilityResolver, ResolverConfig, SlotWindow};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "slots",
    version,
    about = "Onboarding slot availability resolver"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve free slots for a principal on a date
    Resolve {
        /// Snapshot JSON with principals, calendar periods and reservation records
        #[arg(short, long)]
        snapshot: String,
        /// Principal identifier
        #[arg(short, long)]
        principal: String,
        /// Civil date, YYYY-MM-DD
        #[arg(short, long)]
        date: String,
        /// Meeting mode: physical or virtual
        #[arg(short, long)]
        mode: String,
        /// Override the principal class (long-session or short-session)
        #[arg(long)]
        class: Option<String>,
        /// Resolver config TOML (defaults apply if omitted)
        #[arg(long)]
        config: Option<String>,
        /// Print the full report instead of just the slots
        #[arg(long)]
        detailed: bool,
    },
    /// Decode a stored slot-window string
    Decode {
        /// Raw window, e.g. "14_17" or "2 PM - 5 PM"
        raw: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            snapshot,
            principal,
            date,
            mode,
            class,
            config,
            detailed,
        } => {
            let config = match config {
                Some(path) => ResolverConfig::load(&path)
                    .with_context(|| format!("Failed to load config: {}", path))?,
                None => ResolverConfig::default(),
            };

            let raw = std::fs::read_to_string(&snapshot)
                .with_context(|| format!("Failed to read snapshot: {}", snapshot))?;
            let (calendar, store, directory) = Snapshot::from_json(&raw)
                .with_context(|| format!("Failed to parse snapshot: {}", snapshot))?
                .into_parts();
            tracing::debug!(%snapshot, "loaded snapshot");

            let resolver = AvailabilityResolver::new(
                &config,
                Arc::new(calendar),
                Arc::new(store),
                Arc::new(directory),
            )
            .context("Invalid resolver config")?;

            let mut query = AvailabilityQuery::parse(&principal, &date, &mode)?;
            if let Some(class) = class {
                query = query.with_class(class.parse()?);
            }

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .context("Failed to start async runtime")?;

            let output = if detailed {
                let report = runtime.block_on(resolver.resolve_detailed(&query))?;
                serde_json::to_string_pretty(&report)?
            } else {
                let slots = runtime.block_on(resolver.resolve(&query))?;
                serde_json::to_string_pretty(&slots)?
            };
            println!("{}", output);
        }
        Commands::Decode { raw } => {
            let value = match decode(&raw) {
                SlotWindow::Numeric {
                    start_hour,
                    end_hour,
                } => json!({ "encoding": "numeric", "start_hour": start_hour, "end_hour": end_hour }),
                SlotWindow::Label {
                    start_hour,
                    end_hour,
                } => json!({ "encoding": "label", "start_hour": start_hour, "end_hour": end_hour }),
                SlotWindow::Unknown(raw) => {
                    anyhow::bail!("Unrecognized slot window: '{}'", raw);
                }
            };
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}
