//! TableKV Shell Binary
//!
//! Runs a table script against a fresh in-memory storage.

use std::io;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use tablekv::{Config, ConflictHandling, MemoryStorage};
use tracing_subscriber::{fmt, EnvFilter};

/// TableKV Shell
#[derive(Parser, Debug)]
#[command(name = "tablekv-shell")]
#[command(about = "Run table storage scripts against the in-memory engine")]
#[command(version)]
struct Args {
    /// Script file to run
    script: PathBuf,

    /// Behavior when a replace, merge or delete carries a stale ETag
    #[arg(short, long, value_enum, default_value = "throw")]
    conflicts: Conflicts,

    /// Maximum entities per in-memory query page
    #[arg(short, long, default_value = "1000")]
    page_size: usize,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Conflicts {
    Throw,
    Overwrite,
}

impl From<Conflicts> for ConflictHandling {
    fn from(value: Conflicts) -> Self {
        match value {
            Conflicts::Throw => ConflictHandling::Throw,
            Conflicts::Overwrite => ConflictHandling::Overwrite,
        }
    }
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tablekv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("TableKV Shell v{}", tablekv::VERSION);

    let config = Config::builder()
        .conflict_handling(args.conflicts.into())
        .page_size(args.page_size)
        .build();
    let storage = MemoryStorage::shared(&config);

    let stdout = io::stdout();
    match tablekv::shell::run_script_file(storage, config.conflict_handling, &args.script, stdout.lock()) {
        Ok(stats) => {
            tracing::info!(
                commands = stats.commands,
                commits = stats.commits,
                failures = stats.failures,
                "script finished"
            );
            if stats.failures > 0 {
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!("Script failed: {}", e);
            std::process::exit(1);
        }
    }
}
