//! Gridlock master binary.
//!
//! Usage:
//!   gridlock [options] <agent-binary>...
//!
//! Creates the shared segments, spawns the agents (and optionally an
//! observer), drives the game, and prints the final ranking.

use clap::Parser;
use orchestrator::{Cli, Config, Runner};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config::from_cli(Cli::parse())?;
    let json = cfg.json;

    // Cooperative stop: observed at round boundaries and between turns.
    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || {
            stop.store(true, Ordering::SeqCst);
        })?;
    }

    let runner = Runner::new(cfg, stop)?;
    let summary = runner.run()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{summary}");
    }
    Ok(())
}
