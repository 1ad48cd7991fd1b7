//! shiftsolve CLI - clinical staff shift scheduling service
//!
//! Starts a stream worker that consumes schedule requests from a Redis
//! stream, solves them, and publishes result envelopes.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shiftsolve_worker::{consumer_name, install_interrupt_handler, RedisStream, StreamWorker, WorkerConfig};

#[derive(Parser)]
#[command(name = "shiftsolve")]
#[command(author, version, about = "Clinical staff shift scheduling service", long_about = None)]
struct Cli {
    /// Process at most one batch of messages, then exit. Useful for local
    /// smoke-testing against a live stream without running forever.
    #[arg(long)]
    once: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = WorkerConfig::from_env();

    let stream = RedisStream::connect(&config, consumer_name())
        .with_context(|| format!("failed to connect to redis at {}", config.redis_url()))?;

    let mut worker = StreamWorker::new(stream, config);

    if cli.once {
        worker
            .run_once()
            .context("failed to process a batch of requests")?;
        return Ok(());
    }

    let shutdown = worker.shutdown_handle();
    install_interrupt_handler(shutdown).context("failed to install interrupt handler")?;

    worker.run();
    Ok(())
}
