//! tracklist - print release metadata for the tracks kept in a task list.
//!
//! Reads every task of the configured list, treats each "artist - track"
//! title as a search, and prints the matching releases with their styles.

mod cli;
mod report;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use tracklist_core::{MusicClient, TaskClient, Transport, UreqTransport};

const DEFAULT_LOG_FILTER: &str = "tracklist=info";

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok().as_deref()))
        .init();

    let credentials = args.credentials()?;
    let transport: Arc<dyn Transport> = Arc::new(UreqTransport::new(args.transport_config()));

    let tasks = TaskClient::new(
        Arc::clone(&transport),
        &args.tasks_url,
        &credentials.access_token,
        &credentials.client_id,
    );
    let music = MusicClient::new(
        transport,
        &args.music_url,
        &credentials.discogs_token,
        &args.user_agent,
    );

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    report::run(&tasks, &music, &args.options(), &mut out).context("tracklist failed")?;
    Ok(())
}

/// `RUST_LOG` when it is set and valid, `tracklist=info` otherwise.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}
