#![doc = include_str!("../README.md")]

mod config;
mod deck;
mod run;
mod simulated;
mod telemetry;

use clap::Parser;
use config::{CliArgs, RunConfig};
use lookahead::Cards;
use simulated::SimulatedSource;
use telemetry::init_telemetry;
use tokio::signal;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = RunConfig::try_from(args)?;

    init_telemetry()?;

    let deck = deck::load(&config.deck).await?;
    log_startup_info(&config, deck.len());

    let source = SimulatedSource::new(config.latency, config.failure_rate);
    let mut cards = Cards::new(deck, source, config.prefetch.clone())?;
    let mut out = std::io::stdout();

    let outcome = tokio::select! {
        res = run::walk(&mut cards, &config, &mut out) => Some(res),
        res = shutdown_signal() => {
            res?;
            None
        }
    };

    // Stops anything still fetching for cards that were never reached.
    cards.shutdown();

    match outcome {
        Some(summary) => {
            let summary = summary?;
            tracing::info!(
                cards = summary.cards,
                words = summary.words,
                resolved = summary.resolved,
                unavailable = summary.unavailable,
                tasks_started = cards.tasks_started(),
                "Deck finished"
            );
        }
        None => {
            tracing::info!(
                position = cards.position(),
                remaining = cards.remaining(),
                "Walk interrupted"
            );
        }
    }

    Ok(())
}

fn log_startup_info(config: &RunConfig, cards: usize) {
    if cfg!(debug_assertions) {
        tracing::info!("Walking {} cards with full config: {:#?}", cards, config);
    } else {
        tracing::info!(
            "Walking {} cards with a lookahead of {}",
            cards,
            config.prefetch.lookahead
        );
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;

    #[cfg(unix)]
    let terminate = async {
        terminate.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("Received SIGTERM signal");
        },
    }

    Ok(())
}
