//! Log output for the `lookahead` binary.
//!
//! Events are printed to stderr through `tracing_subscriber::fmt`, leaving
//! stdout to the walk itself. The verbosity is controlled with `RUST_LOG` and
//! defaults to `info`, e.g.
//!
//! ```bash
//! RUST_LOG=lookahead=debug lookahead --deck deck.json
//! ```
//!
//! At `debug`, every fetch attempt and backoff of the prefetcher is logged
//! inside an `enrich` span naming the card, word and word position.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true)
                .with_writer(std::io::stderr),
        )
        .try_init()?;

    Ok(())
}
