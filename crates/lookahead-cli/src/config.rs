use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use lookahead::{
    DEFAULT_BACKOFF_MAX, DEFAULT_BACKOFF_MIN, DEFAULT_LOOKAHEAD, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_SENTENCES_PER_WORD, DEFAULT_STAGGER_UNIT, PrefetchConfig, RetryPolicy,
};
use std::path::PathBuf;

/// Runtime configuration for the `lookahead` binary.
///
/// Every value can be passed as a CLI flag or an environment variable (a
/// `.env` file in the working directory is loaded first). Prefetch defaults
/// match the library defaults; the simulation knobs only affect the built-in
/// sentence source.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "lookahead",
    version,
    about = "Walks a flashcard deck while prefetching example sentences"
)]
pub struct CliArgs {
    /// Path to a JSON deck: `[{"id": "1", "words": ["hola", "adiós"]}, ...]`.
    ///
    /// Environment variable: `DECK`
    #[arg(long, env = "DECK")]
    pub deck: PathBuf,

    /// Number of upcoming cards whose words are fetched in the background.
    ///
    /// Larger values hide more latency but raise burst concurrency against
    /// the sentence service.
    ///
    /// Environment variable: `LOOKAHEAD`
    #[arg(long, env = "LOOKAHEAD", default_value_t = DEFAULT_LOOKAHEAD)]
    pub lookahead: usize,

    /// Number of sentences requested for each word.
    ///
    /// Environment variable: `SENTENCES_PER_WORD`
    #[arg(long, env = "SENTENCES_PER_WORD", default_value_t = DEFAULT_SENTENCES_PER_WORD)]
    pub sentences_per_word: usize,

    /// Delay, in milliseconds, added per word position before its first fetch.
    ///
    /// Environment variable: `STAGGER_MS`
    #[arg(long, env = "STAGGER_MS", default_value_t = DEFAULT_STAGGER_UNIT.as_millis() as u64)]
    pub stagger_ms: u64,

    /// Fetch attempts per word before giving up.
    ///
    /// Environment variable: `MAX_ATTEMPTS`
    #[arg(long, env = "MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Lower bound, in milliseconds, of the jittered delay between attempts.
    ///
    /// Environment variable: `BACKOFF_MIN_MS`
    #[arg(long, env = "BACKOFF_MIN_MS", default_value_t = DEFAULT_BACKOFF_MIN.as_millis() as u64)]
    pub backoff_min_ms: u64,

    /// Upper bound, in milliseconds, of the jittered delay between attempts.
    ///
    /// Environment variable: `BACKOFF_MAX_MS`
    #[arg(long, env = "BACKOFF_MAX_MS", default_value_t = DEFAULT_BACKOFF_MAX.as_millis() as u64)]
    pub backoff_max_ms: u64,

    /// Cap on concurrent sentence fetches. `0` leaves the lookahead window as
    /// the only bound.
    ///
    /// Environment variable: `MAX_IN_FLIGHT`
    #[arg(long, env = "MAX_IN_FLIGHT", default_value_t = 0)]
    pub max_in_flight: usize,

    /// How long, in milliseconds, to wait for one word's sentences before
    /// moving on.
    ///
    /// Environment variable: `GET_TIMEOUT_MS`
    #[arg(long, env = "GET_TIMEOUT_MS", default_value_t = 30_000)]
    pub get_timeout_ms: u64,

    /// Additional waits on a word after its first wait timed out.
    ///
    /// Environment variable: `GET_RETRIES`
    #[arg(long, env = "GET_RETRIES", default_value_t = 1)]
    pub get_retries: u32,

    /// Simulated sentence service latency in milliseconds.
    ///
    /// Environment variable: `LATENCY_MS`
    #[arg(long, env = "LATENCY_MS", default_value_t = 250)]
    pub latency_ms: u64,

    /// Probability in `[0, 1]` that a simulated fetch fails.
    ///
    /// Environment variable: `FAILURE_RATE`
    #[arg(long, env = "FAILURE_RATE", default_value_t = 0.1)]
    pub failure_rate: f64,
}

/// Validated configuration derived from [`CliArgs`].
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub deck: PathBuf,
    pub prefetch: PrefetchConfig,
    pub get_timeout: Duration,
    pub get_retries: u32,
    pub latency: Duration,
    pub failure_rate: f64,
}

impl TryFrom<CliArgs> for RunConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if !(0.0..=1.0).contains(&args.failure_rate) {
            bail!(
                "FAILURE_RATE ({}) must be between 0 and 1",
                args.failure_rate
            );
        }

        if args.get_timeout_ms == 0 {
            bail!("GET_TIMEOUT_MS must be greater than 0");
        }

        let prefetch = PrefetchConfig {
            lookahead: args.lookahead,
            sentences_per_word: args.sentences_per_word,
            retry: RetryPolicy {
                stagger_unit: Duration::from_millis(args.stagger_ms),
                max_attempts: args.max_attempts,
                backoff_min: Duration::from_millis(args.backoff_min_ms),
                backoff_max: Duration::from_millis(args.backoff_max_ms),
            },
            max_in_flight: (args.max_in_flight > 0).then_some(args.max_in_flight),
        };
        prefetch.validate()?;

        Ok(Self {
            deck: args.deck,
            prefetch,
            get_timeout: Duration::from_millis(args.get_timeout_ms),
            get_retries: args.get_retries,
            latency: Duration::from_millis(args.latency_ms),
            failure_rate: args.failure_rate,
        })
    }
}
