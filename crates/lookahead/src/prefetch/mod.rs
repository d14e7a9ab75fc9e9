//! Lookahead prefetching of flashcard enrichment.
//!
//! ## Structure
//!
//! - [`card`] - a flashcard and its per-word tasks.
//! - [`cards`] - the cursor and window refill logic ([`Cards`]).
//! - [`config`] - tuning knobs ([`PrefetchConfig`]).
//! - [`retry`] - staggered, jittered retries around one word fetch.

pub mod card;
pub mod cards;
pub mod config;
pub mod retry;

pub use card::{Card, SentenceTask};
pub use cards::Cards;
pub use config::{DEFAULT_LOOKAHEAD, DEFAULT_SENTENCES_PER_WORD, PrefetchConfig};
pub use retry::{
    DEFAULT_BACKOFF_MAX, DEFAULT_BACKOFF_MIN, DEFAULT_MAX_ATTEMPTS, DEFAULT_STAGGER_UNIT,
    RetryPolicy,
};
