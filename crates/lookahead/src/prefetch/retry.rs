//! Staggered, jittered retries around a single word fetch.
//!
//! Every word task runs [`RetryPolicy::fetch`]: it first waits
//! `position * stagger_unit` so that the words of a card (and, transitively,
//! the cards of a window) do not hit the remote service at the same instant,
//! then tries the fetch up to `max_attempts` times, sleeping a uniformly random
//! duration in `[backoff_min, backoff_max]` between failures.

use crate::{FetchError, SentenceSource};
use core::time::Duration;
use rand::Rng;
use tokio::{sync::Semaphore, time::sleep};

/// Delay added per word position before a word's first fetch.
pub const DEFAULT_STAGGER_UNIT: Duration = Duration::from_secs(20);

/// Number of attempts before a word's task fails.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Lower bound of the randomized delay between attempts.
pub const DEFAULT_BACKOFF_MIN: Duration = Duration::from_secs(5);

/// Upper bound of the randomized delay between attempts.
pub const DEFAULT_BACKOFF_MAX: Duration = Duration::from_secs(15);

/// Retry behavior of a word task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub stagger_unit: Duration,
    pub max_attempts: u32,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            stagger_unit: DEFAULT_STAGGER_UNIT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_min: DEFAULT_BACKOFF_MIN,
            backoff_max: DEFAULT_BACKOFF_MAX,
        }
    }
}

impl RetryPolicy {
    /// Delay before the first attempt of the word at `position` in its card.
    pub fn stagger_for(&self, position: usize) -> Duration {
        self.stagger_unit
            .saturating_mul(u32::try_from(position).unwrap_or(u32::MAX))
    }

    /// Draws the delay to wait after a failed attempt.
    pub fn backoff(&self) -> Duration {
        if self.backoff_max <= self.backoff_min {
            return self.backoff_min;
        }
        rand::rng().random_range(self.backoff_min..=self.backoff_max)
    }

    /// Fetches `count` sentences for `word`, retrying failures.
    ///
    /// When `permits` is set, each attempt holds one permit for the duration of
    /// the remote call only; stagger and backoff sleeps do not count against
    /// the limit.
    ///
    /// # Errors
    ///
    /// Returns the last [`FetchError`] once `max_attempts` attempts failed.
    pub async fn fetch<S>(
        &self,
        source: &S,
        word: &str,
        count: usize,
        position: usize,
        permits: Option<&Semaphore>,
    ) -> Result<Vec<String>, FetchError>
    where
        S: SentenceSource + ?Sized,
    {
        sleep(self.stagger_for(position)).await;

        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            let outcome = {
                // The semaphore is never closed, so `acquire` cannot fail.
                let _permit = match permits {
                    Some(permits) => permits.acquire().await.ok(),
                    None => None,
                };
                source.fetch_sentences(word, count).await
            };

            match outcome {
                Ok(sentences) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        word,
                        attempt,
                        sentences = sentences.len(),
                        "Fetched sentences"
                    );
                    return Ok(sentences);
                }
                Err(e) if attempt >= attempts => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(word, attempt, error = %e, "Giving up on word");
                    return Err(e);
                }
                Err(_e) => {
                    let delay = self.backoff();
                    #[cfg(feature = "tracing")]
                    tracing::debug!(
                        word,
                        attempt,
                        transient = _e.transient,
                        error = %_e,
                        retry_in = ?delay,
                        "Fetch failed, backing off"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}
