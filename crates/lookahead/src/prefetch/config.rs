use super::retry::RetryPolicy;
use crate::{Error, Result};

/// Number of cards kept warm ahead of the cursor by default.
pub const DEFAULT_LOOKAHEAD: usize = 3;

/// Number of sentences requested per word by default.
pub const DEFAULT_SENTENCES_PER_WORD: usize = 5;

/// Tuning knobs of a [`crate::Cards`] prefetcher.
///
/// `lookahead` is the main admission control: up to `lookahead` times the
/// average number of words per card fetches run at once. `max_in_flight`
/// optionally caps the remote calls of one prefetcher regardless of window
/// size; `None` leaves the window as the only bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefetchConfig {
    pub lookahead: usize,
    pub sentences_per_word: usize,
    pub retry: RetryPolicy,
    pub max_in_flight: Option<usize>,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            lookahead: DEFAULT_LOOKAHEAD,
            sentences_per_word: DEFAULT_SENTENCES_PER_WORD,
            retry: RetryPolicy::default(),
            max_in_flight: None,
        }
    }
}

impl PrefetchConfig {
    /// Checks the configuration for values that would make word tasks
    /// misbehave.
    ///
    /// A `lookahead` of zero is accepted and disables prefetching entirely.
    pub fn validate(&self) -> Result<()> {
        if self.sentences_per_word == 0 {
            return Err(Error::InvalidConfig {
                reason: "sentences_per_word must be greater than 0".to_string(),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::InvalidConfig {
                reason: "max_attempts must be greater than 0".to_string(),
            });
        }
        if self.retry.backoff_min > self.retry.backoff_max {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "backoff_min ({:?}) exceeds backoff_max ({:?})",
                    self.retry.backoff_min, self.retry.backoff_max
                ),
            });
        }
        if self.max_in_flight == Some(0) {
            return Err(Error::InvalidConfig {
                reason: "max_in_flight must be greater than 0 when set".to_string(),
            });
        }
        Ok(())
    }
}
