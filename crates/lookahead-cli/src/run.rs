//! The deck walk: hand out cards in order and resolve each word's sentences.

use crate::config::RunConfig;
use core::time::Duration;
use lookahead::{Cards, Error, FetchError, SentenceSource, SentenceTask};
use std::io::Write;

/// Counters reported once the walk ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    pub cards: usize,
    pub words: usize,
    pub resolved: usize,
    pub unavailable: usize,
}

/// Walks every remaining card of `cards`, printing sentences to `out`.
///
/// A word whose sentences do not arrive in time is waited on again up to
/// `config.get_retries` times; after that, or on any other error, it is shown
/// as unavailable and the walk moves on.
pub async fn walk<S, W>(
    cards: &mut Cards<S>,
    config: &RunConfig,
    out: &mut W,
) -> anyhow::Result<WalkSummary>
where
    S: SentenceSource,
    W: Write,
{
    let mut summary = WalkSummary::default();

    for card in cards.by_ref() {
        summary.cards += 1;
        writeln!(out, "== card {} ==", card.id())?;

        if !card.words().is_empty() && !card.is_enriched() {
            tracing::warn!(card = card.id(), "Card was not prefetched (lookahead is 0)");
        }

        for (word, task) in card.tasks() {
            summary.words += 1;
            match resolve(task, config.get_timeout, config.get_retries).await {
                Ok(sentences) => {
                    summary.resolved += 1;
                    writeln!(out, "  {word}")?;
                    for sentence in sentences {
                        writeln!(out, "    - {sentence}")?;
                    }
                }
                Err(e) => {
                    summary.unavailable += 1;
                    writeln!(out, "  {word}: unavailable ({e})")?;
                }
            }
        }
    }

    Ok(summary)
}

/// Waits on `task`, re-waiting after timeouts.
async fn resolve(
    task: &SentenceTask,
    timeout: Duration,
    retries: u32,
) -> Result<Vec<String>, Error<FetchError>> {
    let mut waits = 0;
    loop {
        match task.get(timeout).await {
            Err(e) if e.is_retryable() && waits < retries => {
                waits += 1;
                tracing::info!(waits, "Sentences not ready yet, waiting again");
            }
            outcome => return outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookahead::{Card, PrefetchConfig, RetryPolicy};
    use std::path::PathBuf;

    struct Fixed;

    impl SentenceSource for Fixed {
        async fn fetch_sentences(
            &self,
            word: &str,
            _count: usize,
        ) -> Result<Vec<String>, FetchError> {
            if word == "roto" {
                return Err(FetchError::permanent(word, "no sentences"));
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(vec![format!("{word}!")])
        }
    }

    fn run_config(get_timeout: Duration, get_retries: u32) -> RunConfig {
        RunConfig {
            deck: PathBuf::from("unused.json"),
            prefetch: PrefetchConfig {
                lookahead: 2,
                retry: RetryPolicy {
                    stagger_unit: Duration::ZERO,
                    max_attempts: 1,
                    ..RetryPolicy::default()
                },
                ..PrefetchConfig::default()
            },
            get_timeout,
            get_retries,
            latency: Duration::ZERO,
            failure_rate: 0.0,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn walks_every_card_and_reports_failures() {
        let config = run_config(Duration::from_secs(1), 5);
        let deck = vec![Card::new("1", ["sol", "roto"]), Card::new("2", ["luna"])];
        let mut cards = Cards::new(deck, Fixed, config.prefetch.clone()).unwrap();
        let mut out = Vec::new();

        let summary = walk(&mut cards, &config, &mut out).await.unwrap();

        assert_eq!(
            summary,
            WalkSummary {
                cards: 2,
                words: 3,
                resolved: 2,
                unavailable: 1,
            }
        );
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("    - sol!"));
        assert!(out.contains("roto: unavailable"));
        assert!(!cards.has_next());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_retries_run_out() {
        let config = run_config(Duration::from_millis(100), 1);
        let deck = vec![Card::new("1", ["sol"])];
        let mut cards = Cards::new(deck, Fixed, config.prefetch.clone()).unwrap();
        let mut out = Vec::new();

        let summary = walk(&mut cards, &config, &mut out).await.unwrap();

        assert_eq!(summary.unavailable, 1);
        assert!(String::from_utf8(out).unwrap().contains("timeout expired"));
    }
}
