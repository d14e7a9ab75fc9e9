//! Cursor over a deck of cards with a warm lookahead window.
//!
//! [`Cards`] hands out cards strictly in deck order. Every time the cursor
//! moves (and once at construction) it refills the window: each of the next
//! `lookahead` cards that has words but no tasks yet gets one
//! [`SentenceTask`] per distinct word. A card's task map is built completely
//! before it is stored, so a card is never observable half-enriched.
//!
//! Cards behind the cursor keep their tasks; nothing is cleared or started
//! twice.

use super::{
    card::{Card, SentenceTask},
    config::PrefetchConfig,
};
use crate::{Error, Result, SentenceSource, Task};
use std::{
    collections::{HashMap, hash_map::Entry},
    sync::Arc,
};
use tokio::{runtime::Handle, sync::Semaphore};
use tokio_util::sync::CancellationToken;

/// A deck of cards whose upcoming words are enriched in the background.
///
/// `Cards` is an [`Iterator`] over [`Card`]s. Calling [`Iterator::next`],
/// [`Cards::has_next`] or [`Cards::remaining`] never blocks; waiting happens
/// only when the consumer calls [`Task::get`] on a word's task.
pub struct Cards<S> {
    cards: Vec<Card>,
    index: usize,
    config: PrefetchConfig,
    source: Arc<S>,
    runtime: Handle,
    scope: CancellationToken,
    permits: Option<Arc<Semaphore>>,
    started: usize,
}

impl<S: SentenceSource> Cards<S> {
    /// Builds the deck and warms the first window.
    ///
    /// Word tasks are spawned on the tokio runtime current at construction,
    /// so later calls to [`Iterator::next`] may come from any thread.
    ///
    /// # Errors
    ///
    /// - [`Error::NoRuntime`] when called outside a tokio runtime.
    /// - [`Error::InvalidConfig`] when `config` fails validation.
    pub fn new<I, C>(deck: I, source: S, config: PrefetchConfig) -> Result<Self>
    where
        I: IntoIterator<Item = C>,
        C: Into<Card>,
    {
        let runtime = Handle::try_current().map_err(|e| Error::NoRuntime {
            reason: e.to_string(),
        })?;
        config.validate()?;

        let permits = config
            .max_in_flight
            .map(|limit| Arc::new(Semaphore::new(limit)));

        let mut cards = Self {
            cards: deck.into_iter().map(Into::into).collect(),
            index: 0,
            config,
            source: Arc::new(source),
            runtime,
            scope: CancellationToken::new(),
            permits,
            started: 0,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            cards = cards.cards.len(),
            lookahead = cards.config.lookahead,
            "Prefetcher created"
        );

        cards.refill();
        Ok(cards)
    }

    /// Starts word tasks for every card in `[index, index + lookahead)` that
    /// has words and no tasks yet.
    fn refill(&mut self) {
        let _guard = self.runtime.enter();

        let end = self
            .index
            .saturating_add(self.config.lookahead)
            .min(self.cards.len());

        for position in self.index..end {
            let card = &self.cards[position];
            if card.words().is_empty() || card.is_enriched() {
                continue;
            }

            let tasks = self.enrich(card);
            self.started += tasks.len();

            #[cfg(feature = "tracing")]
            tracing::trace!(
                card = self.cards[position].id(),
                position,
                tasks = tasks.len(),
                "Card entered the lookahead window"
            );

            self.cards[position].set_tasks(tasks);
        }
    }

    /// Builds the full word to task map for `card`.
    fn enrich(&self, card: &Card) -> HashMap<String, Arc<SentenceTask>> {
        let mut tasks = HashMap::with_capacity(card.words().len());

        for (position, word) in card.words().iter().enumerate() {
            if let Entry::Vacant(slot) = tasks.entry(word.clone()) {
                slot.insert(Arc::new(self.spawn_word(card.id(), word, position)));
            }
        }

        tasks
    }

    fn spawn_word(&self, _card_id: &str, word: &str, position: usize) -> SentenceTask {
        let source = Arc::clone(&self.source);
        let permits = self.permits.clone();
        let policy = self.config.retry.clone();
        let count = self.config.sentences_per_word;
        let word = word.to_owned();

        #[cfg(feature = "tracing")]
        let span = tracing::debug_span!("enrich", card = _card_id, word = %word, position);

        Task::spawn_with_parent(&self.scope, move |_token| {
            let fut = async move {
                policy
                    .fetch(&*source, &word, count, position, permits.as_deref())
                    .await
            };
            #[cfg(feature = "tracing")]
            let fut = {
                use tracing::Instrument;
                fut.instrument(span)
            };
            fut
        })
    }
}

impl<S> Cards<S> {
    /// Returns `true` while cards remain to be handed out.
    pub fn has_next(&self) -> bool {
        self.index < self.cards.len()
    }

    /// Number of cards not yet handed out.
    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.index)
    }

    /// Index of the next card [`Iterator::next`] will return.
    pub fn position(&self) -> usize {
        self.index
    }

    /// Total number of cards in the deck.
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if the deck has no cards at all.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// The card at `index`, whether or not it has been handed out.
    pub fn card(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    /// Total number of word tasks started so far.
    pub fn tasks_started(&self) -> usize {
        self.started
    }

    /// The configuration the prefetcher was built with.
    pub fn config(&self) -> &PrefetchConfig {
        &self.config
    }

    /// The root scope every word task is a child of.
    pub fn scope(&self) -> &CancellationToken {
        &self.scope
    }

    /// Abandons every outstanding word task.
    ///
    /// Tasks still running stop, and their next [`Task::get`] reports
    /// [`Error::ContextClosed`]. Outcomes already delivered are unaffected.
    /// Dropping `Cards` does not do this implicitly, so cards already handed
    /// out stay usable.
    pub fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            remaining = self.remaining(),
            started = self.started,
            "Abandoning outstanding word tasks"
        );
        self.scope.cancel();
    }
}

impl<S: SentenceSource> Iterator for Cards<S> {
    type Item = Card;

    /// Hands out the card under the cursor, advances, and refills the window.
    ///
    /// Returns `None` once every card has been handed out.
    fn next(&mut self) -> Option<Card> {
        let card = self.cards.get(self.index)?.clone();
        self.index += 1;
        self.refill();
        Some(card)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}

impl<S: SentenceSource> ExactSizeIterator for Cards<S> {}

impl<S> core::fmt::Debug for Cards<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Cards")
            .field("len", &self.cards.len())
            .field("index", &self.index)
            .field("config", &self.config)
            .field("started", &self.started)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FetchError, source_fn};
    use core::time::Duration;
    use portable_atomic::{AtomicUsize, Ordering};
    use std::{collections::HashSet, sync::Mutex};
    use tokio::time::sleep;

    type Calls = Arc<Mutex<Vec<String>>>;

    fn recording_source(calls: Calls) -> impl SentenceSource {
        source_fn(move |word: String, count: usize| {
            let calls = Arc::clone(&calls);
            async move {
                calls.lock().unwrap().push(word.clone());
                Ok::<_, FetchError>((0..count).map(|i| format!("{word} #{i}")).collect())
            }
        })
    }

    fn deck(cards: usize, words: usize) -> Vec<Card> {
        (0..cards)
            .map(|c| Card::new(format!("c{c}"), (0..words).map(|w| format!("c{c}w{w}"))))
            .collect()
    }

    fn config(lookahead: usize) -> PrefetchConfig {
        PrefetchConfig {
            lookahead,
            sentences_per_word: 2,
            ..PrefetchConfig::default()
        }
    }

    fn enriched(cards: &Cards<impl SentenceSource>) -> Vec<usize> {
        (0..cards.len())
            .filter(|&i| cards.card(i).is_some_and(Card::is_enriched))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn construction_warms_first_window() {
        let calls = Calls::default();
        let cards = Cards::new(deck(5, 2), recording_source(calls), config(2)).unwrap();

        assert_eq!(enriched(&cards), vec![0, 1]);
        assert_eq!(cards.card(0).unwrap().task_count(), 2);
        assert_eq!(cards.card(1).unwrap().task_count(), 2);
        assert_eq!(cards.tasks_started(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn advancing_extends_window_and_keeps_history() {
        let calls = Calls::default();
        let mut cards = Cards::new(deck(5, 2), recording_source(calls), config(2)).unwrap();

        let first = cards.next().unwrap();
        assert_eq!(first.id(), "c0");
        assert_eq!(enriched(&cards), vec![0, 1, 2]);
        assert_eq!(cards.tasks_started(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn window_tracks_cursor_until_exhausted() {
        let calls = Calls::default();
        let (n, lookahead) = (7, 3);
        let mut cards = Cards::new(deck(n, 2), recording_source(calls), config(lookahead)).unwrap();

        loop {
            let upper = (cards.position() + lookahead).min(n);
            assert_eq!(enriched(&cards), (0..upper).collect::<Vec<_>>());
            if cards.next().is_none() {
                break;
            }
        }
        assert_eq!(cards.tasks_started(), n * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn remaining_decreases_by_one_per_card() {
        let calls = Calls::default();
        let mut cards = Cards::new(deck(3, 1), recording_source(calls), config(1)).unwrap();

        for expected in (0..3).rev() {
            assert!(cards.has_next());
            assert!(cards.next().is_some());
            assert_eq!(cards.remaining(), expected);
            assert_eq!(cards.len(), 3);
        }

        assert!(!cards.has_next());
        assert!(cards.next().is_none());
        assert!(cards.next().is_none());
        assert_eq!(cards.remaining(), 0);
        assert_eq!(cards.position(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cards_without_words_are_skipped() {
        let calls = Calls::default();
        let deck = vec![
            Card::new("empty", Vec::<String>::new()),
            Card::new("full", ["hola"]),
        ];
        let cards = Cards::new(deck, recording_source(calls), config(2)).unwrap();

        assert_eq!(enriched(&cards), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_words_share_one_task() {
        let calls = Calls::default();
        let deck = vec![Card::new("c", ["ser", "estar", "ser"])];
        let mut cards = Cards::new(deck, recording_source(Arc::clone(&calls)), config(1)).unwrap();

        let card = cards.next().unwrap();
        assert_eq!(card.task_count(), 2);
        assert_eq!(card.tasks().map(|(w, _)| w).collect::<Vec<_>>(), ["ser", "estar"]);

        for (_, task) in card.tasks() {
            task.get(Duration::from_secs(60)).await.unwrap();
        }
        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.iter().collect::<HashSet<_>>().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn handed_out_card_shares_tasks_with_deck() {
        let calls = Calls::default();
        let mut cards = Cards::new(deck(2, 1), recording_source(calls), config(1)).unwrap();

        let card = cards.next().unwrap();
        let handed = card.task("c0w0").unwrap();
        let kept = cards.card(0).unwrap().task("c0w0").unwrap();
        assert!(Arc::ptr_eq(handed, kept));

        let sentences = handed.get(Duration::from_secs(1)).await.unwrap();
        assert_eq!(sentences, ["c0w0 #0", "c0w0 #1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn words_within_a_card_are_staggered() {
        let started = Arc::new(Mutex::new(Vec::new()));
        let source = source_fn({
            let started = Arc::clone(&started);
            move |word: String, _count: usize| {
                let started = Arc::clone(&started);
                async move {
                    started
                        .lock()
                        .unwrap()
                        .push((word.clone(), tokio::time::Instant::now()));
                    Ok::<_, FetchError>(vec![word])
                }
            }
        });
        let origin = tokio::time::Instant::now();
        let mut cards = Cards::new(vec![Card::new("c", ["a", "b", "c"])], source, config(1)).unwrap();

        let card = cards.next().unwrap();
        for (_, task) in card.tasks() {
            task.get(Duration::from_secs(120)).await.unwrap();
        }

        let started = started.lock().unwrap();
        let offset = |word: &str| {
            started
                .iter()
                .find(|(w, _)| w == word)
                .map(|(_, at)| at.duration_since(origin))
                .unwrap()
        };
        let ms = |d: Duration| d.as_millis();
        assert_eq!(ms(offset("a")), 0);
        assert_eq!(ms(offset("b")), 20_000);
        assert_eq!(ms(offset("c")), 40_000);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_outstanding_tasks() {
        let source = source_fn(|word: String, _count: usize| async move {
            sleep(Duration::from_secs(3600)).await;
            Ok::<_, FetchError>(vec![word])
        });
        let mut cards = Cards::new(deck(3, 1), source, config(3)).unwrap();

        let card = cards.next().unwrap();
        cards.shutdown();

        let err = card
            .task("c0w0")
            .unwrap()
            .get(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, Error::ContextClosed);
        assert!(cards.scope().is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_limit_applies_across_cards() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let source = source_fn({
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            move |word: String, _count: usize| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_secs(1)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, FetchError>(vec![word])
                }
            }
        });
        let config = PrefetchConfig {
            max_in_flight: Some(1),
            ..config(4)
        };
        let cards = Cards::new(deck(4, 1), source, config).unwrap();

        for card in cards {
            card.task(&card.words()[0])
                .unwrap()
                .get(Duration::from_secs(60))
                .await
                .unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn requires_a_runtime() {
        let calls = Calls::default();
        let err = Cards::new(deck(1, 1), recording_source(calls), config(1)).unwrap_err();
        assert!(matches!(err, Error::NoRuntime { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn rejects_invalid_config() {
        let calls = Calls::default();
        let mut config = config(1);
        config.retry.max_attempts = 0;

        let err = Cards::new(deck(1, 1), recording_source(calls), config).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig { .. }));
    }
}
