use crate::{FetchError, Task};
use std::{collections::HashMap, sync::Arc};

/// The task enriching a single word with example sentences.
pub type SentenceTask = Task<Vec<String>, FetchError>;

/// A flashcard: an identifier and the ordered words that need sentences.
///
/// Once the card enters the lookahead window it holds one [`SentenceTask`]
/// per distinct word. Clones share those tasks, so the card handed out by
/// [`crate::Cards`] and the one kept inside it observe the same outcomes.
#[derive(Clone, Debug)]
pub struct Card {
    id: String,
    words: Vec<String>,
    tasks: HashMap<String, Arc<SentenceTask>>,
}

impl Card {
    pub fn new<I, W>(id: impl Into<String>, words: I) -> Self
    where
        I: IntoIterator<Item = W>,
        W: Into<String>,
    {
        Self {
            id: id.into(),
            words: words.into_iter().map(Into::into).collect(),
            tasks: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The card's words in their original order, duplicates included.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// The task enriching `word`, if the card has been enriched and contains
    /// the word.
    pub fn task(&self, word: &str) -> Option<&Arc<SentenceTask>> {
        self.tasks.get(word)
    }

    /// Yields each word with its task, in card order, skipping repeated
    /// words.
    pub fn tasks(&self) -> impl Iterator<Item = (&str, &Arc<SentenceTask>)> {
        let mut seen = Vec::with_capacity(self.tasks.len());
        self.words.iter().filter_map(move |word| {
            if seen.contains(&word) {
                return None;
            }
            seen.push(word);
            self.tasks.get(word).map(|task| (word.as_str(), task))
        })
    }

    /// Number of word tasks started for this card.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Returns `true` once word tasks have been started for this card.
    pub fn is_enriched(&self) -> bool {
        !self.tasks.is_empty()
    }

    pub(crate) fn set_tasks(&mut self, tasks: HashMap<String, Arc<SentenceTask>>) {
        debug_assert!(self.tasks.is_empty(), "card enriched twice");
        self.tasks = tasks;
    }
}

impl<I, W, T> From<(I, W)> for Card
where
    I: Into<String>,
    W: IntoIterator<Item = T>,
    T: Into<String>,
{
    fn from((id, words): (I, W)) -> Self {
        Self::new(id, words)
    }
}
