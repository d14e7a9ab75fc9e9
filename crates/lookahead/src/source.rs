use crate::FetchError;
use std::sync::Arc;

/// The remote collaborator that produces example sentences for a word.
///
/// Implementations typically wrap a network client and may fail transiently;
/// the prefetcher retries every failure with a jittered backoff before giving
/// up on a word.
///
/// `Send + Sync + 'static` is required because one source is shared by every
/// word task a [`crate::Cards`] spawns.
pub trait SentenceSource: Send + Sync + 'static {
    /// Returns up to `count` example sentences for `word`.
    ///
    /// # Errors
    ///
    /// Returns a [`FetchError`] when the remote call fails.
    fn fetch_sentences(
        &self,
        word: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<String>, FetchError>> + Send;
}

impl<S: SentenceSource> SentenceSource for Arc<S> {
    fn fetch_sentences(
        &self,
        word: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<String>, FetchError>> + Send {
        S::fetch_sentences(self, word, count)
    }
}

/// A [`SentenceSource`] backed by a closure.
///
/// Created with [`source_fn`].
#[derive(Clone)]
pub struct FnSource<F> {
    f: F,
}

/// Wraps `f` so it can be used wherever a [`SentenceSource`] is expected.
///
/// ```
/// use lookahead::{FetchError, source_fn};
///
/// let source = source_fn(|word: String, count: usize| async move {
///     Ok::<_, FetchError>(vec![format!("{word} x{count}")])
/// });
/// # let _ = source;
/// ```
pub fn source_fn<F, Fut>(f: F) -> FnSource<F>
where
    F: Fn(String, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, FetchError>> + Send,
{
    FnSource { f }
}

impl<F, Fut> SentenceSource for FnSource<F>
where
    F: Fn(String, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Vec<String>, FetchError>> + Send,
{
    fn fetch_sentences(
        &self,
        word: &str,
        count: usize,
    ) -> impl Future<Output = Result<Vec<String>, FetchError>> + Send {
        (self.f)(word.to_owned(), count)
    }
}
