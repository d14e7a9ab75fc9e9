use core::time::Duration;
use lookahead::{FetchError, SentenceSource};
use rand::Rng;

/// Stand-in for the remote sentence service.
///
/// Every call waits `latency` (jittered by up to 50%) and then fails with
/// probability `failure_rate`, otherwise it returns `count` generated
/// sentences.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedSource {
    pub const fn new(latency: Duration, failure_rate: f64) -> Self {
        Self {
            latency,
            failure_rate,
        }
    }

    /// Draws the latency and outcome of one call up front so that no RNG
    /// handle is held across an await point.
    fn roll(&self) -> (Duration, bool) {
        let mut rng = rand::rng();
        let jitter = rng.random_range(0.5..=1.5);
        (
            self.latency.mul_f64(jitter),
            rng.random_bool(self.failure_rate),
        )
    }
}

impl SentenceSource for SimulatedSource {
    async fn fetch_sentences(&self, word: &str, count: usize) -> Result<Vec<String>, FetchError> {
        let (latency, fails) = self.roll();
        tokio::time::sleep(latency).await;

        if fails {
            return Err(FetchError::transient(word, "simulated upstream failure"));
        }

        Ok((1..=count)
            .map(|i| format!("Example {i} using \"{word}\"."))
            .collect())
    }
}
