//! Batched per-movie detail fetching.
//!
//! Listing endpoints do not carry runtimes, so every listed movie needs a
//! detail request. Requests go out in fixed-size batches: the movies within a
//! batch are fetched concurrently, batches run one after another with a short
//! pause in between, and rate-limited requests are retried with backoff.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, warn};

use super::error::{TmdbError, TmdbResult};
use super::types::MovieDetail;

/// Anything that can produce the detail record of a single movie.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn movie_detail(&self, id: u64) -> TmdbResult<MovieDetail>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based). The upstream hint is a
    /// lower bound; exponential growth takes over once it exceeds the hint.
    pub fn backoff(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let exponential = self.base_delay.saturating_mul(1u32 << exponent);
        let hinted = retry_after.unwrap_or(Duration::ZERO);
        exponential.max(hinted).min(self.max_delay)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichOptions {
    pub batch_size: usize,
    pub batch_delay: Duration,
    pub retry: RetryPolicy,
}

impl Default for EnrichOptions {
    fn default() -> Self {
        Self {
            batch_size: 5,
            batch_delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        }
    }
}

/// Fetch details for `ids`, in input order. Items that fail for any reason
/// come back as [`MovieDetail::fallback`].
pub async fn enrich<S>(source: &S, ids: &[u64], options: &EnrichOptions) -> Vec<MovieDetail>
where
    S: DetailSource + ?Sized,
{
    let batch_size = options.batch_size.max(1);
    let mut details = Vec::with_capacity(ids.len());

    for (index, batch) in ids.chunks(batch_size).enumerate() {
        if index > 0 && !options.batch_delay.is_zero() {
            tokio::time::sleep(options.batch_delay).await;
        }

        debug!(batch = index, size = batch.len(), "Fetching movie details");

        let results = join_all(
            batch
                .iter()
                .map(|&id| fetch_with_retry(source, id, &options.retry)),
        )
        .await;

        for (&id, result) in batch.iter().zip(results) {
            match result {
                Ok(detail) => details.push(detail),
                Err(e) => {
                    warn!(movie_id = id, error = %e, "Movie detail unavailable, using defaults");
                    details.push(MovieDetail::fallback(id));
                }
            }
        }
    }

    details
}

/// Fetch one detail record, retrying rate-limited requests up to the policy's
/// attempt cap. Once the cap is reached the `RateLimited` error is returned.
pub async fn fetch_with_retry<S>(
    source: &S,
    id: u64,
    policy: &RetryPolicy,
) -> TmdbResult<MovieDetail>
where
    S: DetailSource + ?Sized,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match source.movie_detail(id).await {
            Err(TmdbError::RateLimited { retry_after }) if attempt < max_attempts => {
                let wait = policy.backoff(attempt, retry_after);
                warn!(
                    movie_id = id,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited fetching movie detail, backing off"
                );
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Start(u64),
        Finish(u64),
    }

    /// Records request start/finish order and fails a configurable set of ids.
    #[derive(Default)]
    struct RecordingSource {
        events: Mutex<Vec<Event>>,
        failing: Vec<u64>,
        rate_limits: Mutex<HashMap<u64, u32>>,
    }

    #[async_trait]
    impl DetailSource for RecordingSource {
        async fn movie_detail(&self, id: u64) -> TmdbResult<MovieDetail> {
            self.events.lock().unwrap().push(Event::Start(id));
            tokio::time::sleep(Duration::from_millis(5 + id % 3)).await;
            self.events.lock().unwrap().push(Event::Finish(id));

            if let Some(remaining) = self.rate_limits.lock().unwrap().get_mut(&id) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(TmdbError::RateLimited {
                        retry_after: Some(Duration::ZERO),
                    });
                }
            }
            if self.failing.contains(&id) {
                return Err(TmdbError::Upstream(500));
            }
            Ok(MovieDetail {
                id,
                runtime: 90 + id as u32,
                ..Default::default()
            })
        }
    }

    struct InstantSource;

    #[async_trait]
    impl DetailSource for InstantSource {
        async fn movie_detail(&self, id: u64) -> TmdbResult<MovieDetail> {
            Ok(MovieDetail::fallback(id))
        }
    }

    fn fast_options(batch_size: usize) -> EnrichOptions {
        EnrichOptions {
            batch_size,
            batch_delay: Duration::from_millis(1),
            retry: RetryPolicy {
                max_attempts: 5,
                base_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(10),
            },
        }
    }

    #[tokio::test]
    async fn test_batches_run_strictly_in_sequence() {
        let source = RecordingSource::default();
        let ids: Vec<u64> = (1..=12).collect();

        let details = enrich(&source, &ids, &fast_options(5)).await;
        assert_eq!(details.len(), 12);
        assert_eq!(details.iter().map(|d| d.id).collect::<Vec<_>>(), ids);

        let events = source.events.lock().unwrap().clone();
        let position = |event: Event| events.iter().position(|e| *e == event).unwrap();

        let batches: Vec<&[u64]> = ids.chunks(5).collect();
        assert_eq!(batches.iter().map(|b| b.len()).collect::<Vec<_>>(), vec![5, 5, 2]);

        for pair in batches.windows(2) {
            let last_finish = pair[0].iter().map(|&id| position(Event::Finish(id))).max().unwrap();
            let first_start = pair[1].iter().map(|&id| position(Event::Start(id))).min().unwrap();
            assert!(last_finish < first_start, "batch started before previous one completed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_only_between_batches() {
        let options = EnrichOptions {
            batch_size: 5,
            batch_delay: Duration::from_millis(500),
            retry: RetryPolicy::default(),
        };
        let ids: Vec<u64> = (1..=12).collect();

        let started = tokio::time::Instant::now();
        let details = enrich(&InstantSource, &ids, &options).await;
        assert_eq!(details.len(), 12);
        assert_eq!(started.elapsed(), Duration::from_millis(1000));

        let started = tokio::time::Instant::now();
        enrich(&InstantSource, &[1, 2, 3, 4, 5], &options).await;
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_items_within_batch_run_concurrently() {
        let source = RecordingSource::default();
        enrich(&source, &[1, 2, 3], &fast_options(5)).await;

        let events = source.events.lock().unwrap().clone();
        let starts = events[..3].iter().filter(|e| matches!(e, Event::Start(_))).count();
        assert_eq!(starts, 3);
    }

    #[tokio::test]
    async fn test_failure_is_isolated_per_item() {
        let source = RecordingSource {
            failing: vec![2],
            ..Default::default()
        };
        let details = enrich(&source, &[1, 2, 3], &fast_options(5)).await;

        assert_eq!(details[0].runtime, 91);
        assert_eq!(details[1], MovieDetail::fallback(2));
        assert_eq!(details[2].runtime, 93);
    }

    #[tokio::test]
    async fn test_rate_limited_item_is_retried() {
        let source = RecordingSource::default();
        source.rate_limits.lock().unwrap().insert(4, 2);

        let detail = fetch_with_retry(&source, 4, &fast_options(5).retry).await.unwrap();
        assert_eq!(detail.runtime, 94);

        let starts = source
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| **e == Event::Start(4))
            .count();
        assert_eq!(starts, 3);
    }

    #[tokio::test]
    async fn test_retry_cap_surfaces_rate_limited() {
        let source = RecordingSource::default();
        source.rate_limits.lock().unwrap().insert(9, u32::MAX);

        let result = fetch_with_retry(&source, 9, &fast_options(5).retry).await;
        assert!(matches!(result, Err(ref e) if e.is_rate_limited()));
        assert_eq!(source.events.lock().unwrap().len(), 10);

        let details = enrich(&source, &[9], &fast_options(5)).await;
        assert_eq!(details, vec![MovieDetail::fallback(9)]);
    }

    #[test]
    fn test_backoff_growth() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        };
        assert_eq!(policy.backoff(1, None), Duration::from_secs(1));
        assert_eq!(policy.backoff(2, None), Duration::from_secs(2));
        assert_eq!(policy.backoff(3, Some(Duration::from_secs(1))), Duration::from_secs(4));
        assert_eq!(policy.backoff(1, Some(Duration::from_secs(3))), Duration::from_secs(3));
        assert_eq!(policy.backoff(8, None), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_empty_ids() {
        let source = RecordingSource::default();
        assert!(enrich(&source, &[], &fast_options(5)).await.is_empty());
    }
}
