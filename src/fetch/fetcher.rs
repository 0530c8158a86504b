//! Resilient request execution
//!
//! Every request goes through the same steps:
//! 1. Wait for admission (cooldown, then a concurrency slot)
//! 2. Per attempt: random jitter sleep, then the request under an outer
//!    hard deadline
//! 3. On a retryable failure: ask for a session replacement (first failure
//!    only, even when no attempts are left), back off, try again
//! 4. After the last attempt the failure is returned unchanged

use crate::config::FetcherConfig;
use crate::fetch::admission::Admission;
use crate::fetch::session::{RecoveryReason, Session, SessionPool};
use crate::fetch::task::FetchTask;
use crate::FetchError;
use rand::Rng;
use std::time::Duration;

/// Delay after failed attempt `attempt`, counted from 1
///
/// `unit * (2^attempt + U(0,1))`, so with a one second unit: 2-3s, 4-5s, 8-9s...
pub fn backoff_delay(unit: Duration, attempt: u32) -> Duration {
    let exponent = 2f64.powi(attempt.min(16) as i32);
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    unit.mul_f64(exponent + jitter)
}

/// Executes [`FetchTask`]s against the catalog
///
/// One `Fetcher` is created per run and shared (behind an `Arc`) by every
/// collaborator that needs the network.
pub struct Fetcher {
    config: FetcherConfig,
    sessions: SessionPool,
    admission: Admission,
}

impl Fetcher {
    /// Creates a fetcher with its initial session
    ///
    /// # Arguments
    ///
    /// * `config` - Retry, timeout, concurrency and session settings
    ///
    /// # Returns
    ///
    /// * `Ok(Fetcher)` - Ready to issue requests
    /// * `Err(FetchError::ClientBuild)` - The HTTP client could not be built
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let admission = Admission::new(config.max_concurrency);
        tracing::debug!(
            "Fetcher ready: {} concurrent requests, {} attempts each",
            admission.limit(),
            config.retries.max(1)
        );

        Ok(Self {
            config: config.clone(),
            sessions: SessionPool::new(config)?,
            admission,
        })
    }

    pub fn sessions(&self) -> &SessionPool {
        &self.sessions
    }

    pub fn admission(&self) -> &Admission {
        &self.admission
    }

    /// Issues the request described by `task` and returns the response body
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return body |
    /// | 4xx other than 408/429 | Fail immediately |
    /// | 5xx, 408, 429 | Retry with backoff |
    /// | Transport error or timeout | Retry with backoff |
    /// | Hard deadline exceeded | Abandon attempt, retry with backoff |
    ///
    /// At most `retries` attempts are made. The error of the last attempt is
    /// returned as-is.
    pub async fn fetch(&self, task: &FetchTask) -> Result<String, FetchError> {
        let _permit = self.admission.acquire().await?;
        let retries = self.config.retries.max(1);
        let backoff_unit = Duration::from_millis(self.config.backoff_unit_ms);
        let mut recovery_requested = false;
        let mut attempt = 0;

        loop {
            self.admission.wait_ready().await;
            self.jitter().await;

            let session = self.sessions.current()?;
            tracing::debug!(
                "Fetching {} (attempt {}/{}, session {})",
                task.kind(),
                attempt + 1,
                retries,
                session.generation()
            );

            let result = self.attempt(&session, task).await;
            self.sessions.record_completion(&session);

            let error = match result {
                Ok(body) => return Ok(body),
                Err(e) => e,
            };

            attempt += 1;
            if !error.is_retryable() {
                tracing::warn!("Giving up on {}: {}", task.kind(), error);
                return Err(error);
            }

            if !recovery_requested {
                recovery_requested = true;
                if self
                    .sessions
                    .request_recovery(session.generation(), RecoveryReason::Degraded)
                {
                    self.admission
                        .pause_for(Duration::from_millis(self.config.cooldown_ms));
                }
            }

            if attempt >= retries {
                tracing::warn!(
                    "Giving up on {} after {} attempts: {}",
                    task.kind(),
                    attempt,
                    error
                );
                return Err(error);
            }

            let delay = backoff_delay(backoff_unit, attempt);
            tracing::warn!(
                "Attempt {}/{} for {} failed: {}; retrying in {:?}",
                attempt,
                retries,
                task.kind(),
                error,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// One request under the hard deadline
    async fn attempt(&self, session: &Session, task: &FetchTask) -> Result<String, FetchError> {
        let mut request = session
            .client()
            .request(task.method().clone(), task.url());
        if !task.query().is_empty() {
            request = request.query(task.query());
        }
        if !task.form().is_empty() {
            request = request.form(task.form());
        }
        for (name, value) in task.headers() {
            request = request.header(name.as_str(), value.as_str());
        }

        let work = async {
            let response = request.send().await?.error_for_status()?;
            Ok::<_, FetchError>(response.text().await?)
        };

        let hard_timeout = Duration::from_millis(self.config.hard_timeout_ms);
        match tokio::time::timeout(hard_timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::HardTimeout {
                url: task.url().to_string(),
                timeout: hard_timeout,
            }),
        }
    }

    async fn jitter(&self) {
        if self.config.max_jitter_ms == 0 {
            return;
        }
        let millis = rand::thread_rng().gen_range(0..=self.config.max_jitter_ms);
        tokio::time::sleep(Duration::from_millis(millis)).await;
    }

    /// Releases every session and stops background workers
    ///
    /// Requests issued afterwards fail with [`FetchError::Closed`].
    pub async fn shutdown(&self) {
        self.admission.close();
        self.sessions.shutdown().await;
        tracing::debug!("Fetcher shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_delay_grows_exponentially() {
        let unit = Duration::from_millis(100);

        for attempt in 1..5 {
            let delay = backoff_delay(unit, attempt);
            let base = unit * 2u32.pow(attempt);
            assert!(delay >= base, "attempt {} gave {:?}", attempt, delay);
            assert!(delay < base + unit, "attempt {} gave {:?}", attempt, delay);
        }
    }

    #[test]
    fn test_first_backoff_is_at_least_two_units() {
        let unit = Duration::from_millis(100);
        for _ in 0..20 {
            let delay = backoff_delay(unit, 1);
            assert!(delay >= unit * 2, "first backoff was {:?}", delay);
            assert!(delay < unit * 3, "first backoff was {:?}", delay);
        }
    }

    #[test]
    fn test_backoff_delay_zero_unit() {
        assert_eq!(backoff_delay(Duration::ZERO, 3), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_fetch_after_shutdown_is_closed() {
        let fetcher = Fetcher::new(&FetcherConfig::default()).unwrap();
        fetcher.shutdown().await;

        let task = FetchTask::new(
            reqwest::Method::GET,
            "http://127.0.0.1:9/",
            crate::fetch::TaskKind::SearchPage { year: 2025, page: 1 },
        );
        assert!(matches!(fetcher.fetch(&task).await, Err(FetchError::Closed)));
    }
}
