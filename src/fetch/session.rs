//! HTTP session lifecycle
//!
//! All requests share one connection pool (a `reqwest::Client`). A pool can go
//! bad under a burst of upstream errors, so it is treated as a replaceable
//! resource:
//! - the first retryable failure of a request asks for a replacement
//! - a pool that served `recycle-after` requests is replaced proactively
//! - replacements run on a tracked background worker, at most one at a time
//!   and at most one per `recovery-interval-ms`
//! - the old pool lives on for `grace-period-ms` so in-flight requests finish

use crate::config::FetcherConfig;
use crate::FetchError;
use reqwest::{redirect::Policy, Client};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Why a session replacement was requested
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryReason {
    /// A request failed with a retryable error
    Degraded,
    /// The session reached its request budget
    Recycle,
}

/// One connection pool and its usage counter
pub struct Session {
    client: Client,
    generation: u64,
    completed: AtomicU64,
}

impl Session {
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

/// Builds an HTTP client for the catalog
///
/// Redirects are not followed and the user agent is set per request.
///
/// # Arguments
///
/// * `config` - Fetcher settings (timeouts, pooling, TLS)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &FetcherConfig) -> Result<Client, reqwest::Error> {
    let idle_per_host = if config.force_close {
        0
    } else {
        config.max_idle_connections
    };

    Client::builder()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
        .redirect(Policy::none())
        .pool_max_idle_per_host(idle_per_host)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

struct PoolInner {
    config: FetcherConfig,
    current: RwLock<Arc<Session>>,
    generation: watch::Sender<u64>,
    recovery_guard: Arc<AsyncMutex<()>>,
    last_recovery: Mutex<Option<Instant>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

/// Owner of the shared session and its replacement workers
pub struct SessionPool {
    inner: Arc<PoolInner>,
}

impl SessionPool {
    pub fn new(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(FetchError::ClientBuild)?;
        let session = Arc::new(Session {
            client,
            generation: 0,
            completed: AtomicU64::new(0),
        });

        Ok(Self {
            inner: Arc::new(PoolInner {
                config: config.clone(),
                current: RwLock::new(session),
                generation: watch::Sender::new(0),
                recovery_guard: Arc::new(AsyncMutex::new(())),
                last_recovery: Mutex::new(None),
                workers: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Session new requests should use
    pub fn current(&self) -> Result<Arc<Session>, FetchError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(FetchError::Closed);
        }
        let current = self
            .inner
            .current
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(&current))
    }

    /// Generation of the installed session, bumped by every replacement
    pub fn generation(&self) -> u64 {
        *self.inner.generation.borrow()
    }

    /// Counts a finished request against its session's budget
    ///
    /// Every completion past the budget asks for a recycle, so a request
    /// refused by the rate limit is repeated until one is accepted.
    pub fn record_completion(&self, session: &Session) {
        let completed = session.completed.fetch_add(1, Ordering::AcqRel) + 1;
        if completed >= self.inner.config.recycle_after
            && self.request_recovery(session.generation, RecoveryReason::Recycle)
        {
            tracing::info!(
                "Session {} served {} requests, recycling",
                session.generation,
                completed
            );
        }
    }

    /// Schedules replacement of the session observed at `observed_generation`
    ///
    /// Returns `true` if a replacement worker was started. Requests are
    /// ignored when the session was already replaced, when another
    /// replacement is running, when the last one started less than
    /// `recovery-interval-ms` ago, or after shutdown.
    pub fn request_recovery(&self, observed_generation: u64, reason: RecoveryReason) -> bool {
        let inner = &self.inner;

        if inner.closed.load(Ordering::Acquire) {
            return false;
        }

        if !self.is_current(observed_generation, reason) {
            return false;
        }

        match Arc::clone(&inner.recovery_guard).try_lock_owned() {
            Ok(guard) => self.start_recovery(guard, observed_generation, reason),
            Err(_) => false,
        }
    }

    /// Second half of [`request_recovery`](Self::request_recovery), run while
    /// holding the recovery guard
    fn start_recovery(
        &self,
        guard: OwnedMutexGuard<()>,
        observed_generation: u64,
        reason: RecoveryReason,
    ) -> bool {
        let inner = &self.inner;

        // A worker may have installed a replacement between the check and the lock
        if !self.is_current(observed_generation, reason) {
            return false;
        }

        {
            let mut last = inner
                .last_recovery
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let interval = Duration::from_millis(inner.config.recovery_interval_ms);
            if let Some(previous) = *last {
                if previous.elapsed() < interval {
                    tracing::debug!("Recovery requested too soon after the previous one");
                    return false;
                }
            }
            *last = Some(Instant::now());
        }

        tracing::warn!(
            "Replacing session {} ({:?})",
            observed_generation,
            reason
        );

        let worker_inner = Arc::clone(inner);
        let handle = tokio::spawn(async move {
            let client = match build_http_client(&worker_inner.config) {
                Ok(client) => client,
                Err(e) => {
                    tracing::error!("Failed to build replacement session: {}", e);
                    return;
                }
            };

            let generation = observed_generation + 1;
            let fresh = Arc::new(Session {
                client,
                generation,
                completed: AtomicU64::new(0),
            });

            let old = {
                let mut current = worker_inner
                    .current
                    .write()
                    .unwrap_or_else(PoisonError::into_inner);
                std::mem::replace(&mut *current, fresh)
            };
            worker_inner.generation.send_replace(generation);
            drop(guard);

            tracing::info!("Installed session {}", generation);

            let grace = Duration::from_millis(worker_inner.config.grace_period_ms);
            tokio::time::sleep(grace).await;
            tracing::debug!(
                "Closing session {} after {} requests",
                old.generation,
                old.completed()
            );
            drop(old);
        });

        let mut workers = inner.workers.lock().unwrap_or_else(PoisonError::into_inner);
        workers.retain(|worker| !worker.is_finished());
        workers.push(handle);

        true
    }

    fn is_current(&self, observed_generation: u64, reason: RecoveryReason) -> bool {
        if observed_generation == self.generation() {
            return true;
        }
        tracing::debug!(
            "Session {} already replaced, ignoring {:?} request",
            observed_generation,
            reason
        );
        false
    }

    /// Waits until the session generation reaches at least `generation`
    ///
    /// Returns `false` if that did not happen within `timeout`.
    pub async fn wait_for_generation(&self, generation: u64, timeout: Duration) -> bool {
        let mut installed = self.inner.generation.subscribe();
        let reached = matches!(
            tokio::time::timeout(timeout, installed.wait_for(|current| *current >= generation))
                .await,
            Ok(Ok(_))
        );
        reached
    }

    /// Stops replacement workers and refuses further sessions
    ///
    /// Pending replacements are aborted and joined, which releases any
    /// pool they were holding.
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::Release);

        let workers: Vec<_> = {
            let mut workers = self
                .inner
                .workers
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            workers.drain(..).collect()
        };

        for worker in workers {
            worker.abort();
            if let Err(e) = worker.await {
                if !e.is_cancelled() {
                    tracing::error!("Session worker failed: {}", e);
                }
            }
        }
    }
}

impl Drop for SessionPool {
    fn drop(&mut self) {
        let mut workers = self
            .inner
            .workers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for worker in workers.drain(..) {
            worker.abort();
        }
    }
}
