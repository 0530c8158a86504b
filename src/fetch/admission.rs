//! Global admission control for outgoing requests
//!
//! Two gates sit in front of every request:
//! - a semaphore bounding how many requests are in flight at once
//! - a pause deadline set while a degraded session is being replaced

use crate::FetchError;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;

/// Concurrency limiter with a cooldown switch
pub struct Admission {
    /// Global semaphore for limiting concurrent requests
    semaphore: Arc<Semaphore>,

    /// Maximum concurrent requests
    limit: usize,

    /// New requests wait until this instant passes
    paused_until: Mutex<Option<Instant>>,
}

impl Admission {
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
            paused_until: Mutex::new(None),
        }
    }

    /// Waits for the cooldown to pass and for a free slot
    ///
    /// The permit releases the slot when dropped. Fails only once the
    /// limiter has been closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, FetchError> {
        loop {
            self.wait_ready().await;

            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| FetchError::Closed)?;

            // A pause may have started while we were queued for a slot
            if !self.is_paused() {
                return Ok(permit);
            }
        }
    }

    /// Sleeps until no cooldown is active
    pub async fn wait_ready(&self) {
        while let Some(until) = self.pause_deadline() {
            tracing::debug!(
                "Admission paused, waiting {:?}",
                until.saturating_duration_since(Instant::now())
            );
            tokio::time::sleep_until(until).await;
        }
    }

    /// Holds back new requests for `duration`; an existing longer pause is kept
    pub fn pause_for(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        let until = Instant::now() + duration;
        let mut paused = self.paused_until.lock().unwrap_or_else(PoisonError::into_inner);
        if paused.map_or(true, |current| current < until) {
            *paused = Some(until);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.pause_deadline().is_some()
    }

    fn pause_deadline(&self) -> Option<Instant> {
        let mut paused = self.paused_until.lock().unwrap_or_else(PoisonError::into_inner);
        match *paused {
            Some(until) if until > Instant::now() => Some(until),
            Some(_) => {
                *paused = None;
                None
            }
            None => None,
        }
    }

    /// Number of requests that could start right now
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Rejects all current and future waiters
    pub fn close(&self) {
        self.semaphore.close();
    }
}
