//! Single-slot result cache with expiry

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::trace;

struct Cached<T> {
    value: Arc<T>,
    computed_at: Instant,
}

/// Holds the last computed value for `timeout`.
///
/// The lock is held while computing, so concurrent callers wait for the run
/// in flight and then share its value instead of starting their own.
pub struct TimedCache<T> {
    timeout: Duration,
    slot: Mutex<Option<Cached<T>>>,
}

impl<T> TimedCache<T> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slot: Mutex::new(None),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Return the cached value if it is fresh, otherwise compute and store a
    /// new one. Failures are returned to the caller and never cached.
    pub async fn get_or_compute<F, Fut, E>(&self, compute: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            let age = cached.computed_at.elapsed();
            if age <= self.timeout {
                trace!(age = ?age, "Serving cached value");
                return Ok(cached.value.clone());
            }
        }

        let value = Arc::new(compute().await?);
        *slot = Some(Cached {
            value: value.clone(),
            computed_at: Instant::now(),
        });
        Ok(value)
    }
}
