//! Dispatch of store mutations as observable background tasks.
//!
//! A dispatched write keeps running even if the caller stops waiting for it,
//! but its outcome is always available through [`PendingWrite`]. Transient
//! store failures are retried with exponential backoff before surfacing as
//! `StoreUnavailable`.

use crate::config::WriteRetry;
use crate::error::{Error, Result};
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

const MAX_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct WriteDispatcher {
    retry: WriteRetry,
}

impl WriteDispatcher {
    pub fn new(retry: WriteRetry) -> Self {
        Self { retry }
    }

    /// Spawns `op` and retries it on transient errors.
    ///
    /// `op` receives the 1-based attempt number so idempotency decisions can
    /// take earlier, possibly-applied attempts into account.
    pub fn dispatch<T, F, Fut>(&self, label: &'static str, op: F) -> PendingWrite<T>
    where
        T: Send + 'static,
        F: Fn(u32) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let retry = self.retry;
        let handle = tokio::spawn(async move {
            let mut attempt = 1;
            loop {
                match op(attempt).await {
                    Ok(value) => return Ok(value),
                    Err(e) if e.is_transient() && attempt < retry.max_attempts => {
                        let delay = backoff_delay(retry.base_delay, attempt);
                        tracing::warn!(
                            write = label,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "store write failed; retrying"
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    Err(e) if e.is_transient() => {
                        tracing::error!(write = label, attempts = attempt, error = %e, "store write failed");
                        return Err(Error::StoreUnavailable(format!(
                            "{} failed after {} attempt(s): {}",
                            label, attempt, e
                        )));
                    }
                    Err(e) => return Err(e),
                }
            }
        });
        PendingWrite { label, handle }
    }
}

fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exp = base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
    let capped = exp.min(MAX_BACKOFF);
    let jitter_ms = (capped.as_millis() as u64) / 4;
    let jitter = if jitter_ms == 0 {
        0
    } else {
        rand::thread_rng().gen_range(0..=jitter_ms)
    };
    capped + Duration::from_millis(jitter)
}

/// Handle to an in-flight write.
#[derive(Debug)]
pub struct PendingWrite<T> {
    label: &'static str,
    handle: JoinHandle<Result<T>>,
}

impl<T> PendingWrite<T> {
    pub fn label(&self) -> &'static str {
        self.label
    }

    pub async fn outcome(self) -> Result<T> {
        match self.handle.await {
            Ok(result) => result,
            Err(e) => Err(Error::Internal(format!("{} task aborted: {}", self.label, e))),
        }
    }
}
