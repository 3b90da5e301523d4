//! Backoff while waiting for the model server to finish loading a model.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// How long to keep probing a model server that is not ready yet.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Probes per load, counting the first; never below 1
    pub max_attempts: u32,
    /// Wait after the first failed probe, doubled after each further one
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryConfig {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
            max_delay: Duration::from_secs(30),
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// 5 probes, waiting 1s, 2s, 4s, 8s in between (15s total).
    pub fn model_load() -> Self {
        Self::new(5, Duration::from_secs(1)).with_max_delay(Duration::from_secs(8))
    }

    /// Wait before the next probe once `failed` probes have failed (1-based).
    fn delay_after(&self, failed: u32) -> Duration {
        let factor = 1u32.checked_shl(failed.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::model_load()
    }
}

/// Errors that may clear up if the same request is sent again later.
pub trait Transient {
    fn is_transient(&self) -> bool;
}

/// Run `probe` until it succeeds, fails permanently, or the attempts run out.
///
/// The last error is returned unchanged.
pub async fn retry_transient<T, E, F, Fut>(
    config: &RetryConfig,
    model_id: &str,
    mut probe: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Transient + Display,
{
    let mut failed = 0u32;
    loop {
        let error = match probe().await {
            Ok(value) => {
                if failed > 0 {
                    info!("Model {} ready after {} failed probe(s)", model_id, failed);
                }
                return Ok(value);
            }
            Err(error) => error,
        };
        failed += 1;

        if !error.is_transient() {
            warn!("Model {} cannot be loaded: {}", model_id, error);
            return Err(error);
        }
        if failed >= config.max_attempts {
            warn!(
                "Model {} still not ready after {} probe(s): {}",
                model_id, failed, error
            );
            return Err(error);
        }

        let delay = config.delay_after(failed);
        warn!(
            "Model {} not ready ({}), probing again in {:?}",
            model_id, error, delay
        );
        sleep(delay).await;
    }
}
