//! Runs model calls on a bounded pool of worker tasks.

use crate::config::Config;
use crate::model::GREEDY_BEAM_SIZE;
use crate::registry::ModelHandle;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::error;

/// Any failure of one model invocation, with its cause.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TranslationFailed(pub String);

pub struct Invoker {
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl Invoker {
    pub fn new(max_concurrent: usize, timeout: Option<Duration>) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_concurrent_translations, config.translation_timeout)
    }

    /// Translate `text` with the model behind `handle`.
    ///
    /// The call runs on its own task; the caller only awaits the join.
    /// A serialized model's gate is taken before the pool permit, so
    /// callers queued on one busy model never hold permits another
    /// model could use.
    pub async fn invoke(
        &self,
        handle: &ModelHandle,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<String, TranslationFailed> {
        let permits = Arc::clone(&self.permits);
        let handle = handle.clone();
        let text = text.to_string();
        let source = source_lang.to_string();
        let target = target_lang.to_string();
        let timeout = self.timeout;

        let task = tokio::spawn(async move {
            let _exclusive = handle.acquire().await;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => return Err(anyhow::anyhow!("worker pool closed: {}", e)),
            };
            let call = handle
                .model()
                .translate(&text, &source, &target, GREEDY_BEAM_SIZE);

            match timeout {
                Some(limit) => match tokio::time::timeout(limit, call).await {
                    Ok(result) => result,
                    Err(_) => Err(anyhow::anyhow!(
                        "timed out after {}s",
                        limit.as_secs_f64()
                    )),
                },
                None => call.await,
            }
        });

        let outcome = match task.await {
            Ok(Ok(translated)) => return Ok(translated),
            Ok(Err(e)) => format!("{:#}", e),
            Err(join_error) if join_error.is_panic() => "model call panicked".to_string(),
            Err(join_error) => format!("model call aborted: {}", join_error),
        };

        error!(
            "Translation {} -> {} failed: {}",
            source_lang, target_lang, outcome
        );
        Err(TranslationFailed(outcome))
    }

    /// Permits currently free in the pool.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }
}
