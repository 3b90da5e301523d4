//! Seams to the neural translation model.
//!
//! The gateway never runs a model itself. A [`ModelLoader`] brings a model
//! identifier up once and hands back a [`TranslationModel`] that the
//! registry caches for the lifetime of the process.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Decoding search width passed to every model call (greedy decoding).
pub const GREEDY_BEAM_SIZE: u32 = 1;

/// A loaded translation model.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    /// Translate `text` from `source_lang` into `target_lang`.
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        beam_size: u32,
    ) -> Result<String>;
}

/// Performs the expensive load of a model by identifier.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn TranslationModel>>;
}
