//! Model registry: lazily loaded, process-wide model handles.
//!
//! The set of identifiers is fixed at construction. Each identifier owns one
//! `OnceCell` slot, so concurrent first requests for the same model share a
//! single load and every caller observes the same handle. Handles are never
//! evicted.

use crate::config::{Config, ModelConcurrency};
use crate::model::{ModelLoader, TranslationModel};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, OnceCell};
use tracing::{error, info};

#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    #[error("Unknown model '{model}'")]
    UnknownModel {
        model: String,
        available: Vec<String>,
    },

    #[error("Failed to load model '{model}': {cause}")]
    LoadFailed { model: String, cause: String },
}

/// A loaded model bound to its identifier.
///
/// Cloning is cheap; all clones share the model and its call gate.
#[derive(Clone)]
pub struct ModelHandle {
    id: Arc<str>,
    model: Arc<dyn TranslationModel>,
    gate: Option<Arc<Mutex<()>>>,
}

impl ModelHandle {
    pub fn new(
        id: &str,
        model: Arc<dyn TranslationModel>,
        concurrency: ModelConcurrency,
    ) -> Self {
        let gate = match concurrency {
            ModelConcurrency::Serialize => Some(Arc::new(Mutex::new(()))),
            ModelConcurrency::Parallel => None,
        };
        Self {
            id: Arc::from(id),
            model,
            gate,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn model(&self) -> &Arc<dyn TranslationModel> {
        &self.model
    }

    pub fn is_serialized(&self) -> bool {
        self.gate.is_some()
    }

    /// Wait for exclusive use of the model when calls are serialized.
    pub async fn acquire(&self) -> Option<MutexGuard<'_, ()>> {
        match &self.gate {
            Some(gate) => Some(gate.lock().await),
            None => None,
        }
    }

    pub fn same_model(&self, other: &ModelHandle) -> bool {
        Arc::ptr_eq(&self.model, &other.model)
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("id", &self.id)
            .field("serialized", &self.is_serialized())
            .finish()
    }
}

pub struct ModelRegistry {
    /// Configured identifiers, in configuration order
    available: Vec<String>,
    slots: HashMap<String, OnceCell<ModelHandle>>,
    loader: Arc<dyn ModelLoader>,
    concurrency: ModelConcurrency,
}

impl ModelRegistry {
    pub fn new(
        available: Vec<String>,
        loader: Arc<dyn ModelLoader>,
        concurrency: ModelConcurrency,
    ) -> Self {
        let slots = available
            .iter()
            .map(|id| (id.clone(), OnceCell::new()))
            .collect();
        Self {
            available,
            slots,
            loader,
            concurrency,
        }
    }

    pub fn from_config(config: &Config, loader: Arc<dyn ModelLoader>) -> Self {
        Self::new(
            config.available_models.clone(),
            loader,
            config.model_concurrency,
        )
    }

    /// Reject identifiers that are not configured. Never loads anything.
    pub fn ensure_available(&self, model_id: &str) -> Result<(), RegistryError> {
        self.slot(model_id).map(|_| ())
    }

    /// Return the handle for `model_id`, loading it on first use.
    pub async fn get(&self, model_id: &str) -> Result<ModelHandle, RegistryError> {
        let slot = self.slot(model_id)?;

        slot.get_or_try_init(|| self.load(model_id))
            .await
            .cloned()
    }

    fn slot(&self, model_id: &str) -> Result<&OnceCell<ModelHandle>, RegistryError> {
        self.slots
            .get(model_id)
            .ok_or_else(|| RegistryError::UnknownModel {
                model: model_id.to_string(),
                available: self.available.clone(),
            })
    }

    async fn load(&self, model_id: &str) -> Result<ModelHandle, RegistryError> {
        info!("Loading model {}", model_id);
        let started = Instant::now();

        match self.loader.load(model_id).await {
            Ok(model) => {
                info!(
                    "Loaded model {} in {:.2}s",
                    model_id,
                    started.elapsed().as_secs_f64()
                );
                Ok(ModelHandle::new(model_id, model, self.concurrency))
            }
            Err(e) => {
                error!("Failed to load model {}: {:#}", model_id, e);
                Err(RegistryError::LoadFailed {
                    model: model_id.to_string(),
                    cause: format!("{:#}", e),
                })
            }
        }
    }

    pub fn is_available(&self, model_id: &str) -> bool {
        self.slots.contains_key(model_id)
    }

    pub fn available_models(&self) -> &[String] {
        &self.available
    }

    /// Identifiers with a cached handle, sorted.
    pub fn loaded_models(&self) -> Vec<String> {
        let mut loaded: Vec<String> = self
            .slots
            .iter()
            .filter(|(_, slot)| slot.initialized())
            .map(|(id, _)| id.clone())
            .collect();
        loaded.sort();
        loaded
    }
}
