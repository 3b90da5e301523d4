//! The translate operation: model selection, language resolution,
//! invocation and response shaping.

use crate::config::Config;
use crate::detect::LanguageDetector;
use crate::error::GatewayError;
use crate::invoker::Invoker;
use crate::metrics::GatewayMetrics;
use crate::model::ModelLoader;
use crate::registry::{ModelRegistry, RegistryError};
use crate::resolve::{resolve, SourceOrigin};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

pub const PASSTHROUGH_NOTE: &str =
    "Source language is English and no target_lang was provided; no translation performed.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    /// Skips auto-detection when given
    #[serde(default)]
    pub source_lang: Option<String>,
    /// Defaults to English unless the source is English
    #[serde(default)]
    pub target_lang: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translation: String,
    pub model: String,
    pub source_lang: String,
    pub target_lang: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_seconds: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub default_model: String,
    pub loaded_models: Vec<String>,
}

/// Seconds between two instants of the same clock, never negative.
fn elapsed_seconds(started_at: DateTime<Utc>, finished_at: DateTime<Utc>) -> f64 {
    let micros = (finished_at - started_at).num_microseconds().unwrap_or(0);
    (micros.max(0) as f64) / 1_000_000.0
}

pub struct TranslationService {
    default_model: String,
    registry: ModelRegistry,
    invoker: Invoker,
    detector: Arc<dyn LanguageDetector>,
    metrics: GatewayMetrics,
}

impl TranslationService {
    pub fn new(
        default_model: impl Into<String>,
        registry: ModelRegistry,
        invoker: Invoker,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            default_model: default_model.into(),
            registry,
            invoker,
            detector,
            metrics: GatewayMetrics::new(),
        }
    }

    pub fn from_config(
        config: &Config,
        loader: Arc<dyn ModelLoader>,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self::new(
            config.default_model.clone(),
            ModelRegistry::from_config(config, loader),
            Invoker::from_config(config),
            detector,
        )
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &GatewayMetrics {
        &self.metrics
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "ok".to_string(),
            default_model: self.default_model.clone(),
            loaded_models: self.registry.loaded_models(),
        }
    }

    pub async fn translate(
        &self,
        request: TranslationRequest,
    ) -> Result<TranslationResult, GatewayError> {
        self.metrics.record_request();

        let model_name = request
            .model
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(&self.default_model)
            .to_string();

        if let Err(e) = self.registry.ensure_available(&model_name) {
            self.metrics.record_unknown_model();
            return Err(e.into());
        }

        let resolution = resolve(
            self.detector.as_ref(),
            &request.text,
            request.source_lang.as_deref(),
            request.target_lang.as_deref(),
        );
        if resolution.source_origin == SourceOrigin::Fallback {
            self.metrics.record_detection_fallback();
        }
        let languages = resolution.languages;

        if languages.passthrough {
            let at = Utc::now();
            info!("Text is English and no target_lang provided; returning original text without translation");
            self.metrics.record_passthrough();

            return Ok(TranslationResult {
                translation: request.text,
                model: model_name,
                source_lang: languages.source_lang,
                target_lang: languages.target_lang,
                started_at: at,
                finished_at: at,
                duration_seconds: 0.0,
                note: Some(PASSTHROUGH_NOTE.to_string()),
            });
        }

        let handle = match self.registry.get(&model_name).await {
            Ok(handle) => handle,
            Err(e) => {
                if let RegistryError::UnknownModel { .. } = e {
                    self.metrics.record_unknown_model();
                } else {
                    self.metrics.record_translation_failure();
                }
                return Err(e.into());
            }
        };

        let started_at = Utc::now();
        let outcome = self
            .invoker
            .invoke(
                &handle,
                &request.text,
                &languages.source_lang,
                &languages.target_lang,
            )
            .await;
        let finished_at = Utc::now();

        let translation = match outcome {
            Ok(translation) => translation,
            Err(e) => {
                self.metrics.record_translation_failure();
                return Err(GatewayError::TranslationFailed(e.0));
            }
        };

        let duration_seconds = elapsed_seconds(started_at, finished_at);
        self.metrics.record_translation();
        info!(
            "Translation {} -> {} using {} took {:.3} seconds",
            languages.source_lang, languages.target_lang, model_name, duration_seconds
        );

        Ok(TranslationResult {
            translation,
            model: model_name,
            source_lang: languages.source_lang,
            target_lang: languages.target_lang,
            started_at,
            finished_at,
            duration_seconds,
            note: None,
        })
    }
}
