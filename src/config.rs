use anyhow::{bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

/// Model identifier used when a request does not name one.
pub const DEFAULT_MODEL: &str = "m2m_100_418M";

/// Identifiers served when `AVAILABLE_MODELS` is not set.
pub const DEFAULT_AVAILABLE_MODELS: &[&str] = &["m2m_100_418M", "m2m_100_1.2B"];

/// Whether calls into one loaded model may overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelConcurrency {
    /// One in-flight call per model handle
    #[default]
    Serialize,
    /// Any number of in-flight calls per model handle
    Parallel,
}

impl FromStr for ModelConcurrency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "serialize" | "serial" => Ok(Self::Serialize),
            "parallel" => Ok(Self::Parallel),
            other => bail!(
                "Invalid MODEL_CONCURRENCY '{}'. Expected 'serialize' or 'parallel'",
                other
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Models
    pub default_model: String,
    pub available_models: Vec<String>,
    pub model_server_url: String,

    // Invocation
    pub max_concurrent_translations: usize,
    pub model_concurrency: ModelConcurrency,
    pub translation_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            default_model: DEFAULT_MODEL.to_string(),
            available_models: DEFAULT_AVAILABLE_MODELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            model_server_url: "http://127.0.0.1:24080".to_string(),
            max_concurrent_translations: 4,
            model_concurrency: ModelConcurrency::Serialize,
            translation_timeout: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let available_models = match std::env::var("AVAILABLE_MODELS") {
            Ok(list) => parse_model_list(&list),
            Err(_) => defaults.available_models,
        };

        let config = Self {
            // Server
            port: std::env::var("PORT")
                .ok()
                .map(|v| v.trim().parse::<u16>().context("PORT must be a valid port number"))
                .transpose()?
                .unwrap_or(defaults.port),

            // Models
            default_model: std::env::var("DEFAULT_MODEL")
                .map(|v| v.trim().to_string())
                .unwrap_or(defaults.default_model),
            available_models,
            model_server_url: std::env::var("MODEL_SERVER_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.model_server_url),

            // Invocation
            max_concurrent_translations: std::env::var("MAX_CONCURRENT_TRANSLATIONS")
                .ok()
                .map(|v| {
                    v.trim()
                        .parse::<usize>()
                        .context("MAX_CONCURRENT_TRANSLATIONS must be a positive integer")
                })
                .transpose()?
                .unwrap_or(defaults.max_concurrent_translations)
                .max(1),
            model_concurrency: std::env::var("MODEL_CONCURRENCY")
                .ok()
                .map(|v| v.parse::<ModelConcurrency>())
                .transpose()?
                .unwrap_or(defaults.model_concurrency),
            translation_timeout: std::env::var("TRANSLATION_TIMEOUT_SECS")
                .ok()
                .map(|v| {
                    v.trim()
                        .parse::<u64>()
                        .context("TRANSLATION_TIMEOUT_SECS must be a whole number of seconds")
                })
                .transpose()?
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the model set is usable.
    pub fn validate(&self) -> Result<()> {
        if self.available_models.is_empty() {
            bail!("AVAILABLE_MODELS must list at least one model");
        }
        if !self.available_models.contains(&self.default_model) {
            bail!(
                "DEFAULT_MODEL '{}' is not one of AVAILABLE_MODELS ({})",
                self.default_model,
                self.available_models.join(", ")
            );
        }
        Ok(())
    }
}

/// Split a comma-separated model list, dropping blanks and duplicates.
fn parse_model_list(list: &str) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for id in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !models.iter().any(|m| m == id) {
            models.push(id.to_string());
        }
    }
    models
}
