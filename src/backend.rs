//! Client for an out-of-process model server.
//!
//! The server hosts the neural models and exposes:
//! - `GET  {url}/model_name?model={id}` readiness probe, answered once the
//!   model is loaded with the name(s) of the hosted models
//! - `POST {url}/translate`  `{ text, source_lang, target_lang, beam_size, model }`
//!   returning `{ "translated": "..." }` (or a list of segments)

use crate::model::{ModelLoader, TranslationModel};
use crate::retry::{retry_transient, RetryConfig, Transient};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    text: &'a str,
    source_lang: &'a str,
    target_lang: &'a str,
    beam_size: u32,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    translated: Translated,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Translated {
    One(String),
    Segments(Vec<String>),
}

impl Translated {
    fn into_text(self) -> Option<String> {
        match self {
            Translated::One(text) => Some(text),
            Translated::Segments(segments) if segments.is_empty() => None,
            Translated::Segments(segments) => Some(segments.join("\n")),
        }
    }
}

/// Failure of the readiness probe.
#[derive(Debug, Error)]
enum ProbeError {
    #[error("model server unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("model server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("model server does not host '{model}' (serving: {served})")]
    NotServed { model: String, served: String },
}

/// Booting or overloaded servers are probed again; a 4xx or a missing model is final.
impl Transient for ProbeError {
    fn is_transient(&self) -> bool {
        match self {
            ProbeError::Transport(_) => true,
            ProbeError::Status { status, .. } => *status == 429 || *status >= 500,
            ProbeError::NotServed { .. } => false,
        }
    }
}

/// Whether a `/model_name` answer lists `model_id`.
///
/// The body is one name, or several separated by commas or newlines. An
/// empty body means the server does not report names and is trusted.
fn serves_model(body: &str, model_id: &str) -> bool {
    let mut names = body
        .split(|c: char| c == ',' || c == '\n')
        .map(|name| name.trim().trim_matches('"'))
        .filter(|name| !name.is_empty())
        .peekable();

    names.peek().is_none() || names.any(|name| name == model_id)
}

/// Loads models by waiting for the model server to report ready.
pub struct RemoteModelLoader {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl RemoteModelLoader {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build model server HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::model_load(),
        })
    }

    /// Override the readiness retry policy
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    async fn probe(&self, model_id: &str) -> Result<(), ProbeError> {
        let response = self
            .client
            .get(format!("{}/model_name", self.base_url))
            .query(&[("model", model_id)])
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));

        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if !serves_model(&body, model_id) {
            return Err(ProbeError::NotServed {
                model: model_id.to_string(),
                served: body.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ModelLoader for RemoteModelLoader {
    async fn load(&self, model_id: &str) -> Result<Arc<dyn TranslationModel>> {
        retry_transient(&self.retry, model_id, || self.probe(model_id))
            .await
        .with_context(|| format!("Model server at {} is not ready", self.base_url))?;

        Ok(Arc::new(RemoteModel {
            client: self.client.clone(),
            translate_url: format!("{}/translate", self.base_url),
            model_id: model_id.to_string(),
        }))
    }
}

/// A model hosted by the model server.
pub struct RemoteModel {
    client: reqwest::Client,
    translate_url: String,
    model_id: String,
}

#[async_trait]
impl TranslationModel for RemoteModel {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        beam_size: u32,
    ) -> Result<String> {
        let body = TranslateBody {
            text,
            source_lang,
            target_lang,
            beam_size,
            model: &self.model_id,
        };

        debug!(
            "Sending {} chars to {} ({} -> {})",
            text.len(),
            self.model_id,
            source_lang,
            target_lang
        );

        let response = self
            .client
            .post(&self.translate_url)
            .json(&body)
            .send()
            .await
            .context("Failed to send translation request to model server")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            bail!("Model server error ({}): {}", status, body);
        }

        let parsed: TranslateResponse = response
            .json()
            .await
            .context("Failed to parse model server translation response")?;

        parsed
            .translated
            .into_text()
            .context("Model server response contained no translation")
    }
}
