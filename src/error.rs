//! Errors that cross the HTTP boundary.
//!
//! Only two failures are ever reported to callers: an unknown model
//! identifier (client error) and a failed translation (server error).
//! Language detection problems are absorbed by the resolver.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::registry::RegistryError;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unknown model '{model}'. Available: {}", .available.join(", "))]
    UnknownModel {
        model: String,
        available: Vec<String>,
    },

    #[error("Translation failed: {0}")]
    TranslationFailed(String),
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnknownModel { .. } => StatusCode::BAD_REQUEST,
            GatewayError::TranslationFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GatewayError::UnknownModel { .. } => "unknown_model",
            GatewayError::TranslationFailed(_) => "translation_failed",
        }
    }
}

impl From<RegistryError> for GatewayError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownModel { model, available } => {
                GatewayError::UnknownModel { model, available }
            }
            // The caller asked for a valid model; it just could not be brought up.
            load @ RegistryError::LoadFailed { .. } => {
                GatewayError::TranslationFailed(load.to_string())
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    available_models: Option<Vec<String>>,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            detail: self.to_string(),
            available_models: match &self {
                GatewayError::UnknownModel { available, .. } => Some(available.clone()),
                GatewayError::TranslationFailed(_) => None,
            },
        };
        (self.status(), Json(body)).into_response()
    }
}
