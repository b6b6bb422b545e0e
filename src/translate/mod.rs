//! Translation provider contract and the network-adapter layer.
//! Adapters: Google (unofficial endpoint), DeepL, LibreTranslate.
//! The pipeline only sees `dyn Translator`; provider request shapes stay here.

pub mod cache;
pub mod deepl;
pub mod google;
pub mod libre;
pub mod service;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::settings::Settings;

pub use service::TranslationService;

/// One line (or block) to translate, with prior captions as context.
#[derive(Debug, Clone)]
pub struct TranslateRequest {
    pub text: String,
    pub target_lang: String,
    /// Earlier confirmed captions joined with spaces. Empty when none.
    pub context: String,
}

impl TranslateRequest {
    pub fn new(text: impl Into<String>, target_lang: impl Into<String>, context: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target_lang: target_lang.into(),
            context: context.into(),
        }
    }

    pub fn has_context(&self) -> bool {
        !self.context.trim().is_empty()
    }
}

/// Translator trait (adapter for different backends).
#[async_trait]
pub trait Translator: Send + Sync {
    /// Stable identifier used in cache keys ("google", "deepl", "libre").
    fn service_id(&self) -> &str;

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError>;
}

/// Builds the translator matching a settings snapshot.
pub trait TranslatorFactory: Send + Sync {
    fn translator_for(&self, settings: &Settings) -> Arc<dyn Translator>;
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("{service} returned status {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed {service} response: {reason}")]
    MalformedResponse {
        service: &'static str,
        reason: String,
    },

    #[error("{service} requires a credential but none is configured")]
    MissingCredential { service: &'static str },
}

impl TranslateError {
    /// Configuration problems are not transient; the next caption will fail the same way.
    pub fn is_configuration(&self) -> bool {
        matches!(self, TranslateError::MissingCredential { .. })
    }
}

/// Shorten response bodies before they land in errors and logs.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(200).collect()
}
