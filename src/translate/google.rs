//! Google Translate via the public `translate_a/single` endpoint (no key).
//! Context is sent inline ahead of a `|||` separator and cut off again
//! from the response.

use async_trait::async_trait;
use serde_json::Value;

use super::{truncate_body, TranslateError, TranslateRequest, Translator};

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com";
const CONTEXT_SEPARATOR: &str = "|||";

pub struct GoogleTranslator {
    http: reqwest::Client,
    base_url: String,
}

impl GoogleTranslator {
    pub fn new(http: reqwest::Client) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    fn service_id(&self) -> &str {
        "google"
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
        let query = compose_query(request);

        let response = self
            .http
            .get(format!("{}/translate_a/single", self.base_url))
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", request.target_lang.as_str()),
                ("dt", "t"),
                ("q", query.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                service: "google",
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let data: Value = response.json().await?;
        parse_response(&data, request)
    }
}

/// Text actually sent upstream: `"{context} ||| {text}"` when context exists.
fn compose_query(request: &TranslateRequest) -> String {
    if request.has_context() {
        format!("{} {} {}", request.context, CONTEXT_SEPARATOR, request.text)
    } else {
        request.text.clone()
    }
}

/// The payload is nested arrays; segment text lives at `data[0][i][0]`.
fn parse_response(data: &Value, request: &TranslateRequest) -> Result<String, TranslateError> {
    let segments = data
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::MalformedResponse {
            service: "google",
            reason: "missing segment array".into(),
        })?;

    let mut translation: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();

    if request.has_context() && translation.contains(CONTEXT_SEPARATOR) {
        translation = translation
            .rsplit(CONTEXT_SEPARATOR)
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
    }

    if translation.is_empty() {
        Ok(request.text.clone())
    } else {
        Ok(translation)
    }
}
