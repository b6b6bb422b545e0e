//! LibreTranslate (self-hosted or public instance). No context support.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{truncate_body, TranslateError, TranslateRequest, Translator};

pub struct LibreTranslator {
    http: reqwest::Client,
    base_url: String,
}

impl LibreTranslator {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }
}

#[derive(Serialize)]
struct LibreRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
}

#[derive(Deserialize)]
struct LibreResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[async_trait]
impl Translator for LibreTranslator {
    fn service_id(&self) -> &str {
        "libre"
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
        let response = self
            .http
            .post(format!("{}/translate", self.base_url))
            .json(&LibreRequest {
                q: &request.text,
                source: "auto",
                target: &request.target_lang,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                service: "libre",
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let bytes = response.bytes().await?;
        let parsed: LibreResponse =
            serde_json::from_slice(&bytes).map_err(|e| TranslateError::MalformedResponse {
                service: "libre",
                reason: e.to_string(),
            })?;
        Ok(parsed.translated_text)
    }
}
