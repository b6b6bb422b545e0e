//! DeepL v2 translate API. Requires an auth key; keys ending in `:fx`
//! belong to the free tier and use a separate host.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{truncate_body, TranslateError, TranslateRequest, Translator};

const FREE_URL: &str = "https://api-free.deepl.com/v2/translate";
const PRO_URL: &str = "https://api.deepl.com/v2/translate";

pub struct DeepLTranslator {
    http: reqwest::Client,
    api_key: String,
    url: String,
}

impl DeepLTranslator {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        let api_key = api_key.into();
        let url = endpoint_for_key(&api_key).to_string();
        Self { http, api_key, url }
    }
}

fn endpoint_for_key(api_key: &str) -> &'static str {
    if api_key.ends_with(":fx") {
        FREE_URL
    } else {
        PRO_URL
    }
}

#[derive(Serialize)]
struct DeepLRequest<'a> {
    text: [&'a str; 1],
    target_lang: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<&'a str>,
}

#[derive(Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Deserialize)]
struct DeepLTranslation {
    text: String,
}

fn build_body(request: &TranslateRequest) -> DeepLRequest<'_> {
    DeepLRequest {
        text: [request.text.as_str()],
        target_lang: request.target_lang.to_uppercase(),
        context: request.has_context().then_some(request.context.as_str()),
    }
}

#[async_trait]
impl Translator for DeepLTranslator {
    fn service_id(&self) -> &str {
        "deepl"
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
        if self.api_key.trim().is_empty() {
            return Err(TranslateError::MissingCredential { service: "deepl" });
        }

        let response = self
            .http
            .post(&self.url)
            .header("Authorization", format!("DeepL-Auth-Key {}", self.api_key))
            .json(&build_body(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::Status {
                service: "deepl",
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let parsed: DeepLResponse = response.json().await?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| t.text)
            .ok_or_else(|| TranslateError::MalformedResponse {
                service: "deepl",
                reason: "empty translations array".into(),
            })
    }
}
