//! Network-adapter layer: one pooled HTTP client, one process-wide cache,
//! and a factory that turns a settings snapshot into a ready translator.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use super::cache::TranslationCache;
use super::deepl::DeepLTranslator;
use super::google::GoogleTranslator;
use super::libre::LibreTranslator;
use super::{TranslateError, TranslateRequest, Translator, TranslatorFactory};
use crate::settings::{ServiceKind, Settings};

pub struct TranslationService {
    http: reqwest::Client,
    cache: Arc<TranslationCache>,
}

impl TranslationService {
    pub fn new(http_timeout: Duration, cache_capacity: usize) -> Result<Self, TranslateError> {
        let http = reqwest::Client::builder()
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .timeout(http_timeout)
            .build()?;

        Ok(Self {
            http,
            cache: Arc::new(TranslationCache::new(cache_capacity)),
        })
    }
}

impl TranslatorFactory for TranslationService {
    /// Build the adapter selected by `settings`, wrapped in the shared cache.
    fn translator_for(&self, settings: &Settings) -> Arc<dyn Translator> {
        let adapter: Arc<dyn Translator> = match settings.translation_service {
            ServiceKind::Google => Arc::new(GoogleTranslator::new(self.http.clone())),
            ServiceKind::Deepl => Arc::new(DeepLTranslator::new(
                self.http.clone(),
                settings.credentials.clone(),
            )),
            ServiceKind::Libre => Arc::new(LibreTranslator::new(
                self.http.clone(),
                settings.endpoint.clone(),
            )),
        };
        info!(service = adapter.service_id(), "translator ready");
        Arc::new(CachedTranslator::with_namespace(
            adapter,
            Arc::clone(&self.cache),
            cache_namespace(settings),
        ))
    }
}

/// Adapter-cache namespace for a settings snapshot. Each Libre server
/// gets its own.
pub fn cache_namespace(settings: &Settings) -> String {
    match settings.translation_service {
        ServiceKind::Libre => format!(
            "libre@{}",
            settings.endpoint.trim().trim_end_matches('/')
        ),
        kind => kind.as_str().to_string(),
    }
}

/// Memoizes successful translations by (namespace, language, text).
/// Context is deliberately not part of the key.
pub struct CachedTranslator {
    inner: Arc<dyn Translator>,
    cache: Arc<TranslationCache>,
    namespace: String,
}

impl CachedTranslator {
    pub fn new(inner: Arc<dyn Translator>, cache: Arc<TranslationCache>) -> Self {
        let namespace = inner.service_id().to_string();
        Self::with_namespace(inner, cache, namespace)
    }

    pub fn with_namespace(
        inner: Arc<dyn Translator>,
        cache: Arc<TranslationCache>,
        namespace: String,
    ) -> Self {
        Self {
            inner,
            cache,
            namespace,
        }
    }
}

#[async_trait]
impl Translator for CachedTranslator {
    fn service_id(&self) -> &str {
        self.inner.service_id()
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
        let namespace = self.namespace.as_str();
        if let Some(hit) = self.cache.get(namespace, &request.target_lang, &request.text) {
            debug!(namespace, "adapter cache hit");
            return Ok(hit);
        }

        let translation = self.inner.translate(request).await?;
        self.cache.put(
            namespace,
            &request.target_lang,
            &request.text,
            translation.clone(),
        );
        Ok(translation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl Translator for Counting {
        fn service_id(&self) -> &str {
            "counting"
        }

        async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TranslateError::MissingCredential { service: "deepl" });
            }
            Ok(format!("<{}>", request.text))
        }
    }

    #[tokio::test]
    async fn repeated_text_hits_adapter_cache_regardless_of_context() {
        let inner = Arc::new(Counting { calls: AtomicUsize::new(0), fail: false });
        let cached = CachedTranslator::new(inner.clone(), Arc::new(TranslationCache::new(10)));

        let first = cached.translate(&TranslateRequest::new("Hi", "fr", "")).await.unwrap();
        let second = cached.translate(&TranslateRequest::new("Hi", "fr", "earlier")).await.unwrap();

        assert_eq!(first, "<Hi>");
        assert_eq!(second, "<Hi>");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        cached.translate(&TranslateRequest::new("Hi", "de", "")).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = Arc::new(Counting { calls: AtomicUsize::new(0), fail: true });
        let cached = CachedTranslator::new(inner.clone(), Arc::new(TranslationCache::new(10)));

        assert!(cached.translate(&TranslateRequest::new("Hi", "fr", "")).await.is_err());
        assert!(cached.translate(&TranslateRequest::new("Hi", "fr", "")).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn namespaces_do_not_share_entries() {
        let inner = Arc::new(Counting { calls: AtomicUsize::new(0), fail: false });
        let cache = Arc::new(TranslationCache::new(10));
        let old_server = CachedTranslator::with_namespace(
            inner.clone(),
            Arc::clone(&cache),
            "libre@https://old.example.org".into(),
        );
        let new_server = CachedTranslator::with_namespace(
            inner.clone(),
            cache,
            "libre@https://new.example.org".into(),
        );

        old_server.translate(&TranslateRequest::new("Hi", "fr", "")).await.unwrap();
        new_server.translate(&TranslateRequest::new("Hi", "fr", "")).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn libre_namespace_follows_endpoint() {
        let libre = |endpoint: &str| Settings {
            translation_service: ServiceKind::Libre,
            endpoint: endpoint.into(),
            ..Settings::default()
        };
        assert_eq!(
            cache_namespace(&libre("https://a.example.org/")),
            cache_namespace(&libre("https://a.example.org"))
        );
        assert_ne!(
            cache_namespace(&libre("https://a.example.org")),
            cache_namespace(&libre("https://b.example.org"))
        );

        let google = |endpoint: &str| Settings {
            endpoint: endpoint.into(),
            ..Settings::default()
        };
        assert_eq!(cache_namespace(&google("https://a")), "google");
        assert_eq!(cache_namespace(&google("https://b")), "google");
    }

    #[test]
    fn factory_picks_adapter_from_settings() {
        let service = TranslationService::new(Duration::from_secs(1), 16).unwrap();
        for (kind, id) in [
            (ServiceKind::Google, "google"),
            (ServiceKind::Deepl, "deepl"),
            (ServiceKind::Libre, "libre"),
        ] {
            let settings = Settings {
                translation_service: kind,
                ..Settings::default()
            };
            assert_eq!(service.translator_for(&settings).service_id(), id);
        }
    }
}
