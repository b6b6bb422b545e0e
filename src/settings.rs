//! User settings and pipeline tunables.
//! `Settings` mirrors the extension option schema; an update always carries
//! the whole object and replaces the previous one.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

/// Environment variable that overrides `Settings::credentials`.
pub const API_KEY_ENV: &str = "DUALSUB_API_KEY";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    #[default]
    Google,
    Deepl,
    Libre,
}

impl ServiceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ServiceKind::Google => "google",
            ServiceKind::Deepl => "deepl",
            ServiceKind::Libre => "libre",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayPosition {
    Top,
    #[default]
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enabled: bool,
    /// ISO code passed to the provider, e.g. "fr" or "pt-br".
    pub target_language: String,
    pub translation_service: ServiceKind,
    #[serde(alias = "apiKey")]
    pub credentials: String,
    #[serde(alias = "libreUrl")]
    pub endpoint: String,
    pub position: OverlayPosition,
    pub translated_size: u32,
    pub translated_color: String,
    pub show_background: bool,
    /// Percent, 0-100.
    pub bg_opacity: u8,
    /// Percent, 0-100.
    pub text_opacity: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            target_language: "en".into(),
            translation_service: ServiceKind::Google,
            credentials: String::new(),
            endpoint: "https://libretranslate.com".into(),
            position: OverlayPosition::Bottom,
            translated_size: 32,
            translated_color: "#ffff00".into(),
            show_background: true,
            bg_opacity: 80,
            text_opacity: 100,
        }
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("settings parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Settings {
    /// Load settings from a JSON file. Absent keys take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Load from `path` if given, falling back to defaults on any error,
    /// then apply environment overrides.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let mut settings = match path {
            Some(p) => Self::load_from_file(p).unwrap_or_else(|e| {
                warn!(path = %p.display(), error = %e, "settings load failed, using defaults");
                Self::default()
            }),
            None => Self::default(),
        };
        settings.override_credentials(std::env::var(API_KEY_ENV).ok());
        info!(
            service = %settings.translation_service,
            target = %settings.target_language,
            enabled = settings.enabled,
            "settings loaded"
        );
        settings
    }

    pub fn override_credentials(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            self.credentials = key;
        }
    }

    /// Whether switching from `self` to `next` changes what a cached
    /// translation would look like.
    pub fn translation_config_differs(&self, next: &Settings) -> bool {
        self.translation_service != next.translation_service
            || self.target_language != next.target_language
    }
}

/// Pipeline tunables that are not user-facing.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Mutation notifications inside this window are coalesced.
    pub throttle_window: Duration,
    /// Reconciliation backstop for missed mutation notifications.
    pub poll_interval: Duration,
    pub context_capacity: usize,
    pub line_cache_capacity: usize,
    pub snapshot_cache_capacity: usize,
    /// Adapter-layer cache shared by all providers.
    pub service_cache_capacity: usize,
    /// Transport-level timeout for provider HTTP calls.
    pub http_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            throttle_window: Duration::from_millis(100),
            poll_interval: Duration::from_secs(2),
            context_capacity: 5,
            line_cache_capacity: 500,
            snapshot_cache_capacity: 500,
            service_cache_capacity: 1000,
            http_timeout: Duration::from_secs(10),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"targetLanguage":"tr","translationService":"deepl","apiKey":"k:fx"}}"#).unwrap();

        let settings = Settings::load_from_file(file.path()).unwrap();
        assert_eq!(settings.target_language, "tr");
        assert_eq!(settings.translation_service, ServiceKind::Deepl);
        assert_eq!(settings.credentials, "k:fx");
        assert_eq!(settings.position, OverlayPosition::Bottom);
        assert!(settings.enabled);
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{not json").unwrap();

        assert!(matches!(
            Settings::load_from_file(file.path()),
            Err(SettingsError::Parse(_))
        ));
        let settings = Settings::load_or_default(Some(file.path()));
        assert_eq!(settings.target_language, Settings::default().target_language);
    }

    #[test]
    fn update_payload_replaces_rather_than_merges() {
        let update: Settings = serde_json::from_str(r#"{"position":"top"}"#).unwrap();
        assert_eq!(update.position, OverlayPosition::Top);
        assert_eq!(update.target_language, "en");
        assert_eq!(update.translation_service, ServiceKind::Google);
    }

    #[test]
    fn blank_override_keeps_existing_key() {
        let mut settings = Settings {
            credentials: "file-key".into(),
            ..Settings::default()
        };
        settings.override_credentials(Some("  ".into()));
        assert_eq!(settings.credentials, "file-key");
        settings.override_credentials(Some("env-key".into()));
        assert_eq!(settings.credentials, "env-key");
    }

    #[test]
    fn config_difference_ignores_display_options() {
        let base = Settings::default();
        let restyled = Settings {
            translated_size: 40,
            ..Settings::default()
        };
        let relang = Settings {
            target_language: "de".into(),
            ..Settings::default()
        };
        assert!(!base.translation_config_differs(&restyled));
        assert!(base.translation_config_differs(&relang));
    }
}
