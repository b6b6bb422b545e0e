//! Shared fakes for the integration tests: a scripted translator, a
//! recording sink and a factory handing out one translator per service.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use dualsub::caption::CaptionSnapshot;
use dualsub::overlay::{OverlayStyle, PresentationSink};
use dualsub::settings::{ServiceKind, Settings};
use dualsub::translate::{TranslateError, TranslateRequest, Translator, TranslatorFactory};

/// Answers `"{lang}:{text}"` unless a reply is scripted. Lines can be made
/// to fail or to wait on a gate.
pub struct ScriptedTranslator {
    id: &'static str,
    replies: Mutex<HashMap<String, String>>,
    failing: Mutex<HashSet<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    requests: Mutex<Vec<TranslateRequest>>,
}

impl ScriptedTranslator {
    pub fn new(id: &'static str) -> Arc<Self> {
        Arc::new(Self {
            id,
            replies: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            gates: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn reply(&self, text: &str, translation: &str) {
        self.replies
            .lock()
            .insert(text.to_string(), translation.to_string());
    }

    pub fn fail(&self, text: &str) {
        self.failing.lock().insert(text.to_string());
    }

    /// Requests for `text` block until the returned gate is notified.
    pub fn hold(&self, text: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().insert(text.to_string(), Arc::clone(&gate));
        gate
    }

    pub fn requests(&self) -> Vec<TranslateRequest> {
        self.requests.lock().clone()
    }

    pub fn requested_texts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.text.clone()).collect()
    }

    pub fn calls_for(&self, text: &str) -> usize {
        self.requests.lock().iter().filter(|r| r.text == text).count()
    }
}

#[async_trait]
impl Translator for ScriptedTranslator {
    fn service_id(&self) -> &str {
        self.id
    }

    async fn translate(&self, request: &TranslateRequest) -> Result<String, TranslateError> {
        self.requests.lock().push(request.clone());

        let gate = self.gates.lock().get(&request.text).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.failing.lock().contains(&request.text) {
            return Err(TranslateError::Status {
                service: "scripted",
                status: 503,
                body: "unavailable".into(),
            });
        }
        let reply = self.replies.lock().get(&request.text).cloned();
        Ok(reply.unwrap_or_else(|| format!("{}:{}", request.target_lang, request.text)))
    }
}

/// One scripted translator per service kind, created on first use.
#[derive(Default)]
pub struct ScriptedFactory {
    translators: Mutex<HashMap<ServiceKind, Arc<ScriptedTranslator>>>,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn translator(&self, kind: ServiceKind) -> Arc<ScriptedTranslator> {
        Arc::clone(
            self.translators
                .lock()
                .entry(kind)
                .or_insert_with(|| ScriptedTranslator::new(kind.as_str())),
        )
    }
}

impl TranslatorFactory for ScriptedFactory {
    fn translator_for(&self, settings: &Settings) -> Arc<dyn Translator> {
        self.translator(settings.translation_service)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Show(String),
    Hide,
    Style(OverlayStyle),
}

/// Records everything the pipeline asks the overlay to do.
#[derive(Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show/hide events only; restyles are left out.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| !matches!(e, SinkEvent::Style(_)))
            .cloned()
            .collect()
    }

    pub fn shown(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Show(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn last_shown(&self) -> Option<String> {
        self.shown().pop()
    }

    pub fn styles(&self) -> Vec<OverlayStyle> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Style(style) => Some(style.clone()),
                _ => None,
            })
            .collect()
    }
}

impl PresentationSink for RecordingSink {
    fn show(&mut self, text: &str) {
        self.events.lock().push(SinkEvent::Show(text.to_string()));
    }

    fn hide(&mut self) {
        self.events.lock().push(SinkEvent::Hide);
    }

    fn restyle(&mut self, style: &OverlayStyle) {
        self.events.lock().push(SinkEvent::Style(style.clone()));
    }
}

pub fn french() -> Settings {
    Settings {
        target_language: "fr".into(),
        ..Settings::default()
    }
}

pub fn snapshot(lines: &[&str]) -> CaptionSnapshot {
    CaptionSnapshot::from_lines(lines.iter().copied())
}
