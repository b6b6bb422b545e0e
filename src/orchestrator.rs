//! Translation orchestrator.
//!
//! Owns the pending translation, both caches, the context buffer and the
//! sink. A genuine caption change either commits straight from the snapshot
//! cache or produces a `TranslationJob`; the job runs elsewhere and its
//! `TranslationOutcome` comes back through `complete`, which drops it if a
//! newer caption has arrived in the meantime.

use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::caption::{CaptionSnapshot, Observation};
use crate::cancellation::{GenerationGuard, PendingTranslation, TaskGeneration};
use crate::context::ContextBuffer;
use crate::metrics::{metric_names, MetricsRegistry};
use crate::overlay::{OverlayStyle, PresentationSink};
use crate::settings::{PipelineConfig, Settings};
use crate::state_machine::{Phase, StateMachine};
use crate::translate::cache::TranslationCache;
use crate::translate::{TranslateRequest, Translator};

pub struct Orchestrator {
    translator: Arc<dyn Translator>,
    target_lang: String,
    /// Bumped on every settings change; outcomes from an older epoch do
    /// not populate the caches.
    settings_epoch: u64,
    line_cache: TranslationCache,
    snapshot_cache: TranslationCache,
    context: ContextBuffer,
    generations: TaskGeneration,
    pending: Option<PendingTranslation>,
    state: StateMachine,
    sink: Box<dyn PresentationSink>,
    metrics: Arc<MetricsRegistry>,
}

impl Orchestrator {
    pub fn new(
        translator: Arc<dyn Translator>,
        settings: &Settings,
        config: &PipelineConfig,
        sink: Box<dyn PresentationSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let mut orchestrator = Self {
            translator,
            target_lang: settings.target_language.clone(),
            settings_epoch: 0,
            line_cache: TranslationCache::new(config.line_cache_capacity),
            snapshot_cache: TranslationCache::new(config.snapshot_cache_capacity),
            context: ContextBuffer::new(config.context_capacity),
            generations: TaskGeneration::new(),
            pending: None,
            state: StateMachine::new(),
            sink,
            metrics,
        };
        orchestrator.sink.restyle(&OverlayStyle::from_settings(settings));
        orchestrator
    }

    pub fn phase(&self) -> Phase {
        self.state.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.state.subscribe()
    }

    pub fn context(&self) -> Vec<String> {
        self.context.snapshot()
    }

    /// Feed one detector result. Returns work to run when the caption
    /// needs the provider.
    pub fn handle(&mut self, observation: Observation) -> Option<TranslationJob> {
        match observation {
            Observation::Changed(snapshot) => self.on_snapshot(snapshot),
            Observation::NoChange => None,
            Observation::Hide => {
                self.hide();
                None
            }
        }
    }

    pub fn on_snapshot(&mut self, snapshot: CaptionSnapshot) -> Option<TranslationJob> {
        if snapshot.is_empty() {
            self.hide();
            return None;
        }

        if self.generations.cancel_live() {
            debug!("in-flight translation superseded");
        }
        self.pending = None;

        let service = self.translator.service_id().to_string();
        let key = snapshot.key();

        if let Some(hit) = self.snapshot_cache.get(&service, &self.target_lang, &key) {
            self.metrics.incr(metric_names::SNAPSHOT_CACHE_HIT);
            debug!(lines = snapshot.lines().len(), "snapshot cache hit");
            self.commit(&snapshot, &hit);
            return None;
        }

        let pending = PendingTranslation::issue(&mut self.generations, snapshot);
        let context = self.context.context_for(&pending.snapshot.flattened());

        let lines = pending
            .snapshot
            .lines()
            .iter()
            .map(|line| match self.line_cache.get(&service, &self.target_lang, line) {
                Some(hit) => {
                    self.metrics.incr(metric_names::LINE_CACHE_HIT);
                    LineWork::Cached(hit)
                }
                None => LineWork::Request(line.clone()),
            })
            .collect();

        let job = TranslationJob {
            generation: pending.generation(),
            settings_epoch: self.settings_epoch,
            guard: pending.guard(),
            snapshot: pending.snapshot.clone(),
            service_id: service,
            target_lang: self.target_lang.clone(),
            context,
            lines,
            translator: Arc::clone(&self.translator),
            metrics: Arc::clone(&self.metrics),
            dispatched_at: pending.created_at,
        };

        debug!(
            id = %pending.id,
            generation = pending.generation(),
            lines = job.lines.len(),
            "translation dispatched"
        );
        self.pending = Some(pending);
        self.state.transition(Phase::Translating);
        Some(job)
    }

    /// Accept a finished job. Returns true if it was committed.
    pub fn complete(&mut self, outcome: TranslationOutcome) -> bool {
        if outcome.settings_epoch == self.settings_epoch {
            for line in &outcome.lines {
                if let Some((source, translation)) = line.fresh_translation() {
                    self.line_cache.put(
                        &outcome.service_id,
                        &outcome.target_lang,
                        source,
                        translation.to_string(),
                    );
                }
            }
        }

        if outcome.guard.is_cancelled() || !self.generations.is_live(outcome.generation) {
            self.metrics.incr(metric_names::STALE_DISCARD);
            debug!(generation = outcome.generation, "stale translation discarded");
            return false;
        }

        self.generations.settle(outcome.generation);
        self.pending = None;

        let joined = outcome.joined();
        self.snapshot_cache.put(
            &outcome.service_id,
            &outcome.target_lang,
            &outcome.snapshot.key(),
            joined.clone(),
        );
        self.metrics
            .record(metric_names::DISPATCH_TO_COMMIT, outcome.dispatched_at.elapsed());
        self.commit(&outcome.snapshot, &joined);
        true
    }

    fn commit(&mut self, snapshot: &CaptionSnapshot, translation: &str) {
        self.context.append(&snapshot.flattened());
        self.sink.show(translation);
        self.state.transition(Phase::Committed);
        self.metrics.incr(metric_names::COMMIT);
        info!(lines = snapshot.lines().len(), "caption committed");
    }

    /// Captions are gone: cancel, clear the overlay, go idle. Context stays.
    pub fn hide(&mut self) {
        self.generations.cancel_live();
        self.pending = None;
        if self.state.current() != Phase::Idle {
            self.sink.hide();
            self.state.transition(Phase::Idle);
        }
    }

    /// New settings replace the old ones wholesale and invalidate both caches.
    pub fn apply_settings(&mut self, settings: &Settings, translator: Arc<dyn Translator>) {
        self.line_cache.clear();
        self.snapshot_cache.clear();
        self.settings_epoch += 1;
        self.translator = translator;
        self.target_lang = settings.target_language.clone();
        self.generations.cancel_live();
        self.pending = None;

        self.sink.restyle(&OverlayStyle::from_settings(settings));
        // Translating with nothing live is not a state; the cancelled job's
        // caption is gone until the surface is observed again.
        if !settings.enabled || self.state.current() == Phase::Translating {
            self.hide();
        }
        info!(
            service = self.translator.service_id(),
            target = %self.target_lang,
            enabled = settings.enabled,
            "settings applied, caches cleared"
        );
    }

    /// Leaving the video: drop everything tied to it, including context.
    pub fn reset(&mut self) {
        self.hide();
        self.context.reset();
        debug!("orchestrator reset");
    }
}

enum LineWork {
    Cached(String),
    Request(String),
}

/// Per-caption work: one provider call per uncached line, joined.
pub struct TranslationJob {
    generation: u64,
    settings_epoch: u64,
    guard: GenerationGuard,
    snapshot: CaptionSnapshot,
    service_id: String,
    target_lang: String,
    context: String,
    lines: Vec<LineWork>,
    translator: Arc<dyn Translator>,
    metrics: Arc<MetricsRegistry>,
    dispatched_at: Instant,
}

impl TranslationJob {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn snapshot(&self) -> &CaptionSnapshot {
        &self.snapshot
    }

    /// Context string handed to the provider for every line of this caption.
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Lines that will go to the provider.
    pub fn uncached_lines(&self) -> usize {
        self.lines
            .iter()
            .filter(|l| matches!(l, LineWork::Request(_)))
            .count()
    }

    pub async fn run(self) -> TranslationOutcome {
        let TranslationJob {
            generation,
            settings_epoch,
            guard,
            snapshot,
            service_id,
            target_lang,
            context,
            lines,
            translator,
            metrics,
            dispatched_at,
        } = self;

        let tasks = lines.into_iter().map(|work| {
            let translator = Arc::clone(&translator);
            let metrics = Arc::clone(&metrics);
            let guard = guard.clone();
            let target_lang = target_lang.clone();
            let context = context.clone();
            async move {
                match work {
                    LineWork::Cached(hit) => LineOutcome::Cached(hit),
                    LineWork::Request(source) => {
                        let request = TranslateRequest::new(source.clone(), target_lang, context);
                        translate_line(translator.as_ref(), &metrics, &guard, source, request).await
                    }
                }
            }
        });

        let lines = join_all(tasks).await;

        TranslationOutcome {
            generation,
            settings_epoch,
            guard,
            snapshot,
            service_id,
            target_lang,
            lines,
            dispatched_at,
        }
    }
}

async fn translate_line(
    translator: &dyn Translator,
    metrics: &MetricsRegistry,
    guard: &GenerationGuard,
    source: String,
    request: TranslateRequest,
) -> LineOutcome {
    metrics.incr(metric_names::PROVIDER_CALL);
    let started = Instant::now();
    let result = translator.translate(&request).await;
    metrics.record(metric_names::LINE_TRANSLATE, started.elapsed());

    match result {
        Ok(translation) if guard.is_cancelled() => LineOutcome::Discarded {
            source,
            translation: Some(translation),
        },
        Ok(translation) => LineOutcome::Translated {
            source,
            translation,
        },
        Err(e) => {
            metrics.incr(metric_names::PROVIDER_FAILURE);
            if e.is_configuration() {
                warn!(error = %e, "translator misconfigured, showing original line");
            } else {
                warn!(error = %e, line = %source, "line translation failed, showing original");
            }
            if guard.is_cancelled() {
                LineOutcome::Discarded {
                    source,
                    translation: None,
                }
            } else {
                LineOutcome::Failed { source }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Cached(String),
    Translated { source: String, translation: String },
    /// Provider failed; the original line is shown instead.
    Failed { source: String },
    /// Arrived after the caption was superseded.
    Discarded {
        source: String,
        translation: Option<String>,
    },
}

impl LineOutcome {
    /// Text to display for this line.
    pub fn display(&self) -> &str {
        match self {
            LineOutcome::Cached(t) => t,
            LineOutcome::Translated { translation, .. } => translation,
            LineOutcome::Failed { source } => source,
            LineOutcome::Discarded { source, .. } => source,
        }
    }

    /// A provider result worth keeping in the line cache.
    fn fresh_translation(&self) -> Option<(&str, &str)> {
        match self {
            LineOutcome::Translated {
                source,
                translation,
            }
            | LineOutcome::Discarded {
                source,
                translation: Some(translation),
            } => Some((source, translation)),
            _ => None,
        }
    }
}

pub struct TranslationOutcome {
    generation: u64,
    settings_epoch: u64,
    guard: GenerationGuard,
    snapshot: CaptionSnapshot,
    service_id: String,
    target_lang: String,
    lines: Vec<LineOutcome>,
    dispatched_at: Instant,
}

impl TranslationOutcome {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn lines(&self) -> &[LineOutcome] {
        &self.lines
    }

    /// Display text with the caption's line structure preserved.
    pub fn joined(&self) -> String {
        self.lines
            .iter()
            .map(LineOutcome::display)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
