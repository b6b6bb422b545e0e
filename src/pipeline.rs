//! Pipeline actor: the single task that owns detector, throttle and
//! orchestrator. Mutation notifications and the periodic poll both funnel
//! through the throttle into the detector; translation jobs run as
//! separate tasks and report back on an internal channel.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::caption::{CaptionSurface, ChangeDetector, Throttle};
use crate::metrics::MetricsRegistry;
use crate::orchestrator::{Orchestrator, TranslationJob, TranslationOutcome};
use crate::overlay::PresentationSink;
use crate::settings::{PipelineConfig, Settings};
use crate::state_machine::Phase;
use crate::translate::TranslatorFactory;

#[derive(Debug)]
pub enum PipelineEvent {
    /// The caption surface changed in some way (text, style, structure).
    Mutation,
    /// Complete replacement settings.
    SettingsUpdated(Box<Settings>),
    Navigated { url: String },
    Shutdown,
}

/// Cloneable front door to a running pipeline.
#[derive(Clone)]
pub struct PipelineHandle {
    events: mpsc::UnboundedSender<PipelineEvent>,
    phase: watch::Receiver<Phase>,
}

impl PipelineHandle {
    /// Returns false once the pipeline has stopped.
    pub fn mutation(&self) -> bool {
        self.events.send(PipelineEvent::Mutation).is_ok()
    }

    pub fn update_settings(&self, settings: Settings) -> bool {
        self.events
            .send(PipelineEvent::SettingsUpdated(Box::new(settings)))
            .is_ok()
    }

    pub fn navigate(&self, url: impl Into<String>) -> bool {
        self.events
            .send(PipelineEvent::Navigated { url: url.into() })
            .is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.events.send(PipelineEvent::Shutdown).is_ok()
    }

    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }
}

/// Only playback pages carry captions worth translating.
pub fn is_watch_page(url: &str) -> bool {
    url.contains("/watch/")
}

pub struct Pipeline {
    detector: ChangeDetector,
    throttle: Throttle,
    orchestrator: Orchestrator,
    factory: Arc<dyn TranslatorFactory>,
    settings: Settings,
    config: PipelineConfig,
    metrics: Arc<MetricsRegistry>,
    /// False while on a non-playback page.
    active: bool,
    current_url: Option<String>,
    events: mpsc::UnboundedReceiver<PipelineEvent>,
    outcomes_tx: mpsc::UnboundedSender<TranslationOutcome>,
    outcomes_rx: mpsc::UnboundedReceiver<TranslationOutcome>,
}

impl Pipeline {
    pub fn new(
        surface: Arc<dyn CaptionSurface>,
        factory: Arc<dyn TranslatorFactory>,
        settings: Settings,
        config: PipelineConfig,
        sink: Box<dyn PresentationSink>,
        metrics: Arc<MetricsRegistry>,
    ) -> (Self, PipelineHandle) {
        let translator = factory.translator_for(&settings);
        let orchestrator =
            Orchestrator::new(translator, &settings, &config, sink, Arc::clone(&metrics));
        let (events_tx, events) = mpsc::unbounded_channel();
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();

        let handle = PipelineHandle {
            events: events_tx,
            phase: orchestrator.subscribe(),
        };

        let pipeline = Self {
            detector: ChangeDetector::new(surface),
            throttle: Throttle::new(config.throttle_window),
            orchestrator,
            factory,
            settings,
            config,
            metrics,
            active: true,
            current_url: None,
            events,
            outcomes_tx,
            outcomes_rx,
        };
        (pipeline, handle)
    }

    pub async fn run(mut self) {
        let mut poll = time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            throttle_ms = self.config.throttle_window.as_millis() as u64,
            poll_ms = self.config.poll_interval.as_millis() as u64,
            "pipeline started"
        );

        loop {
            // Far-future placeholder when no window is open; the branch is
            // disabled anyway.
            let deadline = self
                .throttle
                .deadline()
                .unwrap_or_else(|| Instant::now() + self.config.poll_interval);

            tokio::select! {
                event = self.events.recv() => match event {
                    Some(PipelineEvent::Mutation) => self.trigger(),
                    Some(PipelineEvent::SettingsUpdated(settings)) => self.apply_settings(*settings),
                    Some(PipelineEvent::Navigated { url }) => self.navigate(url),
                    Some(PipelineEvent::Shutdown) | None => break,
                },
                Some(outcome) = self.outcomes_rx.recv() => {
                    self.orchestrator.complete(outcome);
                }
                _ = time::sleep_until(deadline), if self.throttle.deadline().is_some() => {
                    if self.throttle.expire(Instant::now()) {
                        self.process();
                    }
                }
                _ = poll.tick() => self.trigger(),
            }
        }

        self.orchestrator.hide();
        let snapshot = self.metrics.snapshot();
        info!(
            counters = ?snapshot.counters,
            "pipeline stopped"
        );
    }

    fn accepting(&self) -> bool {
        self.active && self.settings.enabled
    }

    /// Throttled entry point shared by mutation events and poll ticks.
    fn trigger(&mut self) {
        if !self.accepting() {
            return;
        }
        if self.throttle.call(Instant::now()) {
            self.process();
        }
    }

    fn process(&mut self) {
        if !self.accepting() {
            return;
        }
        let observation = self.detector.observe();
        if let Some(job) = self.orchestrator.handle(observation) {
            self.spawn(job);
        }
    }

    fn spawn(&self, job: TranslationJob) {
        let outcomes = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let outcome = job.run().await;
            // The receiver lives as long as the pipeline.
            let _ = outcomes.send(outcome);
        });
    }

    fn apply_settings(&mut self, settings: Settings) {
        if self.settings.translation_config_differs(&settings) {
            info!(
                from = %self.settings.translation_service,
                to = %settings.translation_service,
                target = %settings.target_language,
                "translation config changed"
            );
        }
        let translator = self.factory.translator_for(&settings);
        self.orchestrator.apply_settings(&settings, translator);
        self.detector.reset();
        self.settings = settings;
        // Re-translate whatever is on screen right now under the new config.
        self.process();
    }

    fn navigate(&mut self, url: String) {
        if self.current_url.as_deref() == Some(url.as_str()) {
            return;
        }
        self.orchestrator.reset();
        self.detector.reset();
        self.active = is_watch_page(&url);
        debug!(url = %url, active = self.active, "navigation reset");
        self.current_url = Some(url);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_watch_pages_are_active() {
        assert!(is_watch_page("https://www.netflix.com/watch/81234567?trackId=1"));
        assert!(!is_watch_page("https://www.netflix.com/browse"));
    }
}
