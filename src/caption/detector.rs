//! Change detector: turns noisy mutation notifications into genuine
//! caption changes. Style-only churn on the surface fires far more often
//! than the text actually changes; those calls collapse to `NoChange`.

use std::sync::Arc;

use tracing::{debug, trace};

use super::{CaptionSnapshot, CaptionSurface};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// New caption text, distinct from the last one seen.
    Changed(CaptionSnapshot),
    /// Same text as before, or nothing usable on the surface.
    NoChange,
    /// Captions are gone; the overlay must be cleared.
    Hide,
}

pub struct ChangeDetector {
    surface: Arc<dyn CaptionSurface>,
    /// `None` after a hide/reset, so the next caption always counts as new.
    last_seen: Option<String>,
}

impl ChangeDetector {
    pub fn new(surface: Arc<dyn CaptionSurface>) -> Self {
        Self {
            surface,
            last_seen: None,
        }
    }

    pub fn observe(&mut self) -> Observation {
        let Some(blocks) = self.surface.read_blocks() else {
            self.reset();
            return Observation::Hide;
        };

        if blocks.is_empty() {
            // Container still mounted but every text container was removed.
            self.reset();
            return Observation::Hide;
        }

        let snapshot = CaptionSnapshot::from_blocks(&blocks);
        if snapshot.is_empty() {
            trace!(blocks = blocks.len(), "caption containers hold no text");
            return Observation::NoChange;
        }

        let key = snapshot.key();
        if self.last_seen.as_deref() == Some(key.as_str()) {
            return Observation::NoChange;
        }

        debug!(lines = snapshot.lines().len(), "caption changed");
        self.last_seen = Some(key);
        Observation::Changed(snapshot)
    }

    /// Forget the last-seen caption so the current one is re-detected.
    pub fn reset(&mut self) {
        self.last_seen = None;
    }
}
