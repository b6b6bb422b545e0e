//! Caption surface access and snapshot extraction.
//! The surface is owned by the player page; we only read it. Each text
//! container is delivered as raw markup and normalized into lines here.

pub mod detector;
pub mod throttle;

use std::sync::LazyLock;

use parking_lot::RwLock;
use regex::Regex;

pub use detector::{ChangeDetector, Observation};
pub use throttle::Throttle;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>|\r?\n").expect("valid line-break pattern"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));

/// Ordered, non-empty caption lines seen at one observation instant.
/// An empty snapshot means no caption is shown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct CaptionSnapshot {
    lines: Vec<String>,
}

impl CaptionSnapshot {
    /// Build from already-clean lines; blank entries are dropped.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines
            .into_iter()
            .map(Into::into)
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();
        Self { lines }
    }

    /// Normalize raw text-container markup into a snapshot.
    pub fn from_blocks<S: AsRef<str>>(blocks: &[S]) -> Self {
        let lines = blocks
            .iter()
            .flat_map(|block| LINE_BREAK.split(block.as_ref()))
            .map(|part| decode_entities(&TAG.replace_all(part, "")).trim().to_string())
            .filter(|line| !line.is_empty())
            .collect();
        Self { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Comparison key and snapshot-cache key: lines joined by `\n`.
    pub fn key(&self) -> String {
        self.lines.join("\n")
    }

    /// Single-line form recorded into the context buffer.
    pub fn flattened(&self) -> String {
        self.lines.join(" ")
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        // last, so "&amp;lt;" stays "&lt;"
        .replace("&amp;", "&")
}

/// Read-only view of the externally owned caption region.
pub trait CaptionSurface: Send + Sync {
    /// `None` when the caption container is absent. Otherwise the markup of
    /// each text container, in display order.
    fn read_blocks(&self) -> Option<Vec<String>>;
}

/// In-memory surface a host keeps in sync with the real page.
#[derive(Default)]
pub struct SharedSurface {
    blocks: RwLock<Option<Vec<String>>>,
}

impl SharedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_blocks(&self, blocks: Vec<String>) {
        *self.blocks.write() = Some(blocks);
    }

    /// The caption container left the page.
    pub fn remove(&self) {
        *self.blocks.write() = None;
    }
}

impl CaptionSurface for SharedSurface {
    fn read_blocks(&self) -> Option<Vec<String>> {
        self.blocks.read().clone()
    }
}
