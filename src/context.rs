//! Rolling context of recently committed captions, oldest first.
//! Fed only by the orchestrator on commit; the provider gets it as a
//! space-joined hint for pronouns and ellipsis in the next line.

use std::collections::VecDeque;

pub struct ContextBuffer {
    entries: VecDeque<String>,
    capacity: usize,
}

impl ContextBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    /// Record a confirmed caption. Repeats of the newest entry are ignored.
    pub fn append(&mut self, text: &str) {
        if text.is_empty() || self.entries.back().is_some_and(|last| last == text) {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(text.to_string());
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    /// Context string for translating `current`. Entries equal to `current`
    /// are left out so a caption never serves as its own context.
    pub fn context_for(&self, current: &str) -> String {
        self.entries
            .iter()
            .filter(|entry| entry.as_str() != current)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn reset(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
