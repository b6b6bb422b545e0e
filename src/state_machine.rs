//! Orchestrator phase: Idle → Translating → Committed, back to Idle on hide/reset.
//! Phases are broadcast on a watch channel so hosts and tests can follow along.

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    Idle,
    Translating,
    Committed,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Idle => write!(f, "Idle"),
            Phase::Translating => write!(f, "Translating"),
            Phase::Committed => write!(f, "Committed"),
        }
    }
}

/// Single-owner state holder. Subscribers get a watch receiver.
pub struct StateMachine {
    state_tx: watch::Sender<Phase>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(Phase::Idle);
        Self { state_tx }
    }

    pub fn current(&self) -> Phase {
        *self.state_tx.borrow()
    }

    /// Every phase can follow every other one (a snapshot-cache hit goes
    /// straight from Idle to Committed), so there is nothing to validate.
    pub fn transition(&mut self, next: Phase) {
        let current = self.state_tx.send_replace(next);
        if current != next {
            debug!(from = %current, to = %next, "state_transition");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.state_tx.subscribe()
    }
}
