//! Cancellation framework: CancellationToken + generation guard.
//! Ensures results for a superseded caption can never reach the overlay.
//!
//! Cancellation is cooperative. In-flight provider calls are not aborted;
//! their results are dropped when the guard reports them stale.

use std::time::Instant;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::caption::CaptionSnapshot;

/// Issues generations. Each new request advances the generation and
/// cancels the token of the previous one, so at most one is live.
#[derive(Default)]
pub struct TaskGeneration {
    live: Option<CancellationToken>,
    generation: u64,
}

impl TaskGeneration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the live task, advance generation, return the new token + generation.
    pub fn cancel_and_advance(&mut self) -> (CancellationToken, u64) {
        self.cancel_live();
        let token = CancellationToken::new();
        self.live = Some(token.clone());
        self.generation += 1;
        (token, self.generation)
    }

    /// Cancel the live task without issuing a new one.
    /// Returns true if something was actually cancelled.
    pub fn cancel_live(&mut self) -> bool {
        match self.live.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop the live token once its task has been settled.
    pub fn settle(&mut self, generation: u64) {
        if generation == self.generation {
            self.live = None;
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation
    }

    pub fn is_live(&self, generation: u64) -> bool {
        generation == self.generation && self.live.as_ref().is_some_and(|t| !t.is_cancelled())
    }
}

/// Guard that each line task checks before contributing its result.
#[derive(Clone, Debug)]
pub struct GenerationGuard {
    my_generation: u64,
    token: CancellationToken,
}

impl GenerationGuard {
    pub fn new(my_generation: u64, token: CancellationToken) -> Self {
        Self {
            my_generation,
            token,
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn my_generation(&self) -> u64 {
        self.my_generation
    }
}

/// One in-flight translation, owned by the orchestrator.
#[derive(Debug)]
pub struct PendingTranslation {
    pub id: Uuid,
    pub snapshot: CaptionSnapshot,
    pub created_at: Instant,
    guard: GenerationGuard,
}

impl PendingTranslation {
    pub fn issue(generations: &mut TaskGeneration, snapshot: CaptionSnapshot) -> Self {
        let (token, generation) = generations.cancel_and_advance();
        Self {
            id: Uuid::new_v4(),
            snapshot,
            created_at: Instant::now(),
            guard: GenerationGuard::new(generation, token),
        }
    }

    pub fn generation(&self) -> u64 {
        self.guard.my_generation()
    }

    /// Shared handle for the line tasks.
    pub fn guard(&self) -> GenerationGuard {
        self.guard.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.guard.is_cancelled()
    }
}
