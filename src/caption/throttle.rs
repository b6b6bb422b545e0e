//! Trailing-edge throttle for detector invocations.
//!
//! The first call in a quiet period runs immediately and opens a window.
//! Calls inside the window are coalesced into a single pending call that
//! runs when the window closes. Only the latest pending call matters; the
//! detector re-reads the surface when it runs, so earlier ones carry nothing
//! extra.
//!
//! Time is passed in explicitly; the owner arms a timer on `deadline()`.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    open_until: Option<Instant>,
    pending: bool,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            open_until: None,
            pending: false,
        }
    }

    /// Register a call at `now`. Returns `true` if it should run right away;
    /// otherwise it is remembered for the trailing edge.
    pub fn call(&mut self, now: Instant) -> bool {
        match self.open_until {
            Some(until) if now < until => {
                self.pending = true;
                false
            }
            _ => {
                // Either idle, or the window lapsed before the timer was
                // serviced; the pending call folds into this one.
                self.pending = false;
                self.open_until = Some(now + self.window);
                true
            }
        }
    }

    /// When the owner should call `expire`.
    pub fn deadline(&self) -> Option<Instant> {
        self.open_until
    }

    /// Close the window if it has elapsed. Returns `true` if a coalesced
    /// call is owed and must run now.
    pub fn expire(&mut self, now: Instant) -> bool {
        match self.open_until {
            Some(until) if now >= until => {
                self.open_until = None;
                std::mem::take(&mut self.pending)
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(100);

    #[test]
    fn first_call_runs_and_opens_window() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        assert!(throttle.call(t0));
        assert_eq!(throttle.deadline(), Some(t0 + WINDOW));
    }

    #[test]
    fn burst_collapses_to_one_trailing_call() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        assert!(throttle.call(t0));
        for ms in [10, 20, 50, 99] {
            assert!(!throttle.call(t0 + Duration::from_millis(ms)));
        }
        assert!(throttle.is_pending());

        assert!(!throttle.expire(t0 + Duration::from_millis(99)));
        assert!(throttle.expire(t0 + WINDOW));
        assert_eq!(throttle.deadline(), None);
        assert!(!throttle.expire(t0 + WINDOW * 2));
    }

    #[test]
    fn quiet_window_owes_nothing() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        throttle.call(t0);
        assert!(!throttle.expire(t0 + WINDOW));
        assert!(throttle.call(t0 + WINDOW + Duration::from_millis(1)));
    }

    #[test]
    fn late_call_after_unserviced_window_runs_immediately() {
        let t0 = Instant::now();
        let mut throttle = Throttle::new(WINDOW);
        throttle.call(t0);
        throttle.call(t0 + Duration::from_millis(50));

        let late = t0 + Duration::from_millis(150);
        assert!(throttle.call(late));
        assert!(!throttle.is_pending());
        assert_eq!(throttle.deadline(), Some(late + WINDOW));
    }
}
