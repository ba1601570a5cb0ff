//! Quiet-period timer.
//!
//! A [`Debounce`] holds at most one deadline. Scheduling again replaces the
//! deadline instead of queuing a second firing, so a burst of edits fires
//! once, a quiet period after the last edit.
//!
//! Time is passed in explicitly; the owner decides when to poll (an event
//! loop sleeping until [`Debounce::deadline`], or a test stepping instants).

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct Debounce {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// (Re)arm the timer relative to `now`.
    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn fire(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Disarm immediately, returning whether anything was pending.
    pub fn take(&mut self) -> bool {
        self.deadline.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_after_quiet_period() {
        let t0 = Instant::now();
        let mut timer = Debounce::new(Duration::from_secs(2));
        timer.schedule(t0);
        assert!(!timer.fire(t0 + Duration::from_millis(1999)));
        assert!(timer.fire(t0 + Duration::from_secs(2)));
        assert!(!timer.fire(t0 + Duration::from_secs(5)));
    }

    #[test]
    fn rescheduling_moves_deadline() {
        let t0 = Instant::now();
        let mut timer = Debounce::new(Duration::from_secs(2));
        timer.schedule(t0);
        timer.schedule(t0 + Duration::from_secs(1));
        assert_eq!(timer.deadline(), Some(t0 + Duration::from_secs(3)));
        assert!(!timer.fire(t0 + Duration::from_secs(2)));
        assert!(timer.fire(t0 + Duration::from_secs(3)));
    }

    #[test]
    fn take_flushes_pending() {
        let mut timer = Debounce::new(Duration::from_secs(2));
        assert!(!timer.take());
        timer.schedule(Instant::now());
        assert!(timer.take());
        assert!(!timer.is_pending());
    }

    #[test]
    fn cancel_disarms() {
        let t0 = Instant::now();
        let mut timer = Debounce::new(Duration::from_millis(10));
        timer.schedule(t0);
        timer.cancel();
        assert!(!timer.fire(t0 + Duration::from_secs(1)));
    }
}
