//! Trailing-edge debounce timer.
//!
//! The timer does not spawn anything; the owner asks for the deadline,
//! sleeps until it, then calls [`Debouncer::fire`]. Restarting the timer
//! bumps a generation number so a stale wake-up can never fire a newer
//! window early.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Pending { deadline: Instant, generation: u64 },
    Firing { generation: u64 },
}

#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    state: TimerState,
    generation: u64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: TimerState::Idle,
            generation: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    /// Restart the quiet window from `now`. Returns the new generation.
    pub fn schedule(&mut self, now: Instant) -> u64 {
        self.schedule_at(now + self.delay)
    }

    /// Arm the timer for an explicit deadline, replacing any pending one.
    pub fn schedule_at(&mut self, deadline: Instant) -> u64 {
        self.generation += 1;
        self.state = TimerState::Pending {
            deadline,
            generation: self.generation,
        };
        self.generation
    }

    /// Drop a pending deadline. Returns true if one was pending.
    pub fn cancel(&mut self) -> bool {
        let was_pending = self.is_pending();
        if was_pending {
            self.state = TimerState::Idle;
        }
        was_pending
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, TimerState::Pending { .. })
    }

    pub fn deadline(&self) -> Option<Instant> {
        match self.state {
            TimerState::Pending { deadline, .. } => Some(deadline),
            _ => None,
        }
    }

    /// Fire if the pending deadline has passed. Returns the generation that
    /// fired.
    pub fn fire(&mut self, now: Instant) -> Option<u64> {
        match self.state {
            TimerState::Pending {
                deadline,
                generation,
            } if now >= deadline => {
                self.state = TimerState::Firing { generation };
                Some(generation)
            }
            _ => None,
        }
    }

    /// Leave the firing state. A window scheduled while firing is kept.
    pub fn finish(&mut self) {
        if matches!(self.state, TimerState::Firing { .. }) {
            self.state = TimerState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(500);

    #[test]
    fn fires_only_after_quiet_window() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        timer.schedule(start);
        assert_eq!(timer.fire(start + Duration::from_millis(499)), None);
        assert_eq!(timer.fire(start + DELAY), Some(1));
        assert_eq!(timer.state(), TimerState::Firing { generation: 1 });
        timer.finish();
        assert_eq!(timer.state(), TimerState::Idle);
    }

    #[test]
    fn reschedule_pushes_deadline_back() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        timer.schedule(start);
        let later = start + Duration::from_millis(300);
        timer.schedule(later);
        assert_eq!(timer.deadline(), Some(later + DELAY));
        assert_eq!(timer.fire(start + DELAY), None);
        assert_eq!(timer.fire(later + DELAY), Some(2));
    }

    #[test]
    fn cancel_discards_pending() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        assert!(!timer.cancel());
        timer.schedule(start);
        assert!(timer.cancel());
        assert_eq!(timer.fire(start + DELAY * 2), None);
    }

    #[test]
    fn schedule_while_firing_survives_finish() {
        let start = Instant::now();
        let mut timer = Debouncer::new(DELAY);
        timer.schedule(start);
        timer.fire(start + DELAY);
        timer.schedule(start + DELAY);
        timer.finish();
        assert!(timer.is_pending());
    }
}
