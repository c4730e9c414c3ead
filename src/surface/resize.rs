use std::time::{Duration, Instant};

use tracing::trace;

/// Identity of one armed debounce timer. Strictly increasing per coordinator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    Pending { timer: TimerId, deadline: Instant },
}

/// Trailing-edge debounce for layout resize signals.
///
/// Every [`notify`](Self::notify) re-arms the timer, so a continuous drag
/// produces a single relayout once it stops for `delay`. Time is passed in by
/// the caller; the coordinator never reads the clock.
pub struct ResizeCoordinator {
    delay: Duration,
    state: State,
    last_timer: u64,
}

impl ResizeCoordinator {
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            state: State::Idle,
            last_timer: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a resize signal at `now`, (re)arming the timer
    pub fn notify(&mut self, now: Instant) -> TimerId {
        self.last_timer += 1;
        let timer = TimerId(self.last_timer);
        self.state = State::Pending {
            timer,
            deadline: now + self.delay,
        };
        trace!(?timer, "resize timer armed");
        timer
    }

    /// The armed timer if its deadline has passed
    pub fn due(&self, now: Instant) -> Option<TimerId> {
        match self.state {
            State::Pending { timer, deadline } if now >= deadline => Some(timer),
            _ => None,
        }
    }

    /// Time left before the armed timer fires, for sizing the event poll
    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        match self.state {
            State::Pending { deadline, .. } => Some(deadline.saturating_duration_since(now)),
            State::Idle => None,
        }
    }

    /// Fire `timer`. Returns true (and goes idle) only if it is the current
    /// timer; a superseded or cancelled timer is ignored.
    pub fn fire(&mut self, timer: TimerId) -> bool {
        match self.state {
            State::Pending { timer: current, .. } if current == timer => {
                self.state = State::Idle;
                true
            }
            _ => false,
        }
    }

    /// Fire the armed timer if due. True means "relayout now".
    pub fn poll(&mut self, now: Instant) -> bool {
        self.due(now).is_some_and(|timer| self.fire(timer))
    }

    pub fn cancel(&mut self) {
        if let State::Pending { timer, .. } = self.state {
            trace!(?timer, "resize timer cancelled");
        }
        self.state = State::Idle;
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending { .. })
    }
}

impl Default for ResizeCoordinator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}
