//! Debounce scheduler.
//!
//! Coalesces bursts of edits into one deferred run. Every edit re-arms the
//! timer, superseding whatever was armed before; the run happens only after a
//! full quiet period with no edits.
//!
//! The scheduler holds no state to run with, only a deadline. The owner's
//! cooperative loop calls `poll(now)` and, when it fires, reads the store as
//! it is *at that moment*. Nothing captured at arm time can go stale.
//!
//! Time is passed in explicitly so tests drive it deterministically.

use std::time::{Duration, Instant};

/// Reference quiet period between the last edit and the run
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(800);

/// Identifies one arming. A newer arm invalidates older handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone, Copy)]
struct Armed {
    handle: TimerHandle,
    deadline: Instant,
}

#[derive(Debug)]
pub struct DebounceScheduler {
    quiet_period: Duration,
    next_id: u64,
    armed: Option<Armed>,
    torn_down: bool,
}

impl DebounceScheduler {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            next_id: 0,
            armed: None,
            torn_down: false,
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Arm (or re-arm) the timer to fire one quiet period after `now`.
    /// Returns `None` after teardown.
    pub fn arm(&mut self, now: Instant) -> Option<TimerHandle> {
        if self.torn_down {
            log::debug!("arm ignored: scheduler torn down");
            return None;
        }
        if let Some(prev) = self.armed.take() {
            log::trace!("re-arm supersedes timer {:?}", prev.handle);
        }
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.armed = Some(Armed { handle, deadline: now + self.quiet_period });
        Some(handle)
    }

    /// Cancel a specific arming. Stale handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) -> bool {
        match self.armed {
            Some(armed) if armed.handle == handle => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    /// Fire if the deadline has passed. Each arming fires at most once.
    pub fn poll(&mut self, now: Instant) -> Option<TimerHandle> {
        if self.torn_down {
            return None;
        }
        match self.armed {
            Some(armed) if now >= armed.deadline => {
                self.armed = None;
                Some(armed.handle)
            }
            _ => None,
        }
    }

    /// Fire now regardless of the deadline
    pub fn flush(&mut self) -> Option<TimerHandle> {
        if self.torn_down {
            return None;
        }
        self.armed.take().map(|armed| armed.handle)
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.armed.map(|a| a.deadline)
    }

    /// How long the owner's loop may sleep before the next poll matters
    pub fn time_until_fire(&self, now: Instant) -> Option<Duration> {
        self.deadline().map(|d| d.saturating_duration_since(now))
    }

    /// Cancel any live timer and refuse further arming.
    pub fn teardown(&mut self) {
        if let Some(armed) = self.armed.take() {
            log::debug!("teardown cancels timer {:?}", armed.handle);
        }
        self.torn_down = true;
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

impl Default for DebounceScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_QUIET_PERIOD)
    }
}
