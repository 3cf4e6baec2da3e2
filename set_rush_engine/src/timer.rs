// Round timer owned by the dealer.
//
// The timer never fires by itself; the dealer polls it. `sleep_interval`
// tells the dealer how long it may sleep before the display needs a
// refresh: 10 ms once a countdown is inside its warning window (so the
// last seconds tick smoothly and the deadline is hit closely), 1 s
// otherwise. A candidate arrival cuts the sleep short regardless.

use std::time::{Duration, Instant};

use crate::config::TimerMode;
use crate::ui::UiSink;

const FINE_TICK: Duration = Duration::from_millis(10);
const COARSE_TICK: Duration = Duration::from_secs(1);

/// Whole milliseconds in `d` for the UI, saturating at `u64::MAX`.
pub(crate) fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Clone, Debug)]
pub struct RoundTimer {
    mode: TimerMode,
    started: Instant,
}

impl RoundTimer {
    pub fn new(mode: TimerMode) -> Self {
        Self {
            mode,
            started: Instant::now(),
        }
    }

    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    /// Restart the round clock.
    pub fn reset(&mut self) {
        self.started = Instant::now();
    }

    /// Time left on a countdown, `None` in the other modes.
    pub fn remaining(&self) -> Option<Duration> {
        match self.mode {
            TimerMode::Countdown { timeout, .. } => {
                Some(timeout.saturating_sub(self.started.elapsed()))
            }
            TimerMode::Elapsed | TimerMode::Disabled => None,
        }
    }

    /// Whether a countdown has run out. Always false in the other modes.
    pub fn deadline_passed(&self) -> bool {
        self.remaining().is_some_and(|left| left.is_zero())
    }

    fn in_warning(&self) -> bool {
        match (self.mode, self.remaining()) {
            (TimerMode::Countdown { warning, .. }, Some(left)) => left < warning,
            _ => false,
        }
    }

    /// How long the dealer may sleep before the next refresh.
    pub fn sleep_interval(&self) -> Duration {
        if self.in_warning() {
            FINE_TICK
        } else {
            match self.remaining() {
                Some(left) if !left.is_zero() => left.min(COARSE_TICK),
                _ => COARSE_TICK,
            }
        }
    }

    /// Restart the clock if `reset` is set, then push the current reading to
    /// the UI.
    pub fn display(&mut self, ui: &dyn UiSink, reset: bool) {
        if reset {
            self.reset();
        }
        match self.mode {
            TimerMode::Countdown { .. } => {
                let left = self.remaining().unwrap_or_default();
                ui.set_countdown(millis(left), self.in_warning());
            }
            TimerMode::Elapsed => ui.set_elapsed(millis(self.started.elapsed())),
            TimerMode::Disabled => {}
        }
    }
}
