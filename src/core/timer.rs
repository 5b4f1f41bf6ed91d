//! Countdown Timers
//!
//! Polled countdown records used for ability durations, cooldowns and
//! respawn delays. Nothing here reads a wall clock: callers pass the
//! current time (milliseconds on the client's simulation clock) so the
//! state is inspectable and testable without sleeping.
//!
//! ```text
//!   arm(t0, d)          poll(t) / is_ready(t)
//!       │                        │
//!       ▼                        ▼
//!   ┌────────┬──────── d ────────┬──────────
//!   │ idle   │     running       │  ready
//!   └────────┴───────────────────┴──────────
//!            t0               t0 + d
//! ```

use serde::{Serialize, Deserialize};

/// Milliseconds on a client-local monotonic clock.
pub type Millis = u64;

/// A single countdown window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    started_at: Option<Millis>,
    duration_ms: Millis,
}

impl Timer {
    /// Create an idle (ready) timer.
    pub const fn new() -> Self {
        Self {
            started_at: None,
            duration_ms: 0,
        }
    }

    /// Start a countdown of `duration_ms` from `now`.
    ///
    /// Re-arming a running timer restarts it; callers guard against that
    /// with [`Timer::is_ready`].
    pub fn arm(&mut self, now: Millis, duration_ms: Millis) {
        self.started_at = Some(now);
        self.duration_ms = duration_ms;
    }

    /// True once the countdown has elapsed (or was never armed).
    #[inline]
    pub fn is_ready(&self, now: Millis) -> bool {
        match self.started_at {
            None => true,
            Some(start) => now.saturating_sub(start) >= self.duration_ms,
        }
    }

    /// True while the countdown is still running.
    #[inline]
    pub fn is_running(&self, now: Millis) -> bool {
        !self.is_ready(now)
    }

    /// When the current countdown was armed.
    #[inline]
    pub fn started_at(&self) -> Option<Millis> {
        self.started_at
    }

    /// Length of the current countdown.
    #[inline]
    pub fn duration(&self) -> Millis {
        self.duration_ms
    }

    /// Milliseconds left before the timer is ready.
    pub fn remaining(&self, now: Millis) -> Millis {
        match self.started_at {
            None => 0,
            Some(start) => (start + self.duration_ms).saturating_sub(now),
        }
    }

    /// Fraction of the countdown elapsed, in `0.0..=1.0`.
    ///
    /// Idle timers report `1.0` (a full cooldown bar).
    pub fn progress(&self, now: Millis) -> f32 {
        match self.started_at {
            None => 1.0,
            Some(_) if self.duration_ms == 0 => 1.0,
            Some(start) => {
                let elapsed = now.saturating_sub(start).min(self.duration_ms);
                elapsed as f32 / self.duration_ms as f32
            }
        }
    }

    /// Clear an elapsed countdown.
    ///
    /// Returns `true` exactly once: on the first poll that observes expiry.
    pub fn poll(&mut self, now: Millis) -> bool {
        if self.started_at.is_some() && self.is_ready(now) {
            self.started_at = None;
            return true;
        }
        false
    }
}
