//! Capture readiness: Idle → Countdown(n) → Captured.
//!
//! Frames arrive through [`ReadinessMachine::observe`], the 1 s countdown
//! timer through [`ReadinessMachine::tick`] and the post-countdown delay
//! through [`ReadinessMachine::fire_capture`]. The machine owns no timers;
//! the session decides when to call each method based on the returned
//! [`Directive`].

use crate::config::ReadinessConfig;
use crate::smoother::ValidityStreak;
use crate::types::ValidationSnapshot;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "remaining", rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Countdown(u8),
    /// Terminal for this machine's lifetime.
    Captured,
}

/// What the caller's timers should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Directive {
    /// Nothing changed for the timers.
    KeepWaiting,
    /// Arm the countdown timer; the value is the digit to show.
    StartCountdown(u8),
    /// Countdown stepped down to the given digit.
    Continue(u8),
    /// Disarm the countdown timer; back to Idle.
    Abort,
    /// Countdown reached zero: stop the countdown timer and arm the capture delay.
    CaptureDue,
}

#[derive(Debug, Clone)]
pub struct ReadinessMachine {
    phase: Phase,
    streak: ValidityStreak,
    latest: ValidationSnapshot,
    countdown_from: u8,
}

impl ReadinessMachine {
    pub fn new(config: &ReadinessConfig) -> Self {
        Self {
            phase: Phase::Idle,
            streak: ValidityStreak::new(config.streak_length),
            latest: ValidationSnapshot::no_face(),
            countdown_from: config.countdown_from,
        }
    }

    /// Feed one frame's snapshot.
    pub fn observe(&mut self, snapshot: ValidationSnapshot) -> Directive {
        self.latest = snapshot;
        let passed = snapshot.all_passed();

        match self.phase {
            Phase::Captured => Directive::KeepWaiting,
            Phase::Countdown(_) if !passed => self.abort("snapshot failed during countdown"),
            Phase::Countdown(_) => Directive::KeepWaiting,
            Phase::Idle => {
                self.streak.record(passed);
                if self.streak.is_stable() {
                    self.phase = Phase::Countdown(self.countdown_from);
                    tracing::info!(from = self.countdown_from, "countdown started");
                    Directive::StartCountdown(self.countdown_from)
                } else {
                    Directive::KeepWaiting
                }
            }
        }
    }

    /// One countdown timer period elapsed.
    pub fn tick(&mut self) -> Directive {
        let Phase::Countdown(n) = self.phase else {
            return Directive::KeepWaiting;
        };
        if !self.latest.all_passed() {
            return self.abort("snapshot failed at countdown tick");
        }
        if n == 0 {
            // Already waiting on the capture delay.
            return Directive::KeepWaiting;
        }

        let next = n - 1;
        self.phase = Phase::Countdown(next);
        tracing::debug!(remaining = next, "countdown tick");
        if next == 0 {
            Directive::CaptureDue
        } else {
            Directive::Continue(next)
        }
    }

    /// The capture delay elapsed. Returns `true` exactly once per machine.
    pub fn fire_capture(&mut self) -> bool {
        if self.phase == Phase::Countdown(0) {
            self.phase = Phase::Captured;
            tracing::info!("capture triggered");
            true
        } else {
            false
        }
    }

    /// Return to Idle (from a countdown) and forget the streak.
    pub fn cancel(&mut self) -> Directive {
        match self.phase {
            Phase::Countdown(_) => self.abort("countdown cancelled"),
            _ => {
                self.streak.clear();
                Directive::KeepWaiting
            }
        }
    }

    fn abort(&mut self, reason: &'static str) -> Directive {
        tracing::info!(reason, "countdown aborted");
        self.phase = Phase::Idle;
        self.streak.clear();
        Directive::Abort
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn countdown(&self) -> Option<u8> {
        match self.phase {
            Phase::Countdown(n) => Some(n),
            _ => None,
        }
    }

    /// Validity-streak progress, 0–100.
    pub fn progress(&self) -> f32 {
        self.streak.progress()
    }

    pub fn latest(&self) -> &ValidationSnapshot {
        &self.latest
    }
}
