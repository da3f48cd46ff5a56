//! Rest countdown between sets.
//!
//! ```text
//! Idle --arm--> Counting --tick (remaining > 0)--> Counting
//!               Counting --tick (remaining == 0)--> Expired --acknowledge--> Idle
//!               Counting --skip--> Idle
//! ```
//!
//! The timer only reports what happened; recording rest times on logged sets
//! is the session controller's job.

use crate::{RestStatus, RestTimerState};
use chrono::{DateTime, Utc};

#[derive(Clone, Debug, PartialEq, Default)]
enum RestState {
    #[default]
    Idle,
    Counting {
        exercise_index: usize,
        planned: u32,
        remaining: u32,
        started_at: DateTime<Utc>,
    },
    Expired {
        exercise_index: usize,
        planned: u32,
    },
}

/// The countdown ran to zero on its own
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestExpiry {
    pub exercise_index: usize,
    pub planned_seconds: u32,
}

/// The user cut the rest short
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RestSkip {
    pub exercise_index: usize,
    pub actual_seconds: u32,
}

/// Single rest countdown bound to one exercise
#[derive(Clone, Debug, Default)]
pub struct RestTimer {
    state: RestState,
}

impl RestTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting down `duration_seconds` for `exercise_index`
    ///
    /// Any countdown already in progress is replaced. Returns true if one was.
    pub fn arm(&mut self, duration_seconds: u32, exercise_index: usize, now: DateTime<Utc>) -> bool {
        let replaced = self.is_counting();
        if replaced {
            tracing::debug!(
                "Rest timer re-armed before previous countdown finished (exercise {})",
                exercise_index
            );
        }
        self.state = RestState::Counting {
            exercise_index,
            planned: duration_seconds,
            remaining: duration_seconds,
            started_at: now,
        };
        replaced
    }

    /// Advance the countdown by one second
    pub fn tick(&mut self) -> Option<RestExpiry> {
        let RestState::Counting {
            exercise_index,
            planned,
            remaining,
            ..
        } = &mut self.state
        else {
            return None;
        };

        *remaining = remaining.saturating_sub(1);
        if *remaining > 0 {
            return None;
        }

        let expiry = RestExpiry {
            exercise_index: *exercise_index,
            planned_seconds: *planned,
        };
        self.state = RestState::Expired {
            exercise_index: expiry.exercise_index,
            planned: expiry.planned_seconds,
        };
        Some(expiry)
    }

    /// End the rest early; reports the wall-clock rest actually taken
    ///
    /// Skipping an expired timer just returns it to idle.
    pub fn skip(&mut self, now: DateTime<Utc>) -> Option<RestSkip> {
        match std::mem::take(&mut self.state) {
            RestState::Counting {
                exercise_index,
                started_at,
                ..
            } => {
                let millis = (now - started_at).num_milliseconds().max(0);
                let actual_seconds = u32::try_from((millis + 500) / 1000).unwrap_or(u32::MAX);
                Some(RestSkip {
                    exercise_index,
                    actual_seconds,
                })
            }
            RestState::Expired { .. } | RestState::Idle => None,
        }
    }

    /// Dismiss an expired countdown. Returns false if the timer was not expired.
    pub fn acknowledge(&mut self) -> bool {
        if matches!(self.state, RestState::Expired { .. }) {
            self.state = RestState::Idle;
            true
        } else {
            false
        }
    }

    /// Drop the countdown without recording anything
    pub fn cancel(&mut self) {
        self.state = RestState::Idle;
    }

    /// Keep the binding valid after the exercise at `index` leaves the session
    ///
    /// A timer bound to the removed exercise is cancelled; bindings to later
    /// exercises shift down by one.
    pub fn exercise_removed(&mut self, index: usize) {
        let Some(bound) = self.bound_exercise() else {
            return;
        };

        if bound == index {
            self.state = RestState::Idle;
        } else if bound > index {
            if let RestState::Counting { exercise_index, .. }
            | RestState::Expired { exercise_index, .. } = &mut self.state
            {
                *exercise_index -= 1;
            }
        }
    }

    pub fn status(&self) -> RestStatus {
        match self.state {
            RestState::Idle => RestStatus::Idle,
            RestState::Counting { .. } => RestStatus::Counting,
            RestState::Expired { .. } => RestStatus::Expired,
        }
    }

    pub fn is_counting(&self) -> bool {
        matches!(self.state, RestState::Counting { .. })
    }

    pub fn bound_exercise(&self) -> Option<usize> {
        match self.state {
            RestState::Counting { exercise_index, .. } | RestState::Expired { exercise_index, .. } => {
                Some(exercise_index)
            }
            RestState::Idle => None,
        }
    }

    pub fn remaining_seconds(&self) -> u32 {
        match self.state {
            RestState::Counting { remaining, .. } => remaining,
            _ => 0,
        }
    }

    pub fn state(&self) -> RestTimerState {
        match self.state {
            RestState::Idle => RestTimerState::default(),
            RestState::Counting {
                exercise_index,
                planned,
                remaining,
                started_at,
            } => RestTimerState {
                status: RestStatus::Counting,
                remaining_seconds: remaining,
                planned_seconds: planned,
                bound_exercise_index: Some(exercise_index),
                started_at: Some(started_at),
            },
            RestState::Expired {
                exercise_index,
                planned,
            } => RestTimerState {
                status: RestStatus::Expired,
                remaining_seconds: 0,
                planned_seconds: planned,
                bound_exercise_index: Some(exercise_index),
                started_at: None,
            },
        }
    }
}
