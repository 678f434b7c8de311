//! Challenge phase definitions
//!
//! Timers are data, not callbacks: `Preparing` and `AwaitingMovement` carry
//! their own instants, so at most one deadline is armed at any moment and a
//! stale tick after a transition is structurally a no-op.

use std::time::Instant;

/// The state machine states of a challenge session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No session running
    Idle,
    /// Waiting for the nose to settle near the frame center
    Centering,
    /// Countdown before measurement begins; movement during this phase
    /// must not count as a detection
    Preparing {
        /// Seconds left on the countdown
        remaining: u32,
        /// When the next countdown second elapses
        next_tick: Instant,
    },
    /// Measuring: the user must perform the current movement before the
    /// deadline
    AwaitingMovement { deadline: Instant },
    /// Evidence for a completed or failed step is being handed to the backend
    Submitting,
    /// All steps done; outcome tracks the backend's authoritative decision
    Completed { outcome: Outcome },
    /// Terminal local failure; restart required
    Failed { reason: FailReason },
}

/// Backend decision for a completed session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Final submission sent, decision not yet received
    Pending,
    Accepted,
    Rejected,
}

/// Why a session failed locally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    /// The requested movement was not performed before the deadline
    Timeout,
    /// The final-step backend exchange failed, so no outcome exists
    Backend,
}

impl Phase {
    /// Short name for the observable state surface
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Centering => "centering",
            Phase::Preparing { .. } => "preparing",
            Phase::AwaitingMovement { .. } => "awaiting_movement",
            Phase::Submitting => "submitting",
            Phase::Completed { .. } => "completed",
            Phase::Failed { .. } => "failed",
        }
    }

    /// The single armed deadline, if any: the countdown tick or the
    /// movement deadline, never both
    pub fn armed_deadline(&self) -> Option<Instant> {
        match self {
            Phase::Preparing { next_tick, .. } => Some(*next_tick),
            Phase::AwaitingMovement { deadline } => Some(*deadline),
            _ => None,
        }
    }

    /// Terminal phases only leave via an explicit reset/restart
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Phase::Completed {
                outcome: Outcome::Accepted | Outcome::Rejected
            } | Phase::Failed { .. }
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_at_most_one_deadline_armed() {
        let now = Instant::now();
        assert!(Phase::Idle.armed_deadline().is_none());
        assert!(Phase::Centering.armed_deadline().is_none());
        assert!(Phase::Submitting.armed_deadline().is_none());
        assert!(Phase::Preparing {
            remaining: 3,
            next_tick: now
        }
        .armed_deadline()
        .is_some());
        assert!(Phase::AwaitingMovement {
            deadline: now + Duration::from_secs(10)
        }
        .armed_deadline()
        .is_some());
    }

    #[test]
    fn test_terminal_phases() {
        assert!(!Phase::Completed {
            outcome: Outcome::Pending
        }
        .is_terminal());
        assert!(Phase::Completed {
            outcome: Outcome::Accepted
        }
        .is_terminal());
        assert!(Phase::Failed {
            reason: FailReason::Timeout
        }
        .is_terminal());
    }
}
