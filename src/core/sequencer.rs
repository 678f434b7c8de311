//! Challenge sequencer: the phase state machine
//!
//! Phase transitions:
//! - Idle → Centering on start()
//! - Centering → Preparing(countdown) once the face is centered
//! - Preparing → AwaitingMovement(deadline) when the countdown hits zero
//! - AwaitingMovement → Submitting on a movement match
//! - AwaitingMovement → Failed(timeout) when the deadline elapses
//! - Submitting → Centering (more steps) or Completed(pending) (last step)
//! - Completed(pending) → Completed(accept|reject) on the backend decision
//! - any → Idle on reset()
//!
//! Centering is re-required before every movement, not only the first, so
//! each movement sample starts from a known neutral pose. Movement matching
//! is only evaluated in AwaitingMovement: a stray match during Centering or
//! Preparing never counts, which also makes centering win any same-frame tie.
//!
//! The sequencer is synchronous and takes `now` explicitly; the async runtime
//! drives it with real time, tests with a simulated clock.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::core::classifier;
use crate::core::session::ChallengeSession;
use crate::types::{
    ChallengeConfig, DetectionSample, FailReason, MovementType, Outcome, Phase, Thresholds,
};

/// Why a step submission is being made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepTrigger {
    MovementDetected,
    Timeout,
}

/// Emitted when a step completes or times out; the caller turns this into a
/// submission record and dispatches it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepCompletion {
    /// 1-based step index, captured at completion time (never re-read from
    /// the sequencer later, so late responses cannot go stale)
    pub step_index: u32,
    pub movement: MovementType,
    pub success: bool,
    pub is_final: bool,
    pub trigger: StepTrigger,
}

/// The challenge state machine
#[derive(Debug)]
pub struct ChallengeSequencer {
    config: ChallengeConfig,
    thresholds: Thresholds,
    session: Option<ChallengeSession>,
    phase: Phase,
}

impl ChallengeSequencer {
    pub fn new(config: ChallengeConfig, thresholds: Thresholds) -> Self {
        Self {
            config,
            thresholds,
            session: None,
            phase: Phase::Idle,
        }
    }

    /// Begin a fresh session, replacing any previous one. The caller may
    /// supply the session id (the API surface does); otherwise one is
    /// generated.
    pub fn start<R: Rng>(&mut self, rng: &mut R, session_id: Option<String>) -> &ChallengeSession {
        let mut session = ChallengeSession::new(rng, self.config.effective_steps());
        if let Some(id) = session_id {
            session.id = id;
        }
        info!(session_id = %session.id, sequence = ?session.sequence, "challenge session started");
        self.session = Some(session);
        self.phase = Phase::Centering;
        self.session.as_ref().expect("session just set")
    }

    /// Drop the session and return to Idle
    pub fn reset(&mut self) {
        self.session = None;
        self.phase = Phase::Idle;
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session(&self) -> Option<&ChallengeSession> {
        self.session.as_ref()
    }

    pub fn current_movement(&self) -> Option<MovementType> {
        self.session.as_ref().and_then(|s| s.current_movement())
    }

    /// The single armed deadline, for invariant checks
    pub fn armed_deadline(&self) -> Option<Instant> {
        self.phase.armed_deadline()
    }

    /// Consume one frame's sample. Returns a completion when the current
    /// movement was just detected.
    pub fn on_sample(&mut self, sample: &DetectionSample, now: Instant) -> Option<StepCompletion> {
        match self.phase {
            Phase::Centering => {
                if classifier::is_centered(sample, &self.thresholds) {
                    let movement = self.current_movement()?;
                    info!(%movement, "face centered, starting countdown");
                    self.phase = Phase::Preparing {
                        remaining: self.config.preparation_countdown,
                        next_tick: now + Duration::from_secs(1),
                    };
                }
                None
            }
            Phase::AwaitingMovement { .. } => {
                let session = self.session.as_mut()?;
                let movement = session.current_movement()?;

                // APPROACH baseline: captured lazily from the first sample
                // observed in this phase, cleared on return to Centering
                if movement == MovementType::Approach && session.reference_distance.is_none() {
                    session.reference_distance = Some(sample.inter_eye_distance);
                    debug!(
                        reference = sample.inter_eye_distance,
                        "approach reference distance captured"
                    );
                }

                if classifier::matches_movement(
                    sample,
                    movement,
                    session.reference_distance,
                    &self.thresholds,
                ) {
                    let step_index = session.current_index as u32 + 1;
                    let is_final = session.on_last_step();
                    session.current_index += 1;
                    session.reference_distance = None;
                    self.phase = Phase::Submitting;
                    info!(%movement, step_index, is_final, "movement detected");
                    return Some(StepCompletion {
                        step_index,
                        movement,
                        success: true,
                        is_final,
                        trigger: StepTrigger::MovementDetected,
                    });
                }
                None
            }
            // Movement during Idle, Preparing, Submitting or a terminal
            // phase never counts as a detection
            _ => None,
        }
    }

    /// Advance the countdown or fire the movement deadline. A tick that
    /// arrives after a phase transition finds no armed instant and is a
    /// no-op.
    pub fn on_tick(&mut self, now: Instant) -> Option<StepCompletion> {
        match self.phase {
            Phase::Preparing {
                remaining,
                next_tick,
            } if now >= next_tick => {
                if remaining <= 1 {
                    let deadline = now + self.config.movement_timeout;
                    info!(movement = ?self.current_movement(), "countdown finished, awaiting movement");
                    self.phase = Phase::AwaitingMovement { deadline };
                } else {
                    self.phase = Phase::Preparing {
                        remaining: remaining - 1,
                        next_tick: now + Duration::from_secs(1),
                    };
                }
                None
            }
            Phase::AwaitingMovement { deadline } if now >= deadline => {
                let session = self.session.as_mut()?;
                let movement = session.current_movement()?;
                let step_index = session.current_index as u32 + 1;
                let is_final = session.on_last_step();
                self.phase = Phase::Failed {
                    reason: FailReason::Timeout,
                };
                info!(%movement, step_index, "movement timed out");
                // Timeout is terminal locally; the completion still goes out
                // as a best-effort failure record
                Some(StepCompletion {
                    step_index,
                    movement,
                    success: false,
                    is_final,
                    trigger: StepTrigger::Timeout,
                })
            }
            _ => None,
        }
    }

    /// Called once the completion's record has been handed to the backend
    /// task: non-final steps return to Centering, the final step parks in
    /// Completed(pending) until the decision arrives.
    pub fn mark_dispatched(&mut self, completion: &StepCompletion) {
        if self.phase != Phase::Submitting {
            return;
        }
        if completion.is_final {
            self.phase = Phase::Completed {
                outcome: Outcome::Pending,
            };
        } else {
            self.phase = Phase::Centering;
        }
    }

    /// Resolve the pending backend decision for the final step
    pub fn resolve_outcome(&mut self, accepted: bool) {
        if let Phase::Completed {
            outcome: Outcome::Pending,
        } = self.phase
        {
            self.phase = Phase::Completed {
                outcome: if accepted {
                    Outcome::Accepted
                } else {
                    Outcome::Rejected
                },
            };
        }
    }

    /// The final-step exchange failed; no outcome exists
    pub fn fail_backend(&mut self) {
        if let Phase::Completed {
            outcome: Outcome::Pending,
        } = self.phase
        {
            self.phase = Phase::Failed {
                reason: FailReason::Backend,
            };
        }
    }
}
