//! Challenge runtime: single-threaded event loop over frames, ticks and
//! submission completions
//!
//! Frame callbacks, timer ticks and async submission results all funnel into
//! one consumer and mutate the session through it, so no locking is needed
//! and every mutation sees a consistent phase. Submission results are tagged
//! with the session id and step index captured at dispatch time; a result
//! for a stale session or an already-passed step can only touch the status
//! message, never the sequence cursor.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::core::backend::{EvidenceSource, ScoringBackend};
use crate::core::blink::BlinkCounter;
use crate::core::classifier;
use crate::core::reconciler;
use crate::core::sequencer::{ChallengeSequencer, StepCompletion};
use crate::core::store::StateStore;
use crate::types::{
    BackendError, ChallengeConfig, DetectionSample, Outcome, Phase, Thresholds, ValidationState,
};
use crate::TICK_INTERVAL_MS;

const MSG_CENTER_FACE: &str = "🕒 Align your face to the center...";
const MSG_CENTER_CONTINUE: &str =
    "✅ Movement completed. Align your face to the center to continue...";
const MSG_PROCESSING_FINAL: &str = "⏳ Processing final validation...";
const MSG_TIMEOUT: &str = "❌ Validation failed: time expired. Try again.";

/// Everything that can drive the runtime
#[derive(Debug)]
pub enum Event {
    /// Begin a fresh session, cancelling any previous one
    Start { session_id: Option<String> },
    /// One detector frame
    Frame(DetectionSample),
    /// Periodic driver tick; resolves countdown and deadline instants
    Tick,
    /// An outbound submission finished
    SubmissionResolved {
        /// Session the submission belonged to, for stale-result detection
        session_id: String,
        /// 1-based step captured at dispatch time
        step_index: u32,
        is_final: bool,
        result: Result<Value, BackendError>,
    },
    /// Return to Idle, clearing counters and deadlines
    Reset,
}

/// Cheap handle for producers and observers
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    tx: mpsc::Sender<Event>,
    state: watch::Receiver<ValidationState>,
}

impl RuntimeHandle {
    pub async fn start(&self, session_id: Option<String>) {
        let _ = self.tx.send(Event::Start { session_id }).await;
    }

    pub async fn frame(&self, sample: DetectionSample) {
        let _ = self.tx.send(Event::Frame(sample)).await;
    }

    pub async fn reset(&self) {
        let _ = self.tx.send(Event::Reset).await;
    }

    /// Latest state snapshot
    pub fn state(&self) -> ValidationState {
        self.state.borrow().clone()
    }

    /// Observe every merge update
    pub fn subscribe(&self) -> watch::Receiver<ValidationState> {
        self.state.clone()
    }
}

/// Owns the sequencer, blink counter and state store; consumes events
pub struct ChallengeRuntime {
    config: ChallengeConfig,
    thresholds: Thresholds,
    sequencer: ChallengeSequencer,
    blinks: BlinkCounter,
    store: StateStore,
    backend: Arc<dyn ScoringBackend>,
    evidence: Arc<dyn EvidenceSource>,
    rng: SmallRng,
    /// Loopback sender so spawned submissions report back as events
    tx: mpsc::Sender<Event>,
    last_reading_log: Option<Instant>,
}

impl ChallengeRuntime {
    pub fn new(
        config: ChallengeConfig,
        thresholds: Thresholds,
        backend: Arc<dyn ScoringBackend>,
        evidence: Arc<dyn EvidenceSource>,
        seed: Option<u64>,
    ) -> (Self, RuntimeHandle, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(64);
        let store = StateStore::new(ValidationState::idle(&config));
        let handle = RuntimeHandle {
            tx: tx.clone(),
            state: store.subscribe(),
        };
        let rng = match seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let runtime = Self {
            sequencer: ChallengeSequencer::new(config.clone(), thresholds),
            blinks: BlinkCounter::new(),
            store,
            backend,
            evidence,
            rng,
            tx,
            last_reading_log: None,
            config,
            thresholds,
        };
        (runtime, handle, rx)
    }

    /// Consume events until all producers drop. Runs the driver ticker
    /// internally; everything funnels through [`Self::handle_event`].
    pub async fn run(mut self, mut events: mpsc::Receiver<Event>) {
        let mut ticker = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                maybe = events.recv() => match maybe {
                    Some(event) => self.handle_event(event, Instant::now()),
                    None => break,
                },
                _ = ticker.tick() => self.handle_event(Event::Tick, Instant::now()),
            }
        }
    }

    /// Single state-transition function; `now` is injected so tests drive a
    /// simulated clock
    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::Start { session_id } => self.on_start(session_id),
            Event::Reset => self.on_reset(),
            Event::Frame(sample) => self.on_frame(&sample, now),
            Event::Tick => self.on_tick(now),
            Event::SubmissionResolved {
                session_id,
                step_index,
                is_final,
                result,
            } => self.on_submission_resolved(&session_id, step_index, is_final, result),
        }
    }

    /// Latest snapshot, for synchronous callers (tests)
    pub fn snapshot(&self) -> ValidationState {
        self.store.snapshot()
    }

    fn on_start(&mut self, session_id: Option<String>) {
        self.blinks.reset();
        self.last_reading_log = None;
        let session = self.sequencer.start(&mut self.rng, session_id);
        let id = session.id.clone();
        let total = session.total_steps() as u32;
        let movement = session.current_movement().map(|m| m.wire_name().to_string());

        let mut state = ValidationState::idle(&self.config);
        state.is_in_progress = true;
        state.phase = self.sequencer.phase().name().to_string();
        state.session_id = id;
        state.current_step = 1;
        state.total_steps = total;
        state.current_movement = movement;
        state.status_message = MSG_CENTER_FACE.to_string();
        self.store.replace(state);
    }

    fn on_reset(&mut self) {
        self.sequencer.reset();
        self.blinks.reset();
        self.last_reading_log = None;
        self.store.replace(ValidationState::idle(&self.config));
    }

    fn on_frame(&mut self, sample: &DetectionSample, now: Instant) {
        let phase = self.sequencer.phase();
        if phase == Phase::Idle || phase.is_terminal() {
            return;
        }

        // Blink counting runs every frame, independent of the phase
        if self
            .blinks
            .observe(classifier::is_blinking(sample, &self.thresholds))
        {
            let count = self.blinks.count();
            debug!(count, "blink detected");
            self.store.apply(|state| state.blinks_detected = count);
        }

        // Throttled progress reading while a movement is awaited
        if matches!(phase, Phase::AwaitingMovement { .. }) {
            let throttled = self
                .last_reading_log
                .is_some_and(|t| now.duration_since(t) < Duration::from_secs(2));
            if !throttled {
                let reference = self
                    .sequencer
                    .session()
                    .and_then(|s| s.reference_distance);
                if let Some(movement) = self.sequencer.current_movement() {
                    if let Some(reading) =
                        classifier::movement_reading(sample, movement, reference, &self.thresholds)
                    {
                        debug!(
                            movement = %reading.movement,
                            current = reading.current,
                            threshold = reading.threshold,
                            "movement progress"
                        );
                    }
                }
                self.last_reading_log = Some(now);
            }
        }

        let before = self.sequencer.phase();
        let completion = self.sequencer.on_sample(sample, now);
        self.note_phase_change(before, now);

        if let Some(completion) = completion {
            self.dispatch(completion);
        }
    }

    fn on_tick(&mut self, now: Instant) {
        let before = self.sequencer.phase();
        let completion = self.sequencer.on_tick(now);
        self.note_phase_change(before, now);

        if let Some(completion) = completion {
            // Timeout: terminal locally, failure evidence goes out anyway
            self.store.apply(|state| {
                state.is_in_progress = false;
                state.phase = "failed".to_string();
                state.current_movement = None;
                state.status_message = MSG_TIMEOUT.to_string();
            });
            self.dispatch(completion);
        }
    }

    /// Update the status message when the sequencer moved between the
    /// user-visible waiting phases
    fn note_phase_change(&mut self, before: Phase, _now: Instant) {
        let after = self.sequencer.phase();
        if before == after {
            return;
        }
        let movement = self.sequencer.current_movement();
        match after {
            Phase::Preparing { remaining, .. } => {
                if let Some(movement) = movement {
                    let phase_name = after.name().to_string();
                    self.store.apply(|state| {
                        state.phase = phase_name;
                        state.status_message = format!(
                            "Get ready to {} in {}...",
                            movement.instruction(),
                            remaining
                        );
                    });
                }
            }
            Phase::AwaitingMovement { .. } => {
                if let Some(movement) = movement {
                    self.store.apply(|state| {
                        state.phase = "awaiting_movement".to_string();
                        state.status_message =
                            format!("Perform the movement: {}", movement.instruction());
                    });
                }
            }
            _ => {}
        }
    }

    /// Hand a completed or failed step to the backend task and advance the
    /// local sequence without waiting for the reply
    fn dispatch(&mut self, completion: StepCompletion) {
        let Some(session) = self.sequencer.session() else {
            return;
        };
        let session_id = session.id.clone();
        let photo = self.evidence.capture().unwrap_or_default();
        let record = reconciler::build_record(
            &session_id,
            completion.step_index,
            completion.movement,
            completion.success,
            self.blinks.count(),
            &photo,
        );

        self.sequencer.mark_dispatched(&completion);

        if completion.success {
            let next_movement = self
                .sequencer
                .current_movement()
                .map(|m| m.wire_name().to_string());
            let phase_name = self.sequencer.phase().name().to_string();
            let wire = completion.movement.wire_name().to_string();
            self.store.apply(|state| {
                state.movements_completed.push(wire);
                state.phase = phase_name;
                if completion.is_final {
                    state.current_step = completion.step_index;
                    state.current_movement = None;
                    state.status_message = MSG_PROCESSING_FINAL.to_string();
                } else {
                    state.current_step = completion.step_index + 1;
                    state.current_movement = next_movement;
                    state.status_message = MSG_CENTER_CONTINUE.to_string();
                }
            });
        }

        let backend = Arc::clone(&self.backend);
        let tx = self.tx.clone();
        let step_index = completion.step_index;
        let is_final = completion.is_final;
        tokio::spawn(async move {
            let result = backend.submit(&record).await;
            let _ = tx
                .send(Event::SubmissionResolved {
                    session_id,
                    step_index,
                    is_final,
                    result,
                })
                .await;
        });
    }

    fn on_submission_resolved(
        &mut self,
        session_id: &str,
        step_index: u32,
        is_final: bool,
        result: Result<Value, BackendError>,
    ) {
        // A result for a session that has been reset or replaced is dropped
        let current = self.sequencer.session().map(|s| s.id.as_str());
        if current != Some(session_id) {
            debug!(session_id, step_index, "stale submission result dropped");
            return;
        }

        // Best-effort failure evidence after a timeout: the local Failed
        // outcome stands regardless of what the backend says
        if matches!(self.sequencer.phase(), Phase::Failed { .. }) {
            match result {
                Ok(_) => debug!(step_index, "failure evidence acknowledged"),
                Err(error) => warn!(%error, step_index, "failure evidence submission failed"),
            }
            return;
        }

        match result.and_then(|raw| reconciler::normalize_reply(&raw)) {
            Ok(report) => {
                let pending_final = is_final
                    && self.sequencer.phase()
                        == (Phase::Completed {
                            outcome: Outcome::Pending,
                        });
                if pending_final {
                    let local_completed = self
                        .sequencer
                        .session()
                        .map(|s| s.current_index as u32)
                        .unwrap_or(0);
                    reconciler::check_discrepancy(&report, local_completed);

                    let outcome = reconciler::final_outcome(&report, self.blinks.count());
                    self.sequencer.resolve_outcome(outcome.accepted);
                    self.store.apply(|state| {
                        state.is_in_progress = false;
                        state.phase = "completed".to_string();
                        state.score = Some(outcome.score);
                        state.estado_final = Some(outcome.estado_final.clone());
                        state.total_parpadeos = Some(outcome.total_parpadeos);
                        state.status_message = outcome.message.clone();
                    });
                } else if !is_final {
                    // The sequencer has already advanced on local detection;
                    // the reply only refreshes the visible status
                    if reconciler::is_successful(&report) {
                        self.store.apply(|state| {
                            state.status_message =
                                format!("✅ Step {} accepted by the server", step_index);
                        });
                    } else {
                        let message = report
                            .message
                            .unwrap_or_else(|| "validation error".to_string());
                        warn!(step_index, %message, "non-final step rejected; local sequence continues");
                        self.store.apply(|state| {
                            state.status_message = format!("⚠ {}", message);
                        });
                    }
                }
            }
            Err(error) => {
                warn!(%error, step_index, is_final, "submission exchange failed");
                let pending_final = is_final
                    && self.sequencer.phase()
                        == (Phase::Completed {
                            outcome: Outcome::Pending,
                        });
                let message = error.status_message();
                if pending_final {
                    self.sequencer.fail_backend();
                    self.store.apply(|state| {
                        state.is_in_progress = false;
                        state.phase = "failed".to_string();
                        state.status_message = message;
                    });
                } else {
                    self.store.apply(|state| state.status_message = message);
                }
            }
        }
    }
}
