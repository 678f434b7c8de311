//! Core engine: classification, sequencing, reconciliation and the
//! surrounding runtime plumbing

pub mod api;
pub mod backend;
pub mod blink;
pub mod classifier;
pub mod reconciler;
pub mod runtime;
pub mod sequencer;
pub mod session;
pub mod store;

pub use backend::{EvidenceSource, LatestFrameEvidence, ScoringBackend, SimulatedBackend};
pub use blink::BlinkCounter;
pub use runtime::{ChallengeRuntime, Event, RuntimeHandle};
pub use sequencer::{ChallengeSequencer, StepCompletion, StepTrigger};
pub use session::ChallengeSession;
pub use store::StateStore;
