//! Core types for Vida

mod config;
mod error;
mod movement;
mod phase;
mod sample;
mod state;
mod submission;

pub use config::{ChallengeConfig, Thresholds};
pub use error::BackendError;
pub use movement::MovementType;
pub use phase::{FailReason, Outcome, Phase};
pub use sample::{DetectionSample, RawLandmark};
pub use state::ValidationState;
pub use submission::{ScoreReport, SubmissionRecord};
