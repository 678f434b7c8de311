//! Challenge configuration
//!
//! Threshold tables exist in several tunings; these are configuration, not
//! constants. Defaults are the soft table, forgiving of natural wobble.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_APPROACH_RATIO, DEFAULT_BLINK_EPSILON, DEFAULT_CENTER_EPSILON,
    DEFAULT_MOVEMENT_TIMEOUT_MS, DEFAULT_PREPARATION_COUNTDOWN, DEFAULT_REQUIRED_BLINKS,
    DEFAULT_STEP_COUNT, DEFAULT_THRESHOLD_DOWN, DEFAULT_THRESHOLD_LEFT, DEFAULT_THRESHOLD_RIGHT,
    DEFAULT_THRESHOLD_UP,
};

/// Injected threshold table for the landmark classifier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Max nose offset from (0.5, 0.5) still counted as centered
    pub center_epsilon: f64,
    /// Eyelid aperture below which an eye counts as closed
    pub blink_epsilon: f64,
    /// UP: nose y must drop below this
    pub up: f64,
    /// DOWN: nose y must rise above this
    pub down: f64,
    /// LEFT (mirrored view): nose x must rise above this
    pub left: f64,
    /// RIGHT (mirrored view): nose x must drop below this
    pub right: f64,
    /// APPROACH: inter-eye distance ratio against the step reference
    pub approach_ratio: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            center_epsilon: DEFAULT_CENTER_EPSILON,
            blink_epsilon: DEFAULT_BLINK_EPSILON,
            up: DEFAULT_THRESHOLD_UP,
            down: DEFAULT_THRESHOLD_DOWN,
            left: DEFAULT_THRESHOLD_LEFT,
            right: DEFAULT_THRESHOLD_RIGHT,
            approach_ratio: DEFAULT_APPROACH_RATIO,
        }
    }
}

/// Challenge shape and timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChallengeConfig {
    /// Movements per session; clamped to the 5 available types
    pub steps: usize,
    /// Blinks expected over the session (reported, not locally enforced)
    pub required_blinks: u32,
    /// Seconds counted down before movement measurement starts
    pub preparation_countdown: u32,
    /// Time allowed for each movement
    pub movement_timeout: Duration,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEP_COUNT,
            required_blinks: DEFAULT_REQUIRED_BLINKS,
            preparation_countdown: DEFAULT_PREPARATION_COUNTDOWN,
            movement_timeout: Duration::from_millis(DEFAULT_MOVEMENT_TIMEOUT_MS),
        }
    }
}

impl ChallengeConfig {
    /// Effective step count: at least 1, at most the 5 movement types
    pub fn effective_steps(&self) -> usize {
        self.steps.clamp(1, 5)
    }
}
