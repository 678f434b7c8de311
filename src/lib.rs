//! Vida: liveness challenge orchestrator
//!
//! Turns a stream of per-frame face-landmark measurements into a randomized
//! movement-and-blink challenge (centering → countdown → movement-wait →
//! completion/timeout) and reconciles local completion with a remote
//! scoring decision.

pub mod core;
pub mod types;

// =============================================================================
// DETECTION THRESHOLDS [C] - soft defaults, tolerate natural user wobble
// =============================================================================

/// Nose offset from frame center (normalized coords) still counted as centered
pub const DEFAULT_CENTER_EPSILON: f64 = 0.05;

/// Eyelid aperture (normalized) below which both eyes count as closed
pub const DEFAULT_BLINK_EPSILON: f64 = 0.005;

/// Nose y below this → UP detected
pub const DEFAULT_THRESHOLD_UP: f64 = 0.35;

/// Nose y above this → DOWN detected
pub const DEFAULT_THRESHOLD_DOWN: f64 = 0.65;

/// Nose x above this → LEFT detected (mirrored on-screen direction)
pub const DEFAULT_THRESHOLD_LEFT: f64 = 0.65;

/// Nose x below this → RIGHT detected (mirrored on-screen direction)
pub const DEFAULT_THRESHOLD_RIGHT: f64 = 0.35;

/// Inter-eye distance ratio above which APPROACH is detected
pub const DEFAULT_APPROACH_RATIO: f64 = 1.15;

/// Minimum landmark count for a usable frame; fewer means skip, not fail
pub const MIN_LANDMARK_COUNT: usize = 478;

// =============================================================================
// CHALLENGE TIMING [C]
// =============================================================================

/// Movements per challenge (sampled without replacement from the 5 types)
pub const DEFAULT_STEP_COUNT: usize = 3;

/// Blinks the backend expects over the whole session
pub const DEFAULT_REQUIRED_BLINKS: u32 = 2;

/// Seconds of countdown before movement measurement begins
pub const DEFAULT_PREPARATION_COUNTDOWN: u32 = 3;

/// Time allowed to perform a requested movement (milliseconds)
pub const DEFAULT_MOVEMENT_TIMEOUT_MS: u64 = 10_000;

/// Driver tick granularity (milliseconds); countdown and deadline checks
/// resolve against instants stored in the phase, so this only bounds latency
pub const TICK_INTERVAL_MS: u64 = 200;

// =============================================================================
// BACKEND RECONCILIATION [C]
// =============================================================================

/// Score at or above this counts as a successful step/session
pub const SUCCESS_SCORE_THRESHOLD: f64 = 80.0;

/// Backend literal for a successful final state
pub const ESTADO_EXITOSA: &str = "Exitosa";

/// Message fragments the backend uses to signal success
pub const POSITIVE_MARKERS: [&str; 4] = ["correctamente", "✅", "completa", "Exitosa"];

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "1.0.0";
