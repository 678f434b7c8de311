//! Landmark classifier: pure threshold tests over a detection sample
//!
//! Thresholds are scale-relative (normalized coordinates), never pixels, so
//! classification is resolution-independent. All functions are stateless;
//! APPROACH needs a per-step reference distance supplied by the caller.

use serde::Serialize;

use crate::types::{DetectionSample, MovementType, Thresholds};

/// True iff the nose sits within ε of the frame center on both axes
pub fn is_centered(sample: &DetectionSample, th: &Thresholds) -> bool {
    (sample.nose_x - 0.5).abs() < th.center_epsilon
        && (sample.nose_y - 0.5).abs() < th.center_epsilon
}

/// True iff both eyelids are closed below the blink epsilon
pub fn is_blinking(sample: &DetectionSample, th: &Thresholds) -> bool {
    sample.left_eye_aperture < th.blink_epsilon && sample.right_eye_aperture < th.blink_epsilon
}

/// Per-type movement test against nose position or distance ratio.
///
/// APPROACH requires `reference_distance` (captured at the first sample of
/// the step); without it the frame cannot match.
pub fn matches_movement(
    sample: &DetectionSample,
    movement: MovementType,
    reference_distance: Option<f64>,
    th: &Thresholds,
) -> bool {
    match movement {
        MovementType::Up => sample.nose_y < th.up,
        MovementType::Down => sample.nose_y > th.down,
        MovementType::Left => sample.nose_x > th.left,
        MovementType::Right => sample.nose_x < th.right,
        MovementType::Approach => match reference_distance {
            Some(reference) if reference > 0.0 => {
                sample.inter_eye_distance / reference > th.approach_ratio
            }
            _ => false,
        },
    }
}

/// Debug metrics for one movement test, for progress logging
#[derive(Debug, Clone, Serialize)]
pub struct MovementReading {
    pub movement: MovementType,
    /// Observed value: nose coordinate, or distance ratio for APPROACH
    pub current: f64,
    pub threshold: f64,
    pub detected: bool,
}

/// Compute the debug reading for a movement test.
///
/// Returns `None` when the test cannot be evaluated on this frame
/// (APPROACH without a reference distance).
pub fn movement_reading(
    sample: &DetectionSample,
    movement: MovementType,
    reference_distance: Option<f64>,
    th: &Thresholds,
) -> Option<MovementReading> {
    let (current, threshold) = match movement {
        MovementType::Up => (sample.nose_y, th.up),
        MovementType::Down => (sample.nose_y, th.down),
        MovementType::Left => (sample.nose_x, th.left),
        MovementType::Right => (sample.nose_x, th.right),
        MovementType::Approach => {
            let reference = reference_distance.filter(|r| *r > 0.0)?;
            (sample.inter_eye_distance / reference, th.approach_ratio)
        }
    };

    Some(MovementReading {
        movement,
        current,
        threshold,
        detected: matches_movement(sample, movement, reference_distance, th),
    })
}
