//! Per-frame detection sample extracted from a face-landmark array
//!
//! The landmark model produces ≥478 normalized points per frame. Index
//! assignments follow that model: nose tip at 1, eye corners at 33/263,
//! right eyelid at 159/145, left eyelid at 386/374 (eye naming is
//! mirrored-view, same as the rest of the system).

use serde::{Deserialize, Serialize};

use crate::MIN_LANDMARK_COUNT;

/// One normalized landmark point as delivered by the detector: [x, y, z]
pub type RawLandmark = [f64; 3];

const NOSE_TIP: usize = 1;
const LEFT_EYE_CORNER: usize = 33;
const RIGHT_EYE_CORNER: usize = 263;
const RIGHT_EYE_LID_TOP: usize = 159;
const RIGHT_EYE_LID_BOTTOM: usize = 145;
const LEFT_EYE_LID_TOP: usize = 386;
const LEFT_EYE_LID_BOTTOM: usize = 374;

/// The measurements the orchestrator needs from a single frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionSample {
    /// Nose tip x in [0, 1] normalized image coordinates
    pub nose_x: f64,
    /// Nose tip y in [0, 1] normalized image coordinates
    pub nose_y: f64,
    /// Vertical eyelid distance of the (mirrored-view) left eye
    pub left_eye_aperture: f64,
    /// Vertical eyelid distance of the (mirrored-view) right eye
    pub right_eye_aperture: f64,
    /// Distance between the eye corners, the scale reference for APPROACH
    pub inter_eye_distance: f64,
}

impl DetectionSample {
    /// Extract a sample from a raw landmark array.
    ///
    /// Returns `None` when the array is too short to classify; the caller
    /// skips the frame rather than failing the session.
    pub fn from_landmarks(landmarks: &[RawLandmark]) -> Option<Self> {
        if landmarks.len() < MIN_LANDMARK_COUNT {
            return None;
        }

        let nose = landmarks[NOSE_TIP];
        let left_corner = landmarks[LEFT_EYE_CORNER];
        let right_corner = landmarks[RIGHT_EYE_CORNER];

        let dx = left_corner[0] - right_corner[0];
        let dy = left_corner[1] - right_corner[1];
        let inter_eye_distance = (dx * dx + dy * dy).sqrt();

        let right_eye_aperture =
            (landmarks[RIGHT_EYE_LID_TOP][1] - landmarks[RIGHT_EYE_LID_BOTTOM][1]).abs();
        let left_eye_aperture =
            (landmarks[LEFT_EYE_LID_TOP][1] - landmarks[LEFT_EYE_LID_BOTTOM][1]).abs();

        Some(Self {
            nose_x: nose[0],
            nose_y: nose[1],
            left_eye_aperture,
            right_eye_aperture,
            inter_eye_distance,
        })
    }
}
