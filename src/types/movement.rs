//! Movement type definitions
//!
//! LEFT/RIGHT are mirrored on-screen directions, not anatomical: the camera
//! preview is mirrored, so "left" is where the user sees their face go, which
//! means the nose landmark's x *increases*. Wire names are the backend's
//! Spanish literals.

use serde::{Deserialize, Serialize};

/// The five movement challenges a user can be asked to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementType {
    /// Tilt the head up (nose y shrinks)
    #[serde(rename = "arriba")]
    Up,
    /// Tilt the head down (nose y grows)
    #[serde(rename = "abajo")]
    Down,
    /// Turn toward the mirrored-view left (nose x grows)
    #[serde(rename = "izquierda")]
    Left,
    /// Turn toward the mirrored-view right (nose x shrinks)
    #[serde(rename = "derecha")]
    Right,
    /// Lean toward the camera (inter-eye distance grows)
    #[serde(rename = "acercarse")]
    Approach,
}

impl MovementType {
    /// All five movements; challenge sequences sample from this set
    /// without replacement
    pub const ALL: [MovementType; 5] = [
        MovementType::Up,
        MovementType::Down,
        MovementType::Left,
        MovementType::Right,
        MovementType::Approach,
    ];

    /// Wire name as the backend expects it
    pub fn wire_name(&self) -> &'static str {
        match self {
            MovementType::Up => "arriba",
            MovementType::Down => "abajo",
            MovementType::Left => "izquierda",
            MovementType::Right => "derecha",
            MovementType::Approach => "acercarse",
        }
    }

    /// Instruction shown to the user
    pub fn instruction(&self) -> &'static str {
        match self {
            MovementType::Up => "look up",
            MovementType::Down => "look down",
            MovementType::Left => "turn left",
            MovementType::Right => "turn right",
            MovementType::Approach => "move closer to the camera",
        }
    }
}

impl std::fmt::Display for MovementType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.wire_name())
    }
}
