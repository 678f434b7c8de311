//! Observable validation state
//!
//! The single shared surface the presentation layer sees. Mutated only
//! through the runtime's merge update, which replaces the whole snapshot, so
//! observers always get a consistent view.

use serde::{Deserialize, Serialize};

use crate::types::ChallengeConfig;

/// Snapshot of a validation session as exposed to observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationState {
    pub is_in_progress: bool,
    /// Current phase name (see [`crate::types::Phase::name`])
    pub phase: String,
    pub session_id: String,
    /// 1-based index of the movement being worked on; 0 when none
    pub current_step: u32,
    pub total_steps: u32,
    /// Movement the user is being asked to perform, wire name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_movement: Option<String>,
    /// Wire names of locally completed movements, in order
    pub movements_completed: Vec<String>,
    pub blinks_detected: u32,
    pub required_blinks: u32,
    pub status_message: String,
    /// Backend score (0-100), present once the final response arrived
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    /// Backend final-state literal, e.g. "Exitosa"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estado_final: Option<String>,
    /// Blink total as the backend counted it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_parpadeos: Option<u32>,
}

impl ValidationState {
    /// The idle state before any session starts
    pub fn idle(config: &ChallengeConfig) -> Self {
        Self {
            is_in_progress: false,
            phase: "idle".to_string(),
            session_id: String::new(),
            current_step: 0,
            total_steps: config.effective_steps() as u32,
            current_movement: None,
            movements_completed: Vec::new(),
            blinks_detected: 0,
            required_blinks: config.required_blinks,
            status_message: "Press start to begin validation.".to_string(),
            score: None,
            estado_final: None,
            total_parpadeos: None,
        }
    }
}
