//! Submission wire types
//!
//! Field names on both directions are the backend's Spanish protocol
//! literals; the Rust side keeps its own naming via serde renames.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::MovementType;

/// Evidence for one completed or failed step, sent to the scoring backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    #[serde(rename = "identificador")]
    pub session_id: String,
    /// 1-based step index
    #[serde(rename = "intento")]
    pub step_index: u32,
    #[serde(rename = "tipoMovimiento")]
    pub movement: MovementType,
    #[serde(rename = "exitoso")]
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    /// Opaque Base64 image payload from the capture collaborator
    #[serde(rename = "fotoBase64")]
    pub photo_base64: String,
    /// Blinks counted so far in the session
    #[serde(rename = "parpadeos")]
    pub blink_count: u32,
}

/// Canonical backend response after normalization.
///
/// Every field is optional because the backend's shape is heterogeneous;
/// the reconciler applies its priority rules over whatever is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(
        default,
        rename = "estadoFinal",
        skip_serializing_if = "Option::is_none"
    )]
    pub estado_final: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    /// Steps the backend counted as successful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exitosos: Option<u32>,
    #[serde(
        default,
        rename = "totalParpadeos",
        skip_serializing_if = "Option::is_none"
    )]
    pub total_parpadeos: Option<u32>,
}
