//! Submission reconciler: evidence records, response normalization,
//! success classification, discrepancy detection, final outcome synthesis
//!
//! The backend's response shape is heterogeneous: a JSON object, an object
//! whose `body` field holds a JSON string, or a raw JSON string. Everything
//! is normalized into one canonical [`ScoreReport`] before any business
//! logic runs. The backend is the source of truth for the accept/reject
//! decision; the local step count only drives the UI sequence.

use chrono::Utc;
use serde_json::Value;
use tracing::warn;

use crate::types::{BackendError, MovementType, ScoreReport, SubmissionRecord};
use crate::{ESTADO_EXITOSA, POSITIVE_MARKERS, SUCCESS_SCORE_THRESHOLD};

/// Authoritative session result derived from the last backend response
#[derive(Debug, Clone, PartialEq)]
pub struct FinalOutcome {
    pub accepted: bool,
    pub score: f64,
    pub estado_final: String,
    /// Backend's blink total, falling back to the local count when omitted
    pub total_parpadeos: u32,
    /// Human-readable result message
    pub message: String,
}

/// Build the evidence record for one step. Data-URL prefixes on the photo
/// payload are stripped; the backend expects bare Base64.
pub fn build_record(
    session_id: &str,
    step_index: u32,
    movement: MovementType,
    success: bool,
    blink_count: u32,
    photo: &str,
) -> SubmissionRecord {
    let photo_base64 = match photo.find("base64,") {
        Some(pos) if photo.starts_with("data:") => photo[pos + "base64,".len()..].to_string(),
        _ => photo.to_string(),
    };

    SubmissionRecord {
        session_id: session_id.to_string(),
        step_index,
        movement,
        success,
        timestamp: Utc::now(),
        photo_base64,
        blink_count,
    }
}

/// Normalize a raw backend reply into the canonical report.
///
/// Accepts, in order: a raw JSON string, an object with a `body` field
/// (string or object), or the object itself.
pub fn normalize_reply(raw: &Value) -> Result<ScoreReport, BackendError> {
    let object = match raw {
        Value::String(text) => serde_json::from_str::<Value>(text)
            .map_err(|e| BackendError::Malformed(format!("string body: {}", e)))?,
        Value::Object(map) => match map.get("body") {
            Some(Value::String(text)) => serde_json::from_str::<Value>(text)
                .map_err(|e| BackendError::Malformed(format!("body field: {}", e)))?,
            Some(inner @ Value::Object(_)) => inner.clone(),
            _ => raw.clone(),
        },
        _ => {
            return Err(BackendError::Malformed(format!(
                "unexpected reply type: {}",
                raw
            )))
        }
    };

    serde_json::from_value(object).map_err(|e| BackendError::Malformed(e.to_string()))
}

/// Success classification, in priority order: score ≥ 80, the "Exitosa"
/// final state, a positive message marker, then an explicit success flag.
pub fn is_successful(report: &ScoreReport) -> bool {
    if matches!(report.score, Some(score) if score >= SUCCESS_SCORE_THRESHOLD) {
        return true;
    }
    if report.estado_final.as_deref() == Some(ESTADO_EXITOSA) {
        return true;
    }
    if let Some(message) = &report.message {
        if POSITIVE_MARKERS.iter().any(|marker| message.contains(marker)) {
            return true;
        }
    }
    report.success == Some(true)
}

/// Compare the backend's completed-step count against the local one.
/// A mismatch is logged and returned for inspection but never overrides the
/// backend's score.
pub fn check_discrepancy(report: &ScoreReport, local_completed: u32) -> Option<(u32, u32)> {
    match report.exitosos {
        Some(remote) if remote != local_completed => {
            warn!(
                remote,
                local = local_completed,
                "backend step count disagrees with local count; backend score stays authoritative"
            );
            Some((remote, local_completed))
        }
        _ => None,
    }
}

/// Derive the session outcome from the final response, taking the backend's
/// fields verbatim and filling gaps from local bookkeeping.
pub fn final_outcome(report: &ScoreReport, local_blinks: u32) -> FinalOutcome {
    let accepted = is_successful(report);
    let score = report.score.unwrap_or(0.0);
    let estado_final = report
        .estado_final
        .clone()
        .unwrap_or_else(|| "Pendiente".to_string());
    let total_parpadeos = report.total_parpadeos.unwrap_or(local_blinks);

    let message = result_message(report, accepted, score, &estado_final, total_parpadeos);

    FinalOutcome {
        accepted,
        score,
        estado_final,
        total_parpadeos,
        message,
    }
}

fn result_message(
    report: &ScoreReport,
    accepted: bool,
    score: f64,
    estado_final: &str,
    total_parpadeos: u32,
) -> String {
    let icon = if accepted { "✅" } else { "❌" };
    let verdict = if accepted { "SUCCESSFUL" } else { "REJECTED" };

    // Reuse the backend's own message when it already carries a verdict
    if let Some(message) = &report.message {
        if POSITIVE_MARKERS.iter().any(|marker| message.contains(marker)) {
            return format!(
                "{} {} (state: {}, score: {}%, blinks: {})",
                icon, message, estado_final, score, total_parpadeos
            );
        }
    }

    if accepted {
        format!(
            "{} Validation {}! Score: {}%. Blinks detected: {}.",
            icon, verdict, score, total_parpadeos
        )
    } else {
        format!(
            "{} Validation {}. Score: {}%. Blinks detected: {}. \
             Complete every movement, keep good lighting, and move clearly.",
            icon, verdict, score, total_parpadeos
        )
    }
}
