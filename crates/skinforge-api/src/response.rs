//! Success response envelope for generation handlers.

use serde::Serialize;
use skinforge_db::models::skin::Skin;

use crate::engine::generator::GenerationOutcome;

/// Wire form of a successful generation: the persisted skin plus the
/// duplicate flag and the request-pacing hint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub duplicate: bool,
    /// Epoch second before which the caller should not send another request.
    pub next_request: i64,
    #[serde(flatten)]
    pub skin: Skin,
}

impl GenerateResponse {
    pub fn new(outcome: GenerationOutcome, next_request: i64) -> Self {
        Self {
            success: true,
            duplicate: outcome.duplicate.is_some(),
            next_request,
            skin: outcome.skin,
        }
    }
}
