//! Catalog-checked public-ID allocation.

use skinforge_core::error::GenerateError;
use skinforge_core::ids::OptimusEncoder;
use skinforge_core::types::DbId;
use skinforge_db::catalog::Catalog;

use super::EngineError;

/// Redraw budget before giving up on the ID space.
pub const MAX_ID_TRIES: u32 = 10;

/// Draw a fresh public ID that is not yet present in the catalog.
///
/// Exhausting the budget signals an effectively full ID space and should
/// alarm, not be treated as a routine failure.
pub async fn allocate(
    catalog: &dyn Catalog,
    encoder: &OptimusEncoder,
) -> Result<DbId, EngineError> {
    for _ in 0..MAX_ID_TRIES {
        // 31-bit draw to stay inside the encoder's input space.
        let draw = rand::random::<u32>() >> 1;
        let id = encoder.encode(draw) as DbId;
        if !catalog.exists_skin_id(id).await? {
            return Ok(id);
        }
        tracing::warn!(id, "Skin id collision, redrawing");
    }
    Err(GenerateError::FailedToCreateId(MAX_ID_TRIES).into())
}
