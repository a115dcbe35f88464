//! Database-specific error types and conversions.

use canopy_core::error::CanopyError;
use uuid::Uuid;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Tent {tent_id} already hosts active cycle {cycle_id}")]
    TentOccupied { tent_id: Uuid, cycle_id: Uuid },

    #[error("Constraint violated: {0}")]
    Constraint(String),

    #[error("Invalid stored data: {0}")]
    Corrupt(String),

    #[error("Relocation aborted: {0}")]
    Relocation(String),
}

/// Marker embedded in `THROW`n occupancy errors so the guarded
/// transaction queries can surface a typed conflict. Format:
/// `tent_occupied:<tent uuid>:<cycle uuid>`.
pub(crate) const TENT_OCCUPIED_MARKER: &str = "tent_occupied:";

impl DbError {
    /// Map a SurrealDB error, recognizing occupancy conflicts thrown
    /// from inside guarded transactions.
    pub(crate) fn from_thrown(err: surrealdb::Error) -> Self {
        let msg = err.to_string();
        if let Some(rest) = msg.split(TENT_OCCUPIED_MARKER).nth(1) {
            let ids: Vec<&str> = rest.splitn(2, ':').collect();
            if let [tent, cycle] = ids[..] {
                let cycle = cycle
                    .trim_matches(|c: char| !(c.is_ascii_hexdigit() || c == '-'))
                    .get(..36)
                    .unwrap_or(cycle);
                if let (Ok(tent_id), Ok(cycle_id)) =
                    (Uuid::parse_str(tent.trim()), Uuid::parse_str(cycle))
                {
                    return DbError::TentOccupied { tent_id, cycle_id };
                }
            }
        }
        DbError::Surreal(err)
    }
}

impl From<DbError> for CanopyError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => CanopyError::NotFound { entity, id },
            DbError::TentOccupied { tent_id, cycle_id } => {
                CanopyError::TentOccupied { tent_id, cycle_id }
            }
            DbError::Constraint(message) => CanopyError::Validation { message },
            DbError::Relocation(reason) => CanopyError::RelocationFailed { reason },
            other => CanopyError::Database(other.to_string()),
        }
    }
}
