//! Error types for the canopy system.

use uuid::Uuid;

use crate::models::cycle::Phase;

#[derive(Debug, thiserror::Error)]
pub enum CanopyError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Tent {tent_id} already hosts active cycle {cycle_id}")]
    TentOccupied { tent_id: Uuid, cycle_id: Uuid },

    #[error("Invalid phase transition: cycle is in {from}, requested {requested}")]
    InvalidPhaseTransition { from: Phase, requested: Phase },

    #[error("No mother plant to clone from")]
    MissingMotherPlant,

    #[error("No weekly target data for {phase} week {week}")]
    NoTargetData { phase: Phase, week: u32 },

    #[error("Plant relocation failed: {reason}")]
    RelocationFailed { reason: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type CanopyResult<T> = Result<T, CanopyError>;
