//! Lifecycle error types.

use canopy_core::error::CanopyError;
use canopy_core::models::cycle::Phase;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("cycle is in {from}, cannot transition to {requested}")]
    InvalidTransition { from: Phase, requested: Phase },

    #[error("cycle {cycle_id} is already finished")]
    CycleFinished { cycle_id: Uuid },

    #[error("cycle {cycle_id} already has a cloning episode in progress")]
    CloningAlreadyStarted { cycle_id: Uuid },

    #[error("cycle {cycle_id} has no cloning episode in progress")]
    CloningNotStarted { cycle_id: Uuid },

    #[error("no mother plant to clone from")]
    MissingMotherPlant,

    #[error("no weekly target data for {phase} week {week}")]
    NoTargetData { phase: Phase, week: u32 },

    #[error("seedling count must be at least 1")]
    EmptyCloneBatch,
}

impl From<LifecycleError> for CanopyError {
    fn from(err: LifecycleError) -> Self {
        match err {
            LifecycleError::InvalidTransition { from, requested } => {
                CanopyError::InvalidPhaseTransition { from, requested }
            }
            LifecycleError::MissingMotherPlant => CanopyError::MissingMotherPlant,
            LifecycleError::NoTargetData { phase, week } => {
                CanopyError::NoTargetData { phase, week }
            }
            LifecycleError::CycleFinished { .. }
            | LifecycleError::CloningAlreadyStarted { .. }
            | LifecycleError::CloningNotStarted { .. }
            | LifecycleError::EmptyCloneBatch => CanopyError::Validation {
                message: err.to_string(),
            },
        }
    }
}
