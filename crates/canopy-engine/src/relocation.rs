//! Plant relocation service.
//!
//! Thin orchestration over [`PlantRepository::relocate`], which moves
//! the batch and writes its history records in one transaction. Also
//! used directly by the request layer for administrative moves outside
//! a phase transition.

use canopy_core::error::{CanopyError, CanopyResult};
use canopy_core::models::plant::RelocatePlants;
use canopy_core::repository::PlantRepository;
use tracing::info;

pub struct RelocationService<P: PlantRepository> {
    plant_repo: P,
}

impl<P: PlantRepository> RelocationService<P> {
    pub fn new(plant_repo: P) -> Self {
        Self { plant_repo }
    }

    /// Move a batch of plants between tents, all-or-nothing.
    /// Returns the number of plants moved (duplicates collapse).
    pub async fn relocate(&self, input: RelocatePlants) -> CanopyResult<u64> {
        if input.from_tent_id == input.to_tent_id {
            return Err(CanopyError::Validation {
                message: "source and destination tent are the same".into(),
            });
        }
        if input.plant_ids.is_empty() {
            return Ok(0);
        }

        let moved = self.plant_repo.relocate(input.clone()).await?;

        info!(
            from = %input.from_tent_id,
            to = %input.to_tent_id,
            moved,
            reason = %input.reason,
            "Relocated plant batch"
        );

        Ok(moved)
    }
}
