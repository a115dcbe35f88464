//! SurrealDB implementation of [`PlantHistoryRepository`].
//!
//! History rows are written inside relocation transactions (see the
//! plant and cycle repositories); this repository only reads them.

use canopy_core::error::CanopyResult;
use canopy_core::models::history::PlantTentHistory;
use canopy_core::repository::PlantHistoryRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct HistoryRowWithId {
    record_id: String,
    plant_id: String,
    from_tent_id: String,
    to_tent_id: String,
    moved_at: DateTime<Utc>,
    reason: String,
}

impl HistoryRowWithId {
    fn try_into_history(self) -> Result<PlantTentHistory, DbError> {
        Ok(PlantTentHistory {
            id: parse_uuid(&self.record_id, "history")?,
            plant_id: parse_uuid(&self.plant_id, "plant")?,
            from_tent_id: parse_uuid(&self.from_tent_id, "tent")?,
            to_tent_id: parse_uuid(&self.to_tent_id, "tent")?,
            moved_at: self.moved_at,
            reason: self.reason,
        })
    }
}

/// SurrealDB implementation of the PlantTentHistory repository.
#[derive(Clone)]
pub struct SurrealPlantHistoryRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPlantHistoryRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PlantHistoryRepository for SurrealPlantHistoryRepository<C> {
    async fn list_by_plant(&self, plant_id: Uuid) -> CanopyResult<Vec<PlantTentHistory>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM plant_tent_history \
                 WHERE plant_id = $plant_id \
                 ORDER BY moved_at ASC",
            )
            .bind(("plant_id", plant_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HistoryRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_history())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
