//! SurrealDB implementation of [`PlantRepository`].

use std::collections::HashSet;

use canopy_core::error::CanopyResult;
use canopy_core::models::plant::{CreatePlant, Plant, RelocatePlants};
use canopy_core::repository::PlantRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{parse_enum, parse_uuid};

#[derive(Debug, SurrealValue)]
struct PlantRow {
    strain_id: String,
    tent_id: String,
    status: String,
    mother_plant_id: Option<String>,
    label: Option<String>,
    created_at: DateTime<Utc>,
}

impl PlantRow {
    fn into_plant(self, id: Uuid) -> Result<Plant, DbError> {
        let mother_plant_id = self
            .mother_plant_id
            .as_deref()
            .map(|s| parse_uuid(s, "mother plant"))
            .transpose()?;
        Ok(Plant {
            id,
            strain_id: parse_uuid(&self.strain_id, "strain")?,
            tent_id: parse_uuid(&self.tent_id, "tent")?,
            status: parse_enum(&self.status, "plant status")?,
            mother_plant_id,
            label: self.label,
            created_at: self.created_at,
        })
    }
}

/// Row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PlantRowWithId {
    record_id: String,
    strain_id: String,
    tent_id: String,
    status: String,
    mother_plant_id: Option<String>,
    label: Option<String>,
    created_at: DateTime<Utc>,
}

impl PlantRowWithId {
    fn try_into_plant(self) -> Result<Plant, DbError> {
        let id = parse_uuid(&self.record_id, "plant")?;
        let row = PlantRow {
            strain_id: self.strain_id,
            tent_id: self.tent_id,
            status: self.status,
            mother_plant_id: self.mother_plant_id,
            label: self.label,
            created_at: self.created_at,
        };
        row.into_plant(id)
    }
}

/// SurrealDB implementation of the Plant repository.
#[derive(Clone)]
pub struct SurrealPlantRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPlantRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PlantRepository for SurrealPlantRepository<C> {
    async fn create(&self, input: CreatePlant) -> CanopyResult<Plant> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('plant', $id) SET \
                 strain_id = $strain_id, \
                 tent_id = $tent_id, \
                 status = 'Active', \
                 mother_plant_id = $mother_plant_id, \
                 label = $label",
            )
            .bind(("id", id_str.clone()))
            .bind(("strain_id", input.strain_id.to_string()))
            .bind(("tent_id", input.tent_id.to_string()))
            .bind(("mother_plant_id", input.mother_plant_id.map(|m| m.to_string())))
            .bind(("label", input.label))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        let rows: Vec<PlantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "plant".into(),
            id: id_str,
        })?;

        Ok(row.into_plant(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CanopyResult<Plant> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('plant', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PlantRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "plant".into(),
            id: id_str,
        })?;

        Ok(row.into_plant(id)?)
    }

    async fn list_active_by_tent(&self, tent_id: Uuid) -> CanopyResult<Vec<Plant>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM plant \
                 WHERE tent_id = $tent_id AND status = 'Active' \
                 ORDER BY created_at ASC",
            )
            .bind(("tent_id", tent_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PlantRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_plant())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn archive(&self, ids: &[Uuid]) -> CanopyResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        self.db
            .query(
                "FOR $pid IN $ids { \
                 UPDATE type::record('plant', $pid) SET status = 'Archived'; }",
            )
            .bind(("ids", id_strs.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        Ok(id_strs.len() as u64)
    }

    async fn relocate(&self, input: RelocatePlants) -> CanopyResult<u64> {
        // Duplicate ids collapse to one move.
        let mut seen = HashSet::new();
        let ids: Vec<String> = input
            .plant_ids
            .iter()
            .filter(|id| seen.insert(**id))
            .map(Uuid::to_string)
            .collect();

        if ids.is_empty() {
            return Ok(0);
        }

        // All-or-nothing: every move and its history record commit
        // together, and a plant outside the source tent aborts the
        // whole batch.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 FOR $pid IN $ids { \
                 LET $current = (SELECT VALUE tent_id FROM \
                 type::record('plant', $pid)); \
                 IF array::len($current) == 0 OR $current[0] != $from_tent { \
                 THROW string::concat('plant_not_in_tent:', $pid) }; \
                 UPDATE type::record('plant', $pid) SET tent_id = $to_tent; \
                 CREATE type::record('plant_tent_history', \
                 type::string(rand::uuid::v4())) SET plant_id = $pid, \
                 from_tent_id = $from_tent, to_tent_id = $to_tent, \
                 reason = $reason; }; \
                 COMMIT TRANSACTION;",
            )
            .bind(("ids", ids.clone()))
            .bind(("from_tent", input.from_tent_id.to_string()))
            .bind(("to_tent", input.to_tent_id.to_string()))
            .bind(("reason", input.reason))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| {
            let msg = e.to_string();
            if let Some(rest) = msg.split("plant_not_in_tent:").nth(1) {
                let pid: String = rest.chars().take(36).collect();
                DbError::Relocation(format!("plant {pid} is not in the source tent"))
            } else {
                DbError::Surreal(e)
            }
        })?;

        Ok(ids.len() as u64)
    }
}
