//! SurrealDB implementation of [`StrainRepository`].

use canopy_core::error::CanopyResult;
use canopy_core::models::strain::{CreateStrain, Strain};
use canopy_core::repository::{PaginatedResult, Pagination, StrainRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::parse_uuid;

#[derive(Debug, SurrealValue)]
struct StrainRow {
    name: String,
    vega_weeks: u32,
    flora_weeks: u32,
    created_at: DateTime<Utc>,
}

impl StrainRow {
    fn into_strain(self, id: Uuid) -> Strain {
        Strain {
            id,
            name: self.name,
            vega_weeks: self.vega_weeks,
            flora_weeks: self.flora_weeks,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, SurrealValue)]
struct StrainRowWithId {
    record_id: String,
    name: String,
    vega_weeks: u32,
    flora_weeks: u32,
    created_at: DateTime<Utc>,
}

impl StrainRowWithId {
    fn try_into_strain(self) -> Result<Strain, DbError> {
        let id = parse_uuid(&self.record_id, "strain")?;
        Ok(Strain {
            id,
            name: self.name,
            vega_weeks: self.vega_weeks,
            flora_weeks: self.flora_weeks,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Strain repository.
#[derive(Clone)]
pub struct SurrealStrainRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealStrainRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> StrainRepository for SurrealStrainRepository<C> {
    async fn create(&self, input: CreateStrain) -> CanopyResult<Strain> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('strain', $id) SET \
                 name = $name, \
                 vega_weeks = $vega_weeks, \
                 flora_weeks = $flora_weeks",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("vega_weeks", input.vega_weeks))
            .bind(("flora_weeks", input.flora_weeks))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        let rows: Vec<StrainRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "strain".into(),
            id: id_str,
        })?;

        Ok(row.into_strain(id))
    }

    async fn get_by_id(&self, id: Uuid) -> CanopyResult<Strain> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('strain', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StrainRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "strain".into(),
            id: id_str,
        })?;

        Ok(row.into_strain(id))
    }

    async fn get_many(&self, ids: &[Uuid]) -> CanopyResult<Vec<Strain>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM strain \
                 WHERE meta::id(id) IN $ids",
            )
            .bind(("ids", id_strs))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StrainRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_strain())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn list(&self, pagination: Pagination) -> CanopyResult<PaginatedResult<Strain>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM strain GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM strain \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StrainRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_strain())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
