//! SurrealDB implementation of [`TentRepository`].

use canopy_core::error::CanopyResult;
use canopy_core::models::tent::{CreateTent, Tent, UpdateTent};
use canopy_core::repository::{PaginatedResult, Pagination, TentRepository};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{parse_enum, parse_uuid};

#[derive(Debug, SurrealValue)]
struct TentRow {
    name: String,
    category: String,
    width_cm: f64,
    depth_cm: f64,
    height_cm: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TentRow {
    fn into_tent(self, id: Uuid) -> Result<Tent, DbError> {
        Ok(Tent {
            id,
            name: self.name,
            category: parse_enum(&self.category, "tent category")?,
            width_cm: self.width_cm,
            depth_cm: self.depth_cm,
            height_cm: self.height_cm,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct TentRowWithId {
    record_id: String,
    name: String,
    category: String,
    width_cm: f64,
    depth_cm: f64,
    height_cm: f64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TentRowWithId {
    fn try_into_tent(self) -> Result<Tent, DbError> {
        let id = parse_uuid(&self.record_id, "tent")?;
        Ok(Tent {
            id,
            name: self.name,
            category: parse_enum(&self.category, "tent category")?,
            width_cm: self.width_cm,
            depth_cm: self.depth_cm,
            height_cm: self.height_cm,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Tent repository.
#[derive(Clone)]
pub struct SurrealTentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealTentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> TentRepository for SurrealTentRepository<C> {
    async fn create(&self, input: CreateTent) -> CanopyResult<Tent> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('tent', $id) SET \
                 name = $name, \
                 category = $category, \
                 width_cm = $width_cm, \
                 depth_cm = $depth_cm, \
                 height_cm = $height_cm",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("category", input.category.as_str()))
            .bind(("width_cm", input.width_cm))
            .bind(("depth_cm", input.depth_cm))
            .bind(("height_cm", input.height_cm))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        let rows: Vec<TentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tent".into(),
            id: id_str,
        })?;

        Ok(row.into_tent(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> CanopyResult<Tent> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('tent', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tent".into(),
            id: id_str,
        })?;

        Ok(row.into_tent(id)?)
    }

    async fn update(&self, id: Uuid, input: UpdateTent) -> CanopyResult<Tent> {
        let id_str = id.to_string();

        let mut sets = Vec::new();
        if input.name.is_some() {
            sets.push("name = $name");
        }
        if input.category.is_some() {
            sets.push("category = $category");
        }
        if input.width_cm.is_some() {
            sets.push("width_cm = $width_cm");
        }
        if input.depth_cm.is_some() {
            sets.push("depth_cm = $depth_cm");
        }
        if input.height_cm.is_some() {
            sets.push("height_cm = $height_cm");
        }
        sets.push("updated_at = time::now()");

        let query = format!("UPDATE type::record('tent', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(&query).bind(("id", id_str.clone()));

        if let Some(name) = input.name {
            builder = builder.bind(("name", name));
        }
        if let Some(category) = input.category {
            builder = builder.bind(("category", category.as_str()));
        }
        if let Some(width_cm) = input.width_cm {
            builder = builder.bind(("width_cm", width_cm));
        }
        if let Some(depth_cm) = input.depth_cm {
            builder = builder.bind(("depth_cm", depth_cm));
        }
        if let Some(height_cm) = input.height_cm {
            builder = builder.bind(("height_cm", height_cm));
        }

        let result = builder.await.map_err(DbError::from)?;
        let mut result = result
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        let rows: Vec<TentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "tent".into(),
            id: id_str,
        })?;

        Ok(row.into_tent(id)?)
    }

    async fn delete(&self, id: Uuid) -> CanopyResult<()> {
        // Refuse deletion while any cycle references the tent; the
        // check and the delete are one transaction.
        let result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 LET $refs = (SELECT VALUE meta::id(id) FROM cycle \
                 WHERE tent_id = $id); \
                 IF array::len($refs) > 0 { \
                 THROW 'tent_referenced' }; \
                 DELETE type::record('tent', $id); \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| {
            let msg = e.to_string();
            if msg.contains("tent_referenced") {
                DbError::Constraint("tent is referenced by one or more cycles".into())
            } else {
                DbError::Surreal(e)
            }
        })?;

        Ok(())
    }

    async fn list(&self, pagination: Pagination) -> CanopyResult<PaginatedResult<Tent>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM tent GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM tent \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_tent())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
