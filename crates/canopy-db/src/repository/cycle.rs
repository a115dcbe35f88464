//! SurrealDB implementation of [`CycleRepository`].
//!
//! Tent occupancy is the primary concurrency hazard: the check for an
//! existing active cycle and the write that allocates the tent must be
//! one atomic unit. Every guarded operation here runs as a single
//! `BEGIN TRANSACTION … COMMIT TRANSACTION` query that `THROW`s a
//! marker string on conflict; [`DbError::from_thrown`] turns that back
//! into a typed `TentOccupied` error.

use std::collections::{HashMap, HashSet};

use canopy_core::error::CanopyResult;
use canopy_core::models::cycle::{CreateCycle, Cycle, UpdateCycle};
use canopy_core::models::plant::Plant;
use canopy_core::repository::{
    CycleRepository, PaginatedResult, Pagination, PlantPlan, TransitionOutcome, TransitionPlan,
};
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::{DbError, TENT_OCCUPIED_MARKER};
use crate::repository::{parse_enum, parse_uuid};

#[derive(Debug, SurrealValue)]
struct CycleRow {
    tent_id: String,
    strain_id: Option<String>,
    status: String,
    start_date: DateTime<Utc>,
    cloning_start_date: Option<DateTime<Utc>>,
    flora_start_date: Option<DateTime<Utc>>,
    drying_start_date: Option<DateTime<Utc>>,
    clones_produced: Option<u32>,
    mother_plant_id: Option<String>,
    harvest_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CycleRow {
    fn into_cycle(self, id: Uuid) -> Result<Cycle, DbError> {
        let strain_id = self
            .strain_id
            .as_deref()
            .map(|s| parse_uuid(s, "strain"))
            .transpose()?;
        let mother_plant_id = self
            .mother_plant_id
            .as_deref()
            .map(|s| parse_uuid(s, "mother plant"))
            .transpose()?;
        Ok(Cycle {
            id,
            tent_id: parse_uuid(&self.tent_id, "tent")?,
            strain_id,
            status: parse_enum(&self.status, "cycle status")?,
            start_date: self.start_date,
            cloning_start_date: self.cloning_start_date,
            flora_start_date: self.flora_start_date,
            drying_start_date: self.drying_start_date,
            clones_produced: self.clones_produced,
            mother_plant_id,
            harvest_notes: self.harvest_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct CycleRowWithId {
    record_id: String,
    tent_id: String,
    strain_id: Option<String>,
    status: String,
    start_date: DateTime<Utc>,
    cloning_start_date: Option<DateTime<Utc>>,
    flora_start_date: Option<DateTime<Utc>>,
    drying_start_date: Option<DateTime<Utc>>,
    clones_produced: Option<u32>,
    mother_plant_id: Option<String>,
    harvest_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl CycleRowWithId {
    fn try_into_cycle(self) -> Result<Cycle, DbError> {
        let id = parse_uuid(&self.record_id, "cycle")?;
        let row = CycleRow {
            tent_id: self.tent_id,
            strain_id: self.strain_id,
            status: self.status,
            start_date: self.start_date,
            cloning_start_date: self.cloning_start_date,
            flora_start_date: self.flora_start_date,
            drying_start_date: self.drying_start_date,
            clones_produced: self.clones_produced,
            mother_plant_id: self.mother_plant_id,
            harvest_notes: self.harvest_notes,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        row.into_cycle(id)
    }
}

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
        let mother_plant_id = self
            .mother_plant_id
            .as_deref()
            .map(|s| parse_uuid(s, "mother plant"))
            .transpose()?;
        Ok(Plant {
            id: parse_uuid(&self.record_id, "plant")?,
            strain_id: parse_uuid(&self.strain_id, "strain")?,
            tent_id: parse_uuid(&self.tent_id, "tent")?,
            status: parse_enum(&self.status, "plant status")?,
            mother_plant_id,
            label: self.label,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// Push an in-transaction occupancy guard for the tent bound as
/// `$<bind>`. Excludes `$cycle_id` so retargeting a cycle onto its own
/// tent stays a no-op instead of conflicting with itself.
fn push_occupancy_guard(stmts: &mut Vec<String>, bind: &str) {
    stmts.push(format!(
        "LET $occ_{bind} = (SELECT VALUE meta::id(id) FROM cycle \
         WHERE tent_id = ${bind} AND status = 'Active' \
         AND meta::id(id) != $cycle_id)"
    ));
    stmts.push(format!(
        "IF array::len($occ_{bind}) > 0 {{ \
         THROW string::concat('{TENT_OCCUPIED_MARKER}', ${bind}, ':', $occ_{bind}[0]) }}"
    ));
}

/// SET clauses for an [`UpdateCycle`] patch. `Some(None)` fields clear
/// to `NONE`; `None` fields are left untouched.
fn update_set_clauses(input: &UpdateCycle, sets: &mut Vec<String>) {
    if input.start_date.is_some() {
        sets.push("start_date = $u_start_date".into());
    }
    match &input.cloning_start_date {
        Some(Some(_)) => sets.push("cloning_start_date = $u_cloning".into()),
        Some(None) => sets.push("cloning_start_date = NONE".into()),
        None => {}
    }
    match &input.flora_start_date {
        Some(Some(_)) => sets.push("flora_start_date = $u_flora".into()),
        Some(None) => sets.push("flora_start_date = NONE".into()),
        None => {}
    }
    match &input.drying_start_date {
        Some(Some(_)) => sets.push("drying_start_date = $u_drying".into()),
        Some(None) => sets.push("drying_start_date = NONE".into()),
        None => {}
    }
    match &input.strain_id {
        Some(Some(_)) => sets.push("strain_id = $u_strain".into()),
        Some(None) => sets.push("strain_id = NONE".into()),
        None => {}
    }
    match &input.mother_plant_id {
        Some(Some(_)) => sets.push("mother_plant_id = $u_mother".into()),
        Some(None) => sets.push("mother_plant_id = NONE".into()),
        None => {}
    }
    if input.clones_produced.is_some() {
        sets.push("clones_produced = $u_clones".into());
    }
    match &input.harvest_notes {
        Some(Some(_)) => sets.push("harvest_notes = $u_notes".into()),
        Some(None) => sets.push("harvest_notes = NONE".into()),
        None => {}
    }
}

/// Bind values for the clauses emitted by [`update_set_clauses`].
/// A macro so the query-builder type never needs naming.
macro_rules! bind_cycle_update {
    ($builder:ident, $input:expr) => {{
        let input = $input;
        if let Some(start_date) = input.start_date {
            $builder = $builder.bind(("u_start_date", start_date));
        }
        if let Some(Some(date)) = input.cloning_start_date {
            $builder = $builder.bind(("u_cloning", date));
        }
        if let Some(Some(date)) = input.flora_start_date {
            $builder = $builder.bind(("u_flora", date));
        }
        if let Some(Some(date)) = input.drying_start_date {
            $builder = $builder.bind(("u_drying", date));
        }
        if let Some(Some(strain_id)) = input.strain_id {
            $builder = $builder.bind(("u_strain", strain_id.to_string()));
        }
        if let Some(Some(mother_id)) = input.mother_plant_id {
            $builder = $builder.bind(("u_mother", mother_id.to_string()));
        }
        if let Some(clones) = input.clones_produced {
            $builder = $builder.bind(("u_clones", clones));
        }
        if let Some(Some(notes)) = input.harvest_notes {
            $builder = $builder.bind(("u_notes", notes));
        }
    }};
}

/// Deduplicate while preserving first-seen order.
fn dedup_ids(ids: &[Uuid]) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(**id))
        .map(Uuid::to_string)
        .collect()
}

/// SurrealDB implementation of the Cycle repository.
#[derive(Clone)]
pub struct SurrealCycleRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCycleRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch(&self, id: Uuid) -> Result<Cycle, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('cycle', $id)")
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<CycleRow> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "cycle".into(),
            id: id_str,
        })?;

        row.into_cycle(id)
    }

    async fn fetch_plants(&self, ids: &[Uuid]) -> Result<Vec<Plant>, DbError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_strs: Vec<String> = ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM plant \
                 WHERE meta::id(id) IN $ids",
            )
            .bind(("ids", id_strs))
            .await?;

        let rows: Vec<PlantRowWithId> = result.take(0)?;
        let mut by_id: HashMap<Uuid, Plant> = rows
            .into_iter()
            .map(|row| row.try_into_plant().map(|p| (p.id, p)))
            .collect::<Result<_, DbError>>()?;

        // Preserve the caller's (creation) order.
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }
}

impl<C: Connection> CycleRepository for SurrealCycleRepository<C> {
    async fn create(&self, input: CreateCycle) -> CanopyResult<Cycle> {
        let id = Uuid::new_v4();

        // Occupancy check and insert are one transaction; a conflict
        // THROWs and rolls the insert back.
        let result = self
            .db
            .query(format!(
                "BEGIN TRANSACTION; \
                 LET $occ = (SELECT VALUE meta::id(id) FROM cycle \
                 WHERE tent_id = $tent_id AND status = 'Active'); \
                 IF array::len($occ) > 0 {{ \
                 THROW string::concat('{TENT_OCCUPIED_MARKER}', $tent_id, ':', $occ[0]) }}; \
                 CREATE type::record('cycle', $id) SET \
                 tent_id = $tent_id, \
                 strain_id = $strain_id, \
                 status = 'Active', \
                 start_date = $start_date, \
                 cloning_start_date = $cloning_start_date, \
                 flora_start_date = $flora_start_date, \
                 drying_start_date = $drying_start_date, \
                 mother_plant_id = $mother_plant_id; \
                 COMMIT TRANSACTION;"
            ))
            .bind(("id", id.to_string()))
            .bind(("tent_id", input.tent_id.to_string()))
            .bind(("strain_id", input.strain_id.map(|s| s.to_string())))
            .bind(("start_date", input.start_date))
            .bind(("cloning_start_date", input.cloning_start_date))
            .bind(("flora_start_date", input.flora_start_date))
            .bind(("drying_start_date", input.drying_start_date))
            .bind(("mother_plant_id", input.mother_plant_id.map(|m| m.to_string())))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(DbError::from_thrown)?;

        Ok(self.fetch(id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> CanopyResult<Cycle> {
        Ok(self.fetch(id).await?)
    }

    async fn get_active_by_tent(&self, tent_id: Uuid) -> CanopyResult<Option<Cycle>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM cycle \
                 WHERE tent_id = $tent_id AND status = 'Active'",
            )
            .bind(("tent_id", tent_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CycleRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_cycle())
            .transpose()?)
    }

    async fn update(&self, id: Uuid, input: UpdateCycle) -> CanopyResult<Cycle> {
        let mut sets = Vec::new();
        update_set_clauses(&input, &mut sets);
        sets.push("updated_at = time::now()".into());

        let query = format!("UPDATE type::record('cycle', $id) SET {}", sets.join(", "));

        let mut builder = self.db.query(query).bind(("id", id.to_string()));
        bind_cycle_update!(builder, input);
        let result = builder.await.map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        Ok(self.fetch(id).await?)
    }

    async fn finish(&self, id: Uuid) -> CanopyResult<Cycle> {
        self.db
            .query(
                "UPDATE type::record('cycle', $id) SET \
                 status = 'Finished', updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        Ok(self.fetch(id).await?)
    }

    async fn apply_transition(&self, plan: TransitionPlan) -> CanopyResult<TransitionOutcome> {
        let mut stmts: Vec<String> = vec!["BEGIN TRANSACTION".into()];

        // Guards for every tent the plan allocates.
        if plan.retarget_tent_id.is_some() {
            push_occupancy_guard(&mut stmts, "retarget_tent");
        }
        if plan.new_cycle.is_some() {
            push_occupancy_guard(&mut stmts, "new_tent");
        }

        // Patch (and possibly finish/retarget) the source cycle.
        let mut sets = Vec::new();
        update_set_clauses(&plan.update, &mut sets);
        if plan.retarget_tent_id.is_some() {
            sets.push("tent_id = $retarget_tent".into());
        }
        if plan.finish_source {
            sets.push("status = 'Finished'".into());
        }
        sets.push("updated_at = time::now()".into());
        stmts.push(format!(
            "UPDATE type::record('cycle', $cycle_id) SET {}",
            sets.join(", ")
        ));

        // Relocate or archive plants.
        let (move_ids, archive_ids) = match &plan.plants {
            PlantPlan::Keep => (Vec::new(), Vec::new()),
            PlantPlan::Relocate { plant_ids, .. } => (dedup_ids(plant_ids), Vec::new()),
            PlantPlan::Archive { plant_ids } => (Vec::new(), dedup_ids(plant_ids)),
        };
        if !move_ids.is_empty() {
            stmts.push(
                "FOR $pid IN $move_ids { \
                 UPDATE type::record('plant', $pid) SET tent_id = $move_to; \
                 CREATE type::record('plant_tent_history', \
                 type::string(rand::uuid::v4())) SET plant_id = $pid, \
                 from_tent_id = $move_from, to_tent_id = $move_to, \
                 reason = $move_reason; }"
                    .into(),
            );
        }
        if !archive_ids.is_empty() {
            stmts.push(
                "FOR $pid IN $archive_ids { \
                 UPDATE type::record('plant', $pid) SET status = 'Archived'; }"
                    .into(),
            );
        }

        // Clone batch: ids are generated here so the created plants can
        // be read back after commit. UUIDs are safe to embed literally.
        let mut clone_ids = Vec::new();
        if let Some(batch) = &plan.clones {
            for _ in 0..batch.count {
                let clone_id = Uuid::new_v4();
                stmts.push(format!(
                    "CREATE type::record('plant', '{clone_id}') SET \
                     strain_id = $clone_strain, \
                     tent_id = $clone_tent, \
                     status = 'Active', \
                     mother_plant_id = $clone_mother"
                ));
                clone_ids.push(clone_id);
            }
        }

        // Successor cycle on its (guarded) tent.
        let new_cycle_id = plan.new_cycle.as_ref().map(|_| Uuid::new_v4());
        if new_cycle_id.is_some() {
            stmts.push(
                "CREATE type::record('cycle', $new_id) SET \
                 tent_id = $new_tent, \
                 strain_id = $new_strain, \
                 status = 'Active', \
                 start_date = $new_start, \
                 cloning_start_date = $new_cloning, \
                 flora_start_date = $new_flora, \
                 drying_start_date = $new_drying, \
                 mother_plant_id = $new_mother"
                    .into(),
            );
        }

        stmts.push("COMMIT TRANSACTION".into());
        let query = format!("{};", stmts.join("; "));

        let mut builder = self
            .db
            .query(query)
            .bind(("cycle_id", plan.cycle_id.to_string()));
        bind_cycle_update!(builder, plan.update);

        if let Some(tent_id) = plan.retarget_tent_id {
            builder = builder.bind(("retarget_tent", tent_id.to_string()));
        }
        match plan.plants {
            PlantPlan::Keep => {}
            PlantPlan::Relocate {
                from_tent_id,
                to_tent_id,
                reason,
                ..
            } => {
                builder = builder
                    .bind(("move_ids", move_ids.clone()))
                    .bind(("move_from", from_tent_id.to_string()))
                    .bind(("move_to", to_tent_id.to_string()))
                    .bind(("move_reason", reason));
            }
            PlantPlan::Archive { .. } => {
                builder = builder.bind(("archive_ids", archive_ids.clone()));
            }
        }
        if let Some(batch) = plan.clones {
            builder = builder
                .bind(("clone_strain", batch.strain_id.to_string()))
                .bind(("clone_tent", batch.tent_id.to_string()))
                .bind(("clone_mother", batch.mother_plant_id.to_string()));
        }
        if let (Some(new_id), Some(new_cycle)) = (new_cycle_id, plan.new_cycle) {
            builder = builder
                .bind(("new_id", new_id.to_string()))
                .bind(("new_tent", new_cycle.tent_id.to_string()))
                .bind(("new_strain", new_cycle.strain_id.map(|s| s.to_string())))
                .bind(("new_start", new_cycle.start_date))
                .bind(("new_cloning", new_cycle.cloning_start_date))
                .bind(("new_flora", new_cycle.flora_start_date))
                .bind(("new_drying", new_cycle.drying_start_date))
                .bind(("new_mother", new_cycle.mother_plant_id.map(|m| m.to_string())));
        }

        let result = builder.await.map_err(DbError::from)?;
        result.check().map_err(DbError::from_thrown)?;

        // The transaction committed; read the outcome back.
        let cycle = self.fetch(plan.cycle_id).await?;
        let new_cycle = match new_cycle_id {
            Some(id) => Some(self.fetch(id).await?),
            None => None,
        };
        let clones = self.fetch_plants(&clone_ids).await?;

        Ok(TransitionOutcome {
            cycle,
            new_cycle,
            plants_moved: move_ids.len() as u64,
            plants_archived: archive_ids.len() as u64,
            clones,
        })
    }

    async fn list_by_tent(
        &self,
        tent_id: Uuid,
        pagination: Pagination,
    ) -> CanopyResult<PaginatedResult<Cycle>> {
        let tent_id_str = tent_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM cycle \
                 WHERE tent_id = $tent_id GROUP ALL",
            )
            .bind(("tent_id", tent_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM cycle \
                 WHERE tent_id = $tent_id \
                 ORDER BY start_date DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("tent_id", tent_id_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CycleRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_cycle())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
