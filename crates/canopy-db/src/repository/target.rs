//! SurrealDB implementation of [`WeeklyTargetRepository`].
//!
//! Bounds are stored flattened (`ppfd_min`/`ppfd_max`, …) to keep the
//! SCHEMAFULL DDL simple; rows are folded back into [`Bounds`] pairs on
//! read.

use canopy_core::error::CanopyResult;
use canopy_core::models::cycle::Phase;
use canopy_core::models::target::{Bounds, CreateWeeklyTarget, WeeklyTarget};
use canopy_core::repository::WeeklyTargetRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::{parse_enum, parse_uuid};

#[derive(Debug, SurrealValue)]
struct TargetRowWithId {
    record_id: String,
    strain_id: String,
    phase: String,
    week_number: u32,
    ppfd_min: f64,
    ppfd_max: f64,
    photoperiod_min: f64,
    photoperiod_max: f64,
    temperature_min: f64,
    temperature_max: f64,
    humidity_min: f64,
    humidity_max: f64,
    ph_min: f64,
    ph_max: f64,
    ec_min: f64,
    ec_max: f64,
    created_at: DateTime<Utc>,
}

impl TargetRowWithId {
    fn try_into_target(self) -> Result<WeeklyTarget, DbError> {
        Ok(WeeklyTarget {
            id: parse_uuid(&self.record_id, "weekly target")?,
            strain_id: parse_uuid(&self.strain_id, "strain")?,
            phase: parse_enum(&self.phase, "phase")?,
            week_number: self.week_number,
            ppfd: Bounds::new(self.ppfd_min, self.ppfd_max),
            photoperiod_hours: Bounds::new(self.photoperiod_min, self.photoperiod_max),
            temperature_c: Bounds::new(self.temperature_min, self.temperature_max),
            humidity_pct: Bounds::new(self.humidity_min, self.humidity_max),
            ph: Bounds::new(self.ph_min, self.ph_max),
            ec_ms_cm: Bounds::new(self.ec_min, self.ec_max),
            created_at: self.created_at,
        })
    }
}

/// SurrealDB implementation of the WeeklyTarget repository.
#[derive(Clone)]
pub struct SurrealWeeklyTargetRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealWeeklyTargetRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> WeeklyTargetRepository for SurrealWeeklyTargetRepository<C> {
    async fn create(&self, input: CreateWeeklyTarget) -> CanopyResult<WeeklyTarget> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('weekly_target', $id) SET \
                 strain_id = $strain_id, \
                 phase = $phase, \
                 week_number = $week_number, \
                 ppfd_min = $ppfd_min, ppfd_max = $ppfd_max, \
                 photoperiod_min = $photoperiod_min, \
                 photoperiod_max = $photoperiod_max, \
                 temperature_min = $temperature_min, \
                 temperature_max = $temperature_max, \
                 humidity_min = $humidity_min, \
                 humidity_max = $humidity_max, \
                 ph_min = $ph_min, ph_max = $ph_max, \
                 ec_min = $ec_min, ec_max = $ec_max",
            )
            .bind(("id", id_str.clone()))
            .bind(("strain_id", input.strain_id.to_string()))
            .bind(("phase", input.phase.as_str()))
            .bind(("week_number", input.week_number))
            .bind(("ppfd_min", input.ppfd.min))
            .bind(("ppfd_max", input.ppfd.max))
            .bind(("photoperiod_min", input.photoperiod_hours.min))
            .bind(("photoperiod_max", input.photoperiod_hours.max))
            .bind(("temperature_min", input.temperature_c.min))
            .bind(("temperature_max", input.temperature_c.max))
            .bind(("humidity_min", input.humidity_pct.min))
            .bind(("humidity_max", input.humidity_pct.max))
            .bind(("ph_min", input.ph.min))
            .bind(("ph_max", input.ph.max))
            .bind(("ec_min", input.ec_ms_cm.min))
            .bind(("ec_max", input.ec_ms_cm.max))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('weekly_target', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TargetRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "weekly_target".into(),
            id: id_str,
        })?;

        Ok(row.try_into_target()?)
    }

    async fn get_for_week(
        &self,
        strain_ids: &[Uuid],
        phase: Phase,
        week: u32,
    ) -> CanopyResult<Vec<WeeklyTarget>> {
        if strain_ids.is_empty() {
            return Ok(Vec::new());
        }

        let id_strs: Vec<String> = strain_ids.iter().map(Uuid::to_string).collect();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM weekly_target \
                 WHERE strain_id IN $strain_ids \
                 AND phase = $phase \
                 AND week_number = $week",
            )
            .bind(("strain_ids", id_strs))
            .bind(("phase", phase.as_str()))
            .bind(("week", week))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TargetRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_target())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn list_by_strain(&self, strain_id: Uuid) -> CanopyResult<Vec<WeeklyTarget>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM weekly_target \
                 WHERE strain_id = $strain_id \
                 ORDER BY phase, week_number ASC",
            )
            .bind(("strain_id", strain_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<TargetRowWithId> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_target())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
