//! SurrealDB implementation of [`AlertMarginRepository`].
//!
//! The phase itself is the record id, so "one row per phase" holds by
//! construction and upserts need no separate uniqueness handling.

use canopy_core::error::CanopyResult;
use canopy_core::models::cycle::Phase;
use canopy_core::models::margin::{PhaseAlertMargin, UpsertPhaseAlertMargin};
use canopy_core::repository::AlertMarginRepository;
use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;
use crate::repository::parse_enum;

#[derive(Debug, SurrealValue)]
struct MarginRow {
    phase: String,
    temperature_c: f64,
    humidity_pct: f64,
    ppfd: f64,
    ph: Option<f64>,
    updated_at: DateTime<Utc>,
}

impl MarginRow {
    fn try_into_margin(self) -> Result<PhaseAlertMargin, DbError> {
        Ok(PhaseAlertMargin {
            phase: parse_enum(&self.phase, "phase")?,
            temperature_c: self.temperature_c,
            humidity_pct: self.humidity_pct,
            ppfd: self.ppfd,
            ph: self.ph,
            updated_at: self.updated_at,
        })
    }
}

/// SurrealDB implementation of the PhaseAlertMargin repository.
#[derive(Clone)]
pub struct SurrealAlertMarginRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAlertMarginRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AlertMarginRepository for SurrealAlertMarginRepository<C> {
    async fn upsert(&self, input: UpsertPhaseAlertMargin) -> CanopyResult<PhaseAlertMargin> {
        let phase = input.phase;

        let result = self
            .db
            .query(
                "UPSERT type::record('phase_alert_margin', $phase) SET \
                 phase = $phase, \
                 temperature_c = $temperature_c, \
                 humidity_pct = $humidity_pct, \
                 ppfd = $ppfd, \
                 ph = $ph, \
                 updated_at = time::now()",
            )
            .bind(("phase", phase.as_str()))
            .bind(("temperature_c", input.temperature_c))
            .bind(("humidity_pct", input.humidity_pct))
            .bind(("ppfd", input.ppfd))
            .bind(("ph", input.ph))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Constraint(e.to_string()))?;

        let rows: Vec<MarginRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "phase_alert_margin".into(),
            id: phase.as_str().into(),
        })?;

        Ok(row.try_into_margin()?)
    }

    async fn get_by_phase(&self, phase: Phase) -> CanopyResult<Option<PhaseAlertMargin>> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('phase_alert_margin', $phase)")
            .bind(("phase", phase.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MarginRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .next()
            .map(|row| row.try_into_margin())
            .transpose()?)
    }

    async fn list(&self) -> CanopyResult<Vec<PhaseAlertMargin>> {
        let mut result = self
            .db
            .query("SELECT * FROM phase_alert_margin ORDER BY phase ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<MarginRow> = result.take(0).map_err(DbError::from)?;

        Ok(rows
            .into_iter()
            .map(|row| row.try_into_margin())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}
