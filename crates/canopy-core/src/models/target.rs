//! Weekly environmental target model — per-strain reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::cycle::Phase;

/// An inclusive min/max pair for one environmental metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

/// Environmental bounds for one `(strain, phase, week)` slot.
/// Immutable reference data; the target resolver only aggregates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyTarget {
    pub id: Uuid,
    pub strain_id: Uuid,
    pub phase: Phase,
    pub week_number: u32,
    pub ppfd: Bounds,
    pub photoperiod_hours: Bounds,
    pub temperature_c: Bounds,
    pub humidity_pct: Bounds,
    pub ph: Bounds,
    pub ec_ms_cm: Bounds,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWeeklyTarget {
    pub strain_id: Uuid,
    pub phase: Phase,
    pub week_number: u32,
    pub ppfd: Bounds,
    pub photoperiod_hours: Bounds,
    pub temperature_c: Bounds,
    pub humidity_pct: Bounds,
    pub ph: Bounds,
    pub ec_ms_cm: Bounds,
}

/// Effective targets after averaging across strains. Produced by the
/// target resolver, never stored.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TargetBounds {
    pub ppfd: Bounds,
    pub photoperiod_hours: Bounds,
    pub temperature_c: Bounds,
    pub humidity_pct: Bounds,
    pub ph: Bounds,
    pub ec_ms_cm: Bounds,
}
