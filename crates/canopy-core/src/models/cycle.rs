//! Cycle domain model — one cultivation run occupying a tent.
//!
//! A cycle's phase is never stored. The set of non-null phase-start
//! dates, combined with "now", determines the current phase and week
//! (see [`crate::phase::derive_phase`]).

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cultivation stage, derived from reference dates on read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Phase {
    Cloning,
    Maintenance,
    Vega,
    Flora,
    Drying,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Cloning => "Cloning",
            Phase::Maintenance => "Maintenance",
            Phase::Vega => "Vega",
            Phase::Flora => "Flora",
            Phase::Drying => "Drying",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cloning" => Ok(Phase::Cloning),
            "Maintenance" => Ok(Phase::Maintenance),
            "Vega" => Ok(Phase::Vega),
            "Flora" => Ok(Phase::Flora),
            "Drying" => Ok(Phase::Drying),
            other => Err(format!("unknown phase: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CycleStatus {
    Active,
    Finished,
}

impl CycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CycleStatus::Active => "Active",
            CycleStatus::Finished => "Finished",
        }
    }
}

impl FromStr for CycleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(CycleStatus::Active),
            "Finished" => Ok(CycleStatus::Finished),
            other => Err(format!("unknown cycle status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    pub tent_id: Uuid,
    /// `None` means targets resolve from the strains of the tent's
    /// active plants.
    pub strain_id: Option<Uuid>,
    pub status: CycleStatus,
    pub start_date: DateTime<Utc>,
    pub cloning_start_date: Option<DateTime<Utc>>,
    pub flora_start_date: Option<DateTime<Utc>>,
    pub drying_start_date: Option<DateTime<Utc>>,
    /// Set when a cloning episode completes; preserved until overwritten.
    pub clones_produced: Option<u32>,
    /// Lineage source for clones created during this cycle.
    pub mother_plant_id: Option<Uuid>,
    pub harvest_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCycle {
    pub tent_id: Uuid,
    pub strain_id: Option<Uuid>,
    pub start_date: DateTime<Utc>,
    pub cloning_start_date: Option<DateTime<Utc>>,
    pub flora_start_date: Option<DateTime<Utc>>,
    pub drying_start_date: Option<DateTime<Utc>>,
    pub mother_plant_id: Option<Uuid>,
}

/// Patch struct for cycle updates.
///
/// `Some(Some(val))` = set, `Some(None)` = clear, `None` = no change.
/// `clones_produced` has no clear form: it is only ever overwritten when
/// supplied, never silently zeroed.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateCycle {
    pub start_date: Option<DateTime<Utc>>,
    pub cloning_start_date: Option<Option<DateTime<Utc>>>,
    pub flora_start_date: Option<Option<DateTime<Utc>>>,
    pub drying_start_date: Option<Option<DateTime<Utc>>>,
    pub strain_id: Option<Option<Uuid>>,
    pub mother_plant_id: Option<Option<Uuid>>,
    pub clones_produced: Option<u32>,
    pub harvest_notes: Option<Option<String>>,
}
