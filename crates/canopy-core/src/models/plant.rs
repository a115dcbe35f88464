//! Plant domain model.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PlantStatus {
    Active,
    Archived,
}

impl PlantStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PlantStatus::Active => "Active",
            PlantStatus::Archived => "Archived",
        }
    }
}

impl FromStr for PlantStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Active" => Ok(PlantStatus::Active),
            "Archived" => Ok(PlantStatus::Archived),
            other => Err(format!("unknown plant status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plant {
    pub id: Uuid,
    pub strain_id: Uuid,
    /// Exclusive owner — a plant belongs to exactly one tent at a time.
    pub tent_id: Uuid,
    pub status: PlantStatus,
    /// Lineage relation only, not ownership: deleting the mother does
    /// not cascade to clones.
    pub mother_plant_id: Option<Uuid>,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlant {
    pub strain_id: Uuid,
    pub tent_id: Uuid,
    pub mother_plant_id: Option<Uuid>,
    pub label: Option<String>,
}

/// Batch relocation request. Duplicate plant ids collapse to one move.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocatePlants {
    pub plant_ids: Vec<Uuid>,
    pub from_tent_id: Uuid,
    pub to_tent_id: Uuid,
    pub reason: String,
}
