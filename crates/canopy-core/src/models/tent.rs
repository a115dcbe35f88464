//! Tent domain model — a physical grow space, the unit of occupancy.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Advisory category — describes what a tent is usually used for, but
/// does not constrain which cycle phases may occupy it. The category
/// does decide the default derived phase for a cycle with no explicit
/// phase date set: `Maintenance` tents derive `Maintenance`, all others
/// derive `Vega`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TentCategory {
    Maintenance,
    Vega,
    Flora,
    Drying,
}

impl TentCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TentCategory::Maintenance => "Maintenance",
            TentCategory::Vega => "Vega",
            TentCategory::Flora => "Flora",
            TentCategory::Drying => "Drying",
        }
    }
}

impl FromStr for TentCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Maintenance" => Ok(TentCategory::Maintenance),
            "Vega" => Ok(TentCategory::Vega),
            "Flora" => Ok(TentCategory::Flora),
            "Drying" => Ok(TentCategory::Drying),
            other => Err(format!("unknown tent category: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tent {
    pub id: Uuid,
    pub name: String,
    pub category: TentCategory,
    pub width_cm: f64,
    pub depth_cm: f64,
    pub height_cm: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tent {
    /// Interior volume in liters, derived from the stored dimensions.
    pub fn volume_liters(&self) -> f64 {
        self.width_cm * self.depth_cm * self.height_cm / 1000.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTent {
    pub name: String,
    pub category: TentCategory,
    pub width_cm: f64,
    pub depth_cm: f64,
    pub height_cm: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UpdateTent {
    pub name: Option<String>,
    pub category: Option<TentCategory>,
    pub width_cm: Option<f64>,
    pub depth_cm: Option<f64>,
    pub height_cm: Option<f64>,
}
