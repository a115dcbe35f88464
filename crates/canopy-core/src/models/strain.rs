//! Strain domain model — immutable genetics reference data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strain {
    pub id: Uuid,
    pub name: String,
    /// Default vegetative phase length in weeks.
    pub vega_weeks: u32,
    /// Default flowering phase length in weeks.
    pub flora_weeks: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStrain {
    pub name: String,
    pub vega_weeks: u32,
    pub flora_weeks: u32,
}
