//! Plant relocation history — append-only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlantTentHistory {
    pub id: Uuid,
    pub plant_id: Uuid,
    pub from_tent_id: Uuid,
    pub to_tent_id: Uuid,
    pub moved_at: DateTime<Utc>,
    pub reason: String,
}
