//! Per-phase alert margin model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::cycle::Phase;

/// Tolerance added around a weekly target before an alert fires.
/// One row per phase.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PhaseAlertMargin {
    pub phase: Phase,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub ppfd: f64,
    /// `None` means "do not alert on pH in this phase" (used for
    /// Drying). Distinct from an absent row, which falls back to the
    /// global default margins.
    pub ph: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertPhaseAlertMargin {
    pub phase: Phase,
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub ppfd: f64,
    pub ph: Option<f64>,
}

/// The resolved margin set handed to alert evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AlertMargins {
    pub temperature_c: f64,
    pub humidity_pct: f64,
    pub ppfd: f64,
    pub ph: Option<f64>,
}
