//! Engine configuration.

use canopy_core::models::margin::AlertMargins;
use canopy_core::phase::{DEFAULT_FLORA_WEEKS, DEFAULT_VEGA_WEEKS};

/// Configuration for the lifecycle engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Vega phase cap in weeks when no strain resolves.
    pub default_vega_weeks: u32,
    /// Flora phase cap in weeks when no strain resolves.
    pub default_flora_weeks: u32,
    /// Margins applied when a phase has no stored margin row.
    pub default_margins: AlertMargins,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_vega_weeks: DEFAULT_VEGA_WEEKS,
            default_flora_weeks: DEFAULT_FLORA_WEEKS,
            default_margins: AlertMargins {
                temperature_c: 2.0,
                humidity_pct: 5.0,
                ppfd: 50.0,
                ph: Some(0.2),
            },
        }
    }
}
