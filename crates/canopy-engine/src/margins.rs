//! Margin resolver — per-phase alert tolerances with a global fallback.

use canopy_core::error::CanopyResult;
use canopy_core::models::cycle::Phase;
use canopy_core::models::margin::AlertMargins;
use canopy_core::repository::AlertMarginRepository;

/// Resolves the alert margins for a phase.
///
/// A stored row wins over the defaults even when its pH margin is
/// `None` — that null is a meaningful "do not alert on pH" and must
/// not fall back to the default pH tolerance.
pub struct MarginResolver<M: AlertMarginRepository> {
    margin_repo: M,
    defaults: AlertMargins,
}

impl<M: AlertMarginRepository> MarginResolver<M> {
    pub fn new(margin_repo: M, defaults: AlertMargins) -> Self {
        Self {
            margin_repo,
            defaults,
        }
    }

    pub async fn resolve(&self, phase: Phase) -> CanopyResult<AlertMargins> {
        match self.margin_repo.get_by_phase(phase).await? {
            Some(row) => Ok(AlertMargins {
                temperature_c: row.temperature_c,
                humidity_pct: row.humidity_pct,
                ppfd: row.ppfd,
                ph: row.ph,
            }),
            None => Ok(self.defaults),
        }
    }
}
