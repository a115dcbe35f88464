//! Phase derivation — a pure function of reference dates and "now".
//!
//! The latest-started phase wins: Drying over Flora over Cloning over
//! the default phase. The default phase is decided by the tent's
//! category: `Maintenance` tents sit in `Maintenance`, every other
//! category grows in `Vega`.

use chrono::{DateTime, Utc};

use crate::models::cycle::{Cycle, Phase};
use crate::models::tent::TentCategory;

/// Hard week ceilings for the short phases.
pub const CLONING_MAX_WEEKS: u32 = 2;
pub const DRYING_MAX_WEEKS: u32 = 2;
/// Fallback phase lengths when no strain resolves.
pub const DEFAULT_VEGA_WEEKS: u32 = 6;
pub const DEFAULT_FLORA_WEEKS: u32 = 8;

/// Strain-dependent context needed to cap week numbers and pick the
/// default phase.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext {
    pub tent_category: TentCategory,
    /// Resolved strain vega length, if any strain applies.
    pub vega_weeks: Option<u32>,
    /// Resolved strain flora length, if any strain applies.
    pub flora_weeks: Option<u32>,
}

/// Derived position of a cycle in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhasePosition {
    pub phase: Phase,
    pub week: u32,
}

/// 1-based week number since `start`, capped at `max_weeks`.
fn week_number(start: DateTime<Utc>, now: DateTime<Utc>, max_weeks: u32) -> u32 {
    let days = (now - start).num_days();
    if days < 0 {
        return 1;
    }
    let week = days as u32 / 7 + 1;
    week.min(max_weeks.max(1))
}

fn default_phase(category: TentCategory) -> Phase {
    match category {
        TentCategory::Maintenance => Phase::Maintenance,
        _ => Phase::Vega,
    }
}

/// Compute the cycle's current phase and week. Side-effect free and
/// deterministic: identical inputs always yield identical output.
pub fn derive_phase(cycle: &Cycle, ctx: &PhaseContext, now: DateTime<Utc>) -> PhasePosition {
    // Clock skew or a future-dated cycle: week 1 of the earliest
    // defined phase.
    if now < cycle.start_date {
        let phase = if cycle.cloning_start_date.is_some() {
            Phase::Cloning
        } else {
            default_phase(ctx.tent_category)
        };
        return PhasePosition { phase, week: 1 };
    }

    if let Some(drying) = cycle.drying_start_date
        && now >= drying
    {
        return PhasePosition {
            phase: Phase::Drying,
            week: week_number(drying, now, DRYING_MAX_WEEKS),
        };
    }

    if let Some(flora) = cycle.flora_start_date
        && now >= flora
    {
        let cap = ctx.flora_weeks.unwrap_or(DEFAULT_FLORA_WEEKS);
        return PhasePosition {
            phase: Phase::Flora,
            week: week_number(flora, now, cap),
        };
    }

    if let Some(cloning) = cycle.cloning_start_date
        && now >= cloning
    {
        return PhasePosition {
            phase: Phase::Cloning,
            week: week_number(cloning, now, CLONING_MAX_WEEKS),
        };
    }

    let cap = ctx.vega_weeks.unwrap_or(DEFAULT_VEGA_WEEKS);
    PhasePosition {
        phase: default_phase(ctx.tent_category),
        week: week_number(cycle.start_date, now, cap),
    }
}

/// The reference date that makes [`derive_phase`] report `week` for a
/// phase started on it: `anchor − (week − 1) × 7 days`.
pub fn back_date(anchor: DateTime<Utc>, week: u32) -> DateTime<Utc> {
    anchor - chrono::Duration::weeks(i64::from(week.saturating_sub(1)))
}
