//! Notification sink — informed of committed transitions, never
//! consulted by them.
//!
//! Events are emitted after the database transaction commits and are
//! fire-and-forget: a sink cannot fail a transition.

use canopy_core::models::cycle::Phase;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

/// A committed lifecycle transition.
#[derive(Debug, Clone)]
pub enum TransitionEvent {
    CycleInitiated {
        cycle_id: Uuid,
        tent_id: Uuid,
        phase: Phase,
        week: u32,
    },
    CloningStarted {
        cycle_id: Uuid,
        date: DateTime<Utc>,
    },
    ReturnedToMaintenance {
        cycle_id: Uuid,
        clones_produced: Option<u32>,
    },
    CloningFinished {
        source_cycle_id: Uuid,
        new_cycle_id: Uuid,
        target_tent_id: Uuid,
        seedlings: u32,
    },
    FloraStarted {
        cycle_id: Uuid,
        tent_id: Uuid,
        relocated_plants: u64,
    },
    PhasePromoted {
        cycle_id: Uuid,
        new_cycle_id: Option<Uuid>,
        phase: Phase,
    },
    DryingStarted {
        cycle_id: Uuid,
        new_cycle_id: Option<Uuid>,
        archived_plants: u64,
    },
    CycleEdited {
        cycle_id: Uuid,
        phase: Phase,
        week: u32,
    },
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: TransitionEvent);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn notify(&self, _event: TransitionEvent) {}
}

/// Sink that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, event: TransitionEvent) {
        info!(?event, "lifecycle transition committed");
    }
}
