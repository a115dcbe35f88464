//! Canopy Engine — the cultivation lifecycle state machine and its
//! read-path resolvers.
//!
//! Generic over the `canopy-core` repository traits so that the engine
//! has no dependency on the database crate.

pub mod alerts;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod margins;
pub mod notify;
pub mod relocation;
pub mod targets;

pub use config::EngineConfig;
pub use error::LifecycleError;
pub use lifecycle::{
    CloningOutcome, CycleOverview, DryingOutcome, EditCycle, InitiateCycle, LifecycleService,
    PromoteDestination, PromoteOutcome,
};
pub use margins::MarginResolver;
pub use notify::{NoopSink, NotificationSink, TracingSink, TransitionEvent};
pub use relocation::RelocationService;
pub use targets::TargetResolver;
