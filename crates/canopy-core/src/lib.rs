//! Canopy Core — domain models, repository traits, and the pure
//! phase-derivation logic for the cultivation lifecycle engine.
//!
//! This crate has no I/O: the database layer (`canopy-db`) implements the
//! repository traits defined here, and the engine (`canopy-engine`)
//! orchestrates them.

pub mod clock;
pub mod error;
pub mod models;
pub mod phase;
pub mod repository;

pub use clock::{Clock, SystemClock};
pub use error::{CanopyError, CanopyResult};
pub use phase::{PhasePosition, derive_phase};
