//! Domain models for the cultivation tracker.
//!
//! These are the core types shared across all crates.

pub mod cycle;
pub mod history;
pub mod margin;
pub mod plant;
pub mod strain;
pub mod target;
pub mod tent;
