//! Shared test fixtures and utilities for the podracer crates.
//!
//! Provides a deterministic in-memory [`ScriptedWorld`] implementing
//! `CollisionWorld`, small track and cable fixtures, and seeded RNG setup.

pub mod fixtures;
pub mod rng;
pub mod scripted;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use fixtures::{cable_strip, flat_plate, lap_gate, test_track};
pub use rng::seeded_rng;
pub use scripted::ScriptedWorld;
