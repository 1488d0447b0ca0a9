//! Shared test fixtures and utilities for strider crates.
//!
//! Provides mock terrain oracles and deterministic RNG setup. Leg layouts
//! and preset terrains live in [`strider_core::presets`].

pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use mocks::{CountingTerrain, VoidTerrain};
pub use rng::{jitter, seeded_rng};
