//! Test module for scenario, determinism and property tests.
//!
//! This module exercises the full step loop:
//! - **Integration tests**: movement, tiles, power, enemies, pipes end-to-end
//! - **Determinism tests**: identical inputs produce identical states
//! - **Property tests**: invariants under generated input sequences
//! - **Helper functions**: course builders and step utilities
//!
//! # Test Structure
//!
//! - `integration.rs`: scenario tests through `Simulation::step`
//! - `determinism.rs`: replay and hashing tests
//! - `properties.rs`: `proptest` invariants
//! - `helpers.rs`: test setup utilities

pub(crate) mod helpers;
mod integration;
