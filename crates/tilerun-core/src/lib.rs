//! # Tilerun Core
//!
//! Fixed-step simulation core for a tile-based 2D platformer.
//!
//! This crate advances players, enemies, items and projectiles through a level
//! built on [`tilegrid`] tiles, one frame at a time, and reports what happened
//! as a stream of [`output::GameEvent`]s. Rendering, audio and input devices
//! live outside; the host feeds button sets in and reads state and events out.
//!
//! ## Architecture
//!
//! - **Entities**: players, enemies, items, fireballs, particles
//! - **Step phases**: control, motion, tile collision, tile reaction, contact
//! - **Resolvers**: lifecycle, combat, power, event log
//!
//! Each [`simulation::Simulation::step`] runs the phases over a
//! double-buffered [`level_state::LevelState`]; see [`simulation`] for the
//! full loop.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tilerun_core::config::{Character, SimConfig};
//! use tilerun_core::input::Buttons;
//! use tilerun_core::level::LevelData;
//! use tilerun_core::simulation::Simulation;
//!
//! let config = SimConfig::load_or_default("tilerun.json");
//! let data = LevelData::load("levels/1-1.json")?;
//! let mut sim = Simulation::from_level_data(&data, config, &[Character::Mario])?;
//!
//! loop {
//!     sim.step(&[read_pad()]);
//!     for envelope in sim.take_events() {
//!         play_sound_for(envelope.event());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Re-export the tile substrate
pub use tilegrid;

// Core modules
pub mod animation;
pub mod collision;
pub mod config;
pub mod enemy;
pub mod entity;
pub mod error;
pub mod input;
pub mod item;
pub mod kinematics;
pub mod level;
pub mod level_state;
pub mod output;
pub mod pipe;
pub mod power;
pub mod projectile;
pub mod reaction;
pub mod resolver;
pub mod simulation;

#[cfg(test)]
mod tests;

pub use config::{Character, SimConfig};
pub use error::{ConfigError, LevelError};
pub use input::Buttons;
pub use level::LevelData;
pub use level_state::LevelOutcome;
pub use simulation::Simulation;
