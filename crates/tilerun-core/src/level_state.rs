//! Mutable state of a running level.
//!
//! `LevelState` owns every actor of the level:
//! - Entity storage with deterministic iteration order (`BTreeMap`)
//! - Monotonic id assignment; ids are never reused within a level
//! - Mark-and-compact removal: passes flag entities with
//!   [`Entity::mark_removed`] and [`LevelState::compact`] drops them once the
//!   step is over, so no pass ever mutates the map it is iterating
//!
//! The static tile set and pipe network are not part of this state; they are
//! owned by [`crate::simulation::Simulation`] next to it.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use tilerun_core::config::ActorConfig;
//! use tilerun_core::enemy::{EnemyComponents, EnemyKind};
//! use tilerun_core::entity::EntityInner;
//! use tilerun_core::level_state::{LevelInfo, LevelState};
//!
//! let mut level = LevelState::new(LevelInfo::default());
//! let goomba = EnemyComponents::patrolling(EnemyKind::Goomba, Vec2::new(32.0, 64.0), &ActorConfig::default());
//! let id = level.spawn(EntityInner::Enemy(goomba));
//!
//! level.get_mut(id).unwrap().mark_removed();
//! assert_eq!(level.len(), 1);
//! level.compact();
//! assert!(level.is_empty());
//! ```

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityId, EntityInner, EntityTag, PlayerComponents};

/// How the level is going.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LevelOutcome {
    /// Still running.
    #[default]
    Playing,
    /// A player crossed the goal line.
    Cleared,
    /// Every player died and someone has lives left.
    Retry,
    /// Every player died with no lives left.
    GameOver,
}

/// Static facts about the level, in world units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelInfo {
    /// Course name, used in diagnostics
    pub name: String,
    /// Width in world units
    pub width: f32,
    /// Height in world units
    pub height: f32,
    /// Underwater course
    pub underwater: bool,
    /// Where players stand at the start (bottom-left of the hitbox)
    pub spawn: Vec2,
    /// X coordinate of the goal line
    pub goal_x: Option<f32>,
}

impl Default for LevelInfo {
    fn default() -> Self {
        Self {
            name: String::from("untitled"),
            width: 320.0,
            height: 240.0,
            underwater: false,
            spawn: Vec2::new(16.0, 208.0),
            goal_x: None,
        }
    }
}

/// All actors of a level plus the step counter and outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    next_id: u64,
    entities: BTreeMap<EntityId, Entity>,
    tick: u64,
    info: LevelInfo,
    outcome: LevelOutcome,
}

impl LevelState {
    /// Empty level.
    #[must_use]
    pub fn new(info: LevelInfo) -> Self {
        Self {
            next_id: 0,
            entities: BTreeMap::new(),
            tick: 0,
            info,
            outcome: LevelOutcome::Playing,
        }
    }

    // =========================================================================
    // Entity lifecycle
    // =========================================================================

    /// Add an entity and return its id.
    pub fn spawn(&mut self, inner: EntityInner) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id += 1;
        self.entities.insert(id, Entity::new(id, inner));
        id
    }

    /// Flag an entity for removal. Returns `false` for unknown ids.
    pub fn mark_removed(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) => {
                entity.mark_removed();
                true
            }
            None => false,
        }
    }

    /// Drop every entity flagged for removal. Returns how many were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.entities.len();
        self.entities.retain(|_, entity| !entity.is_removed());
        before - self.entities.len()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Entity by id.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Mutable entity by id.
    #[must_use]
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Entities in id order, removed ones included.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Live entities in id order.
    pub fn live(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values().filter(|e| !e.is_removed())
    }

    /// Ids in order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.keys().copied().collect()
    }

    /// Live entities of one kind, in id order.
    pub fn live_of(&self, tag: EntityTag) -> impl Iterator<Item = &Entity> {
        self.live().filter(move |e| e.tag() == tag)
    }

    /// Players with their ids, in id order.
    pub fn players(&self) -> impl Iterator<Item = (EntityId, &PlayerComponents)> {
        self.entities
            .values()
            .filter_map(|e| e.as_player().map(|p| (e.id(), p)))
    }

    /// Number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether no entities are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live fireballs thrown by `owner`.
    #[must_use]
    pub fn fireballs_of(&self, owner: EntityId) -> usize {
        self.live()
            .filter_map(Entity::as_projectile)
            .filter(|p| p.owner == owner)
            .count()
    }

    // =========================================================================
    // Level facts
    // =========================================================================

    /// Static level facts.
    #[must_use]
    pub fn info(&self) -> &LevelInfo {
        &self.info
    }

    /// Steps completed.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Advance the step counter.
    pub fn advance_tick(&mut self) {
        self.tick += 1;
    }

    /// Current outcome.
    #[must_use]
    pub fn outcome(&self) -> LevelOutcome {
        self.outcome
    }

    /// Set the outcome.
    pub fn set_outcome(&mut self, outcome: LevelOutcome) {
        self.outcome = outcome;
    }
}
