//! Entity storage types.
//!
//! - [`EntityId`]: unique, monotonically assigned identifier
//! - [`EntityTag`]: actor kind, used to pick the per-kind motion and contact rules
//! - [`EntityInner`]: type-safe storage for the kind's components
//! - [`Entity`]: the complete entity container
//!
//! # Architecture
//!
//! Every kind embeds a [`Body`], so the tile sweep and the contact pass can
//! treat all actors alike through [`Entity::body`] while behaviour code
//! matches on the concrete components.
//!
//! # Example
//!
//! ```
//! use glam::Vec2;
//! use tilerun_core::config::Character;
//! use tilerun_core::entity::{Entity, EntityId, EntityInner, EntityTag, PlayerComponents};
//!
//! let player = Entity::new(
//!     EntityId::new(42),
//!     EntityInner::Player(PlayerComponents::spawn(0, Character::Mario, Vec2::new(0.0, 64.0), 3)),
//! );
//!
//! assert_eq!(player.id().as_u64(), 42);
//! assert_eq!(player.tag(), EntityTag::Player);
//! assert_eq!(player.body().bounds.bottom(), 64.0);
//! ```

pub mod components;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::enemy::EnemyComponents;
pub use crate::item::ItemComponents;
pub use crate::projectile::{ParticleComponents, ProjectileComponents};
pub use components::{Body, BodyTimers, Facing, MotionState, PlayerComponents};

/// Unique identifier for an entity.
///
/// Identifiers are assigned in spawn order and never reused within a level,
/// so ordering by id is ordering by spawn time. Every per-entity pass walks
/// entities in this order.
///
/// # Example
///
/// ```
/// use tilerun_core::entity::EntityId;
///
/// let id1 = EntityId::new(1);
/// let id2 = EntityId::new(2);
///
/// assert!(id1 < id2);
/// assert_eq!(id1.as_u64(), 1);
/// ```
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new `EntityId` from a raw `u64` value.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` value of this identifier.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.0)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EntityId {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl From<EntityId> for u64 {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

/// Actor kind.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityTag {
    /// Player-controlled character
    Player,
    /// Goomba, Koopa Troopa, Spiny
    Enemy,
    /// Power-up, 1-up or coin
    Item,
    /// Fireball
    Projectile,
    /// Cosmetic debris or coin pop
    Particle,
}

impl fmt::Display for EntityTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player => write!(f, "Player"),
            Self::Enemy => write!(f, "Enemy"),
            Self::Item => write!(f, "Item"),
            Self::Projectile => write!(f, "Projectile"),
            Self::Particle => write!(f, "Particle"),
        }
    }
}

/// Type-safe storage for entity-specific components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntityInner {
    /// Player components
    Player(PlayerComponents),
    /// Enemy components
    Enemy(EnemyComponents),
    /// Item components
    Item(ItemComponents),
    /// Fireball components
    Projectile(ProjectileComponents),
    /// Particle components
    Particle(ParticleComponents),
}

impl EntityInner {
    /// Returns the corresponding `EntityTag` for this inner storage.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        match self {
            Self::Player(_) => EntityTag::Player,
            Self::Enemy(_) => EntityTag::Enemy,
            Self::Item(_) => EntityTag::Item,
            Self::Projectile(_) => EntityTag::Projectile,
            Self::Particle(_) => EntityTag::Particle,
        }
    }

    /// Shared actor state.
    #[must_use]
    pub const fn body(&self) -> &Body {
        match self {
            Self::Player(c) => &c.body,
            Self::Enemy(c) => &c.body,
            Self::Item(c) => &c.body,
            Self::Projectile(c) => &c.body,
            Self::Particle(c) => &c.body,
        }
    }

    /// Mutable shared actor state.
    #[must_use]
    pub fn body_mut(&mut self) -> &mut Body {
        match self {
            Self::Player(c) => &mut c.body,
            Self::Enemy(c) => &mut c.body,
            Self::Item(c) => &mut c.body,
            Self::Projectile(c) => &mut c.body,
            Self::Particle(c) => &mut c.body,
        }
    }
}

/// A complete entity.
///
/// # Invariants
///
/// - The `EntityId` is unique within a level
/// - The tag always matches the `EntityInner` variant
/// - `removed` is monotonic; removed entities are compacted after the step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    id: EntityId,
    tag: EntityTag,
    inner: EntityInner,
    removed: bool,
}

impl Entity {
    /// Creates a new entity. The tag is derived from `inner`.
    #[must_use]
    pub fn new(id: EntityId, inner: EntityInner) -> Self {
        Self {
            id,
            tag: inner.tag(),
            inner,
            removed: false,
        }
    }

    /// Returns the entity's unique identifier.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the entity's kind.
    #[must_use]
    pub const fn tag(&self) -> EntityTag {
        self.tag
    }

    /// Returns a reference to the entity's inner component storage.
    #[must_use]
    pub const fn inner(&self) -> &EntityInner {
        &self.inner
    }

    /// Returns a mutable reference to the entity's inner component storage.
    #[must_use]
    pub fn inner_mut(&mut self) -> &mut EntityInner {
        &mut self.inner
    }

    /// Shared actor state.
    #[must_use]
    pub const fn body(&self) -> &Body {
        self.inner.body()
    }

    /// Mutable shared actor state.
    #[must_use]
    pub fn body_mut(&mut self) -> &mut Body {
        self.inner.body_mut()
    }

    /// Whether the entity is waiting to be compacted away.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.removed
    }

    /// Flag the entity for removal at the end of the step.
    pub fn mark_removed(&mut self) {
        self.removed = true;
    }

    /// Returns `true` if this entity is a player.
    #[must_use]
    pub const fn is_player(&self) -> bool {
        matches!(self.tag, EntityTag::Player)
    }

    /// Returns `true` if this entity is an enemy.
    #[must_use]
    pub const fn is_enemy(&self) -> bool {
        matches!(self.tag, EntityTag::Enemy)
    }

    /// Returns the player components if this is a player, `None` otherwise.
    #[must_use]
    pub const fn as_player(&self) -> Option<&PlayerComponents> {
        match &self.inner {
            EntityInner::Player(c) => Some(c),
            _ => None,
        }
    }

    /// Returns mutable player components if this is a player, `None` otherwise.
    #[must_use]
    pub fn as_player_mut(&mut self) -> Option<&mut PlayerComponents> {
        match &mut self.inner {
            EntityInner::Player(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the enemy components if this is an enemy, `None` otherwise.
    #[must_use]
    pub const fn as_enemy(&self) -> Option<&EnemyComponents> {
        match &self.inner {
            EntityInner::Enemy(c) => Some(c),
            _ => None,
        }
    }

    /// Returns mutable enemy components if this is an enemy, `None` otherwise.
    #[must_use]
    pub fn as_enemy_mut(&mut self) -> Option<&mut EnemyComponents> {
        match &mut self.inner {
            EntityInner::Enemy(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the item components if this is an item, `None` otherwise.
    #[must_use]
    pub const fn as_item(&self) -> Option<&ItemComponents> {
        match &self.inner {
            EntityInner::Item(c) => Some(c),
            _ => None,
        }
    }

    /// Returns mutable item components if this is an item, `None` otherwise.
    #[must_use]
    pub fn as_item_mut(&mut self) -> Option<&mut ItemComponents> {
        match &mut self.inner {
            EntityInner::Item(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the fireball components if this is a projectile, `None` otherwise.
    #[must_use]
    pub const fn as_projectile(&self) -> Option<&ProjectileComponents> {
        match &self.inner {
            EntityInner::Projectile(c) => Some(c),
            _ => None,
        }
    }

    /// Returns mutable fireball components if this is a projectile, `None` otherwise.
    #[must_use]
    pub fn as_projectile_mut(&mut self) -> Option<&mut ProjectileComponents> {
        match &mut self.inner {
            EntityInner::Projectile(c) => Some(c),
            _ => None,
        }
    }

    /// Returns the particle components if this is a particle, `None` otherwise.
    #[must_use]
    pub const fn as_particle(&self) -> Option<&ParticleComponents> {
        match &self.inner {
            EntityInner::Particle(c) => Some(c),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ActorConfig, Character};
    use crate::enemy::EnemyKind;
    use glam::Vec2;

    fn player(id: u64) -> Entity {
        Entity::new(
            EntityId::new(id),
            EntityInner::Player(PlayerComponents::spawn(0, Character::Mario, Vec2::new(0.0, 32.0), 3)),
        )
    }

    mod entity_id_tests {
        use super::*;

        #[test]
        fn ordering() {
            let mut ids = vec![EntityId::new(3), EntityId::new(1), EntityId::new(2)];
            ids.sort();
            assert_eq!(ids, vec![EntityId::new(1), EntityId::new(2), EntityId::new(3)]);
        }

        #[test]
        fn debug_format() {
            assert_eq!(format!("{:?}", EntityId::new(42)), "EntityId(42)");
        }

        #[test]
        fn display_format() {
            assert_eq!(format!("{}", EntityId::new(42)), "42");
        }

        #[test]
        fn u64_conversions() {
            let id: EntityId = 42u64.into();
            let raw: u64 = id.into();
            assert_eq!(raw, 42);
        }
    }

    mod entity_tests {
        use super::*;

        #[test]
        fn tag_follows_inner() {
            let enemy = Entity::new(
                EntityId::new(2),
                EntityInner::Enemy(EnemyComponents::patrolling(
                    EnemyKind::Goomba,
                    Vec2::ZERO,
                    &ActorConfig::default(),
                )),
            );
            assert_eq!(enemy.tag(), EntityTag::Enemy);
            assert!(enemy.is_enemy());
            assert!(enemy.as_player().is_none());
            assert!(enemy.as_enemy().is_some());
        }

        #[test]
        fn body_is_shared_across_kinds() {
            let mut entity = player(1);
            entity.body_mut().velocity.x = 2.0;
            assert_eq!(entity.as_player().unwrap().body.velocity.x, 2.0);
        }

        #[test]
        fn removal_flag() {
            let mut entity = player(1);
            assert!(!entity.is_removed());
            entity.mark_removed();
            assert!(entity.is_removed());
        }

        #[test]
        fn serialization_roundtrip() {
            let entity = player(42);
            let json = serde_json::to_string(&entity).unwrap();
            let back: Entity = serde_json::from_str(&json).unwrap();
            assert_eq!(entity, back);
        }
    }
}
