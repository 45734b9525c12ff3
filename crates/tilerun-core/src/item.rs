//! Collectible items.
//!
//! Items come out of bumped tiles or are placed by the level. Block items
//! emerge for a few frames (frozen, not collectible) and then move according
//! to their kind.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tilegrid::{cell_origin, Aabb, ContainedItem, TILE_SIZE};

use crate::config::{ActorConfig, SimConfig};
use crate::entity::{Body, Facing};
use crate::kinematics;
use crate::power::{PowerTier, PowerUp};

/// Item variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// Grows a small player.
    Mushroom,
    /// Grants fire power.
    FireFlower,
    /// Grants star invulnerability.
    Star,
    /// Grants an extra life.
    OneUp,
    /// A free-standing coin.
    Coin,
}

impl ItemKind {
    /// Item released by a tile's contents for a bumper of `tier`.
    ///
    /// With progressive power-ups on, a mushroom upgrades to a fire flower
    /// when the bumper is already big.
    #[must_use]
    pub fn from_contained(contents: ContainedItem, tier: PowerTier, progressive: bool) -> Self {
        match contents {
            ContainedItem::Mushroom if progressive && tier >= PowerTier::Big => Self::FireFlower,
            ContainedItem::Mushroom => Self::Mushroom,
            ContainedItem::FireFlower => Self::FireFlower,
            ContainedItem::Star => Self::Star,
            ContainedItem::OneUp => Self::OneUp,
            ContainedItem::Coin => Self::Coin,
        }
    }

    /// Power-up this item applies, if any.
    #[must_use]
    pub const fn power_up(self) -> Option<PowerUp> {
        match self {
            Self::Mushroom => Some(PowerUp::Mushroom),
            Self::FireFlower => Some(PowerUp::FireFlower),
            Self::Star => Some(PowerUp::Star),
            Self::OneUp | Self::Coin => None,
        }
    }

    /// Whether the item walks along the ground.
    #[must_use]
    pub const fn walks(self) -> bool {
        matches!(self, Self::Mushroom | Self::OneUp | Self::Star)
    }

    /// Whether the item is affected by gravity.
    #[must_use]
    pub const fn falls(self) -> bool {
        !matches!(self, Self::Coin)
    }
}

/// Components for item entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemComponents {
    /// Shared actor state
    pub body: Body,
    /// Variant
    pub kind: ItemKind,
    /// Frames left rising out of a tile
    pub emerging: u32,
}

impl ItemComponents {
    /// An item emerging from the tile at `cell`, occupying the cell above it.
    #[must_use]
    pub fn emerge(kind: ItemKind, cell: IVec2, frames: u32) -> Self {
        let origin = cell_origin(cell - IVec2::Y);
        let mut item = Self::place(kind, Vec2::new(origin.x, origin.y + TILE_SIZE));
        item.emerging = frames;
        item
    }

    /// A free item standing with its bottom-left corner at `feet`.
    #[must_use]
    pub fn place(kind: ItemKind, feet: Vec2) -> Self {
        let mut body = Body::new(Aabb::new(feet.x, feet.y - TILE_SIZE, TILE_SIZE, TILE_SIZE));
        body.facing = Facing::Right;
        Self {
            body,
            kind,
            emerging: 0,
        }
    }

    /// Whether a player touching it picks it up.
    #[must_use]
    pub fn collectible(&self) -> bool {
        self.emerging == 0
    }
}

/// Advance the emerge timer.
pub fn tick(item: &mut ItemComponents) {
    item.emerging = item.emerging.saturating_sub(1);
}

/// Integrate velocity for the frame. Returns `None` while the item holds still.
#[must_use]
pub fn plan_motion(item: &ItemComponents, config: &SimConfig) -> Option<Body> {
    if item.emerging > 0 || !item.kind.falls() {
        return None;
    }
    let mut body = item.body.clone();
    if item.kind.walks() {
        body.velocity.x = body.facing.sign() * config.actors.item_speed;
    }
    kinematics::apply_gravity(&mut body, config.physics.gravity, config.physics.terminal_fall);
    Some(body)
}

/// React to the tile sweep: stars bounce on landing, walkers turn at walls.
pub fn settle(item: &mut ItemComponents, landed: bool, hit_wall: bool, actors: &ActorConfig) {
    if landed && item.kind == ItemKind::Star {
        item.body.velocity.y = -actors.star_bounce;
        item.body.on_ground = false;
    }
    if hit_wall && item.kind.walks() {
        item.body.facing = item.body.facing.flipped();
    }
}

/// Pop the item upward, as when the tile under it is bumped.
pub fn hop(item: &mut ItemComponents, actors: &ActorConfig) {
    if item.kind.falls() {
        item.body.velocity.y = -actors.item_hop;
        item.body.on_ground = false;
    }
}
