//! Tiles and their bump reaction state machine.
//!
//! A tile is immutable geometry except for three things: the bounce
//! displacement after being struck from below, the contents it still holds,
//! and the monotonic `broken` flag.
//!
//! ```text
//! Idle ──bump──> Bouncing ──apex──> (payload released) ──> Settled
//!   │                                                        │
//!   └──bump (breakable, strong)──> Broken        <──bump─────┘
//! ```

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};

use crate::{Aabb, Edges};

/// Initial upward speed of a bumped tile.
pub const BOUNCE_IMPULSE: f32 = 2.0;

/// Downward acceleration pulling a bumped tile back to rest.
pub const BOUNCE_GRAVITY: f32 = 0.5;

/// Unique identifier for a tile.
///
/// Ids are handed out in declaration order, so comparing ids compares
/// declaration position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileId(pub u32);

impl TileId {
    /// Raw index into the owning [`TileSet`](crate::TileSet).
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a tile is built from. Decides the default edges and reactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileMaterial {
    /// Terrain. Solid, inert.
    Ground,
    /// Breakable brick.
    Brick,
    /// Question block. Bonkable, spawns its contents with a rise animation.
    Question,
    /// Hard block. Solid, inert.
    Hard,
    /// One-way platform: only the top edge collides.
    Platform,
    /// Invisible block that only collides from below until revealed.
    Hidden,
}

impl TileMaterial {
    /// Default collidable edges for the material.
    #[must_use]
    pub fn edges(self) -> Edges {
        match self {
            TileMaterial::Platform => Edges::TOP,
            TileMaterial::Hidden => Edges::BOTTOM,
            _ => Edges::SOLID,
        }
    }
}

/// Item held inside a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContainedItem {
    /// Grows a small player.
    Mushroom,
    /// Grants fire power.
    FireFlower,
    /// Temporary invulnerability.
    Star,
    /// Extra life.
    OneUp,
    /// Pops a coin on every bump while coins remain.
    Coin,
}

/// Bounce/break reaction state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TileReaction {
    /// At rest, never bumped.
    Idle,
    /// Parabolic displacement after a bump.
    Bouncing {
        /// Vertical display offset (negative is up)
        offset: f32,
        /// Offset velocity
        velocity: f32,
        /// Frames since the bump
        frame: u32,
        /// Item to release at the apex
        payload: Option<ContainedItem>,
        /// Whether the apex signal has been emitted
        apex_reached: bool,
    },
    /// Bounce finished; back at rest.
    Settled,
    /// Shattered. Terminal.
    Broken,
}

/// Result of striking a tile from below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BumpOutcome {
    /// Solid but unreactive (ground, hard block, spent block, mid-bounce).
    Inert,
    /// The tile started bouncing.
    Bounced {
        /// A coin popped out immediately
        coin: bool,
        /// Item that will be released at the apex
        payload: Option<ContainedItem>,
    },
    /// The tile broke apart.
    Shattered,
}

/// Signal emitted while a bounce advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BounceSignal {
    /// The bounce reached its highest point.
    Apex {
        /// Item to spawn on top of the tile, if any
        payload: Option<ContainedItem>,
    },
    /// The tile came back to rest.
    Settled,
}

/// A static grid cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tile {
    cell: IVec2,
    material: TileMaterial,
    edges: Edges,
    bonkable: bool,
    breakable: bool,
    contents: Option<ContainedItem>,
    coins_left: u32,
    spawn_animation: bool,
    broken: bool,
    hit: bool,
    reaction: TileReaction,
}

impl Tile {
    /// Create a tile with the defaults of its material.
    #[must_use]
    pub fn new(cell: IVec2, material: TileMaterial) -> Self {
        let (bonkable, breakable, contents, coins_left) = match material {
            TileMaterial::Brick => (true, true, None, 0),
            TileMaterial::Question | TileMaterial::Hidden => (true, false, Some(ContainedItem::Coin), 1),
            _ => (false, false, None, 0),
        };
        Self {
            cell,
            material,
            edges: material.edges(),
            bonkable,
            breakable,
            contents,
            coins_left,
            spawn_animation: matches!(material, TileMaterial::Question | TileMaterial::Hidden),
            broken: false,
            hit: false,
            reaction: TileReaction::Idle,
        }
    }

    /// Fully solid, inert terrain.
    #[must_use]
    pub fn solid(cell: IVec2) -> Self {
        Self::new(cell, TileMaterial::Ground)
    }

    /// Replace the contents. A brick holding something is no longer breakable.
    #[must_use]
    pub fn with_contents(mut self, item: ContainedItem) -> Self {
        self.contents = Some(item);
        self.bonkable = true;
        self.coins_left = u32::from(item == ContainedItem::Coin);
        if self.material == TileMaterial::Brick {
            self.breakable = false;
        }
        self
    }

    /// Turn the tile into a multi-coin block paying out `coins` times.
    #[must_use]
    pub fn with_coins(mut self, coins: u32) -> Self {
        self.contents = Some(ContainedItem::Coin);
        self.coins_left = coins.max(1);
        self.bonkable = true;
        self.breakable = false;
        self
    }

    /// Override the collidable edges.
    #[must_use]
    pub fn with_edges(mut self, edges: Edges) -> Self {
        self.edges = edges;
        self
    }

    /// Grid cell.
    #[must_use]
    pub fn cell(&self) -> IVec2 {
        self.cell
    }

    /// Construction material.
    #[must_use]
    pub fn material(&self) -> TileMaterial {
        self.material
    }

    /// Edges that currently block motion. Empty once broken.
    #[must_use]
    pub fn edges(&self) -> Edges {
        self.edges
    }

    /// Whether the tile still reacts to bumps.
    #[must_use]
    pub fn bonkable(&self) -> bool {
        self.bonkable
    }

    /// Whether a strong bump shatters the tile.
    #[must_use]
    pub fn breakable(&self) -> bool {
        self.breakable
    }

    /// Remaining contents.
    #[must_use]
    pub fn contents(&self) -> Option<ContainedItem> {
        self.contents
    }

    /// Coins still inside a coin block.
    #[must_use]
    pub fn coins_left(&self) -> u32 {
        self.coins_left
    }

    /// Whether released items play the rise-out-of-block animation.
    #[must_use]
    pub fn spawn_animation(&self) -> bool {
        self.spawn_animation
    }

    /// Whether the tile has shattered.
    #[must_use]
    pub fn is_broken(&self) -> bool {
        self.broken
    }

    /// Whether the tile's contents are spent.
    #[must_use]
    pub fn is_hit(&self) -> bool {
        self.hit
    }

    /// Current reaction state.
    #[must_use]
    pub fn reaction(&self) -> TileReaction {
        self.reaction
    }

    /// Whether the tile is mid-bounce.
    #[must_use]
    pub fn is_bouncing(&self) -> bool {
        matches!(self.reaction, TileReaction::Bouncing { .. })
    }

    /// Collision box. Bounce displacement is visual only.
    #[must_use]
    pub fn bounds(&self) -> Aabb {
        Aabb::cell(self.cell)
    }

    /// Render offset from the bounce.
    #[must_use]
    pub fn display_offset(&self) -> Vec2 {
        match self.reaction {
            TileReaction::Bouncing { offset, .. } => Vec2::new(0.0, offset),
            _ => Vec2::ZERO,
        }
    }

    /// Strike the tile from below. `strong` is true for big or fire players.
    pub fn bump(&mut self, strong: bool) -> BumpOutcome {
        if self.broken || self.is_bouncing() {
            return BumpOutcome::Inert;
        }
        if self.breakable && strong && self.contents.is_none() {
            self.shatter();
            return BumpOutcome::Shattered;
        }
        if !self.bonkable {
            return BumpOutcome::Inert;
        }

        if self.material == TileMaterial::Hidden {
            self.edges = Edges::SOLID;
        }

        let mut coin = false;
        let mut payload = None;
        match self.contents {
            Some(ContainedItem::Coin) => {
                coin = true;
                self.coins_left = self.coins_left.saturating_sub(1);
                if self.coins_left == 0 {
                    self.spend();
                }
            }
            Some(item) => {
                payload = Some(item);
                self.spend();
            }
            None => {}
        }

        self.reaction = TileReaction::Bouncing {
            offset: 0.0,
            velocity: -BOUNCE_IMPULSE,
            frame: 0,
            payload,
            apex_reached: false,
        };
        BumpOutcome::Bounced { coin, payload }
    }

    fn spend(&mut self) {
        self.contents = None;
        self.hit = true;
        self.bonkable = false;
        self.breakable = false;
    }

    /// Break the tile apart. Idempotent; `broken` never reverts.
    pub fn shatter(&mut self) {
        self.broken = true;
        self.edges = Edges::empty();
        self.bonkable = false;
        self.reaction = TileReaction::Broken;
    }

    /// Advance the bounce by one frame.
    pub fn advance(&mut self) -> Option<BounceSignal> {
        let TileReaction::Bouncing {
            offset,
            velocity,
            frame,
            payload,
            apex_reached,
        } = self.reaction
        else {
            return None;
        };

        let offset = offset + velocity;
        let velocity = velocity + BOUNCE_GRAVITY;
        let frame = frame + 1;

        if offset >= 0.0 {
            self.reaction = TileReaction::Settled;
            return Some(BounceSignal::Settled);
        }

        let at_apex = !apex_reached && velocity >= 0.0;
        self.reaction = TileReaction::Bouncing {
            offset,
            velocity,
            frame,
            payload: if at_apex { None } else { payload },
            apex_reached: apex_reached || at_apex,
        };
        at_apex.then_some(BounceSignal::Apex { payload })
    }
}
