//! Consequences of striking a tile from below.
//!
//! [`tilegrid`] owns the tile state machine; this module turns its outcomes
//! into outputs: coin pops, debris, enemies and items riding the bumped tile,
//! and the item released once the bounce reaches its apex.

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tilegrid::{Aabb, BumpOutcome, ContainedItem, TileId};
use tracing::trace;

use crate::entity::{EntityId, EntityInner};
use crate::item::ItemKind;
use crate::level_state::LevelState;
use crate::output::{GameEvent, Interaction, OutputBuffer, ShotCause, SpawnRequest};
use crate::power::PowerTier;
use crate::projectile::ParticleKind;

/// How close an actor's feet must be to a tile's top to count as riding it.
pub const RIDE_TOLERANCE: f32 = 1.0;

/// Debris launch velocities, one per quarter of the broken tile.
pub const DEBRIS_LAUNCH: [Vec2; 4] = [
    Vec2::new(-2.0, -5.0),
    Vec2::new(2.0, -5.0),
    Vec2::new(-2.0, -3.0),
    Vec2::new(2.0, -3.0),
];

/// Who bumped a tile whose item is still waiting for the apex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingPayload {
    /// Player who bumped the tile
    pub bumper: EntityId,
    /// Their committed tier at the time of the bump
    pub tier: PowerTier,
}

/// A tile that was just struck.
#[derive(Debug, Clone, Copy)]
pub struct Bump {
    /// Tile
    pub tile: TileId,
    /// Tile bounds at rest
    pub bounds: Aabb,
    /// Player who struck it
    pub bumper: EntityId,
    /// Their committed tier
    pub tier: PowerTier,
}

/// Emit the outputs for a bump. Returns the payload owner when an item will be
/// released at the apex.
pub fn react(
    bump: &Bump,
    outcome: BumpOutcome,
    level: &LevelState,
    out: &mut OutputBuffer,
) -> Option<PendingPayload> {
    let source = Some(bump.bumper);
    let mut pending = None;
    match outcome {
        BumpOutcome::Inert => {
            out.push(
                GameEvent::TileBonked {
                    tile: bump.tile,
                    by: bump.bumper,
                },
                source,
            );
            return None;
        }
        BumpOutcome::Bounced { coin, payload } => {
            out.push(
                GameEvent::TileBumped {
                    tile: bump.tile,
                    by: bump.bumper,
                },
                source,
            );
            if coin {
                out.push(Interaction::GrantCoin { player: bump.bumper }, source);
                out.push(
                    SpawnRequest::Particle {
                        kind: ParticleKind::CoinPop,
                        at: Vec2::new(bump.bounds.center().x, bump.bounds.top()),
                        velocity: ParticleKind::CoinPop.launch(),
                    },
                    source,
                );
            }
            if payload.is_some() {
                pending = Some(PendingPayload {
                    bumper: bump.bumper,
                    tier: bump.tier,
                });
            }
        }
        BumpOutcome::Shattered => {
            out.push(
                GameEvent::TileBroken {
                    tile: bump.tile,
                    by: bump.bumper,
                },
                source,
            );
            for (at, velocity) in debris_launch(&bump.bounds) {
                out.push(
                    SpawnRequest::Particle {
                        kind: ParticleKind::Debris,
                        at,
                        velocity,
                    },
                    source,
                );
            }
        }
    }
    strike_riders(bump, level, out);
    pending
}

/// Centre and velocity of the four debris particles of a broken tile.
#[must_use]
pub fn debris_launch(bounds: &Aabb) -> [(Vec2, Vec2); 4] {
    let quarter = bounds.size / 4.0;
    let left = bounds.left() + quarter.x;
    let right = bounds.right() - quarter.x;
    let top = bounds.top() + quarter.y;
    let bottom = bounds.bottom() - quarter.y;
    [
        (Vec2::new(left, top), DEBRIS_LAUNCH[0]),
        (Vec2::new(right, top), DEBRIS_LAUNCH[1]),
        (Vec2::new(left, bottom), DEBRIS_LAUNCH[2]),
        (Vec2::new(right, bottom), DEBRIS_LAUNCH[3]),
    ]
}

/// Whether `body` stands on top of the tile at `tile`.
fn rides(body: &Aabb, tile: &Aabb) -> bool {
    (body.bottom() - tile.top()).abs() <= RIDE_TOLERANCE && body.overlap_x(tile) > 0.0
}

/// Shoot enemies and hop items standing on the struck tile.
fn strike_riders(bump: &Bump, level: &LevelState, out: &mut OutputBuffer) {
    for entity in level.live() {
        if !rides(&entity.body().bounds, &bump.bounds) {
            continue;
        }
        match entity.inner() {
            EntityInner::Enemy(enemy) if enemy.state.is_active() => {
                let away = enemy.body.bounds.center().x - bump.bounds.center().x;
                trace!(enemy = %entity.id(), tile = bump.tile.0, "enemy bumped from below");
                out.push(
                    Interaction::ShootEnemy {
                        enemy: entity.id(),
                        cause: ShotCause::Bump {
                            player: bump.bumper,
                        },
                        direction: if away < 0.0 { -1.0 } else { 1.0 },
                    },
                    Some(bump.bumper),
                );
            }
            EntityInner::Item(_) => {
                out.push(Interaction::HopItem { item: entity.id() }, Some(bump.bumper));
            }
            _ => {}
        }
    }
}

/// The item to spawn at a bounce apex.
#[must_use]
pub fn release(
    bump_cell: IVec2,
    payload: ContainedItem,
    pending: Option<PendingPayload>,
    progressive: bool,
) -> SpawnRequest {
    let tier = pending.map_or(PowerTier::Small, |p| p.tier);
    SpawnRequest::Item {
        kind: ItemKind::from_contained(payload, tier, progressive),
        cell: bump_cell,
    }
}
