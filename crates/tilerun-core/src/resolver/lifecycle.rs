//! Lifecycle resolver for spawns and despawns.
//!
//! Spawns are queued as commands during the step and applied here, so no
//! phase ever inserts into the entity map it is iterating. Ids are assigned in
//! command order, which keeps them deterministic.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::SimConfig;
use crate::entity::{Entity, EntityId, EntityInner};
use crate::item::ItemComponents;
use crate::level_state::LevelState;
use crate::output::{Command, GameEvent, OutputEnvelope, OutputKind, SpawnRequest};
use crate::projectile::{ParticleComponents, ProjectileComponents};

use super::Resolver;

/// Resolver for entity creation and removal.
///
/// Fireball requests beyond the per-player cap are dropped silently.
#[derive(Debug, Clone, Default)]
pub struct LifecycleResolver {
    config: SimConfig,
}

impl LifecycleResolver {
    /// Creates a lifecycle resolver with the level's tunables.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }
}

impl Resolver for LifecycleResolver {
    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Command]
    }

    fn resolve(
        &self,
        outputs: &[&OutputEnvelope],
        current: &LevelState,
        next: &mut LevelState,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut thrown: BTreeMap<EntityId, usize> = BTreeMap::new();
        for envelope in outputs {
            let Some(command) = envelope.output().as_command() else {
                continue;
            };
            match command {
                Command::Spawn(SpawnRequest::Item { kind, cell }) => {
                    let item = next.spawn(EntityInner::Item(ItemComponents::emerge(
                        *kind,
                        *cell,
                        self.config.durations.item_emerge_frames,
                    )));
                    debug!(%item, ?kind, x = cell.x, y = cell.y, "item spawned");
                    events.push(GameEvent::ItemSpawned { item, kind: *kind });
                }
                Command::Spawn(SpawnRequest::Fireball {
                    owner,
                    hand,
                    facing,
                }) => {
                    let alive = current.get(*owner).is_some_and(|e| {
                        !e.is_removed() && e.as_player().is_some_and(|p| !p.power.is_dead())
                    });
                    let count = thrown.entry(*owner).or_insert_with(|| current.fireballs_of(*owner));
                    if !alive || *count >= self.config.fireball.max_per_player {
                        trace!(%owner, "fireball request dropped");
                        continue;
                    }
                    *count += 1;
                    let fireball = next.spawn(EntityInner::Projectile(ProjectileComponents::fireball(
                        *owner,
                        *hand,
                        *facing,
                        &self.config.fireball,
                    )));
                    if let Some(p) = next.get_mut(*owner).and_then(Entity::as_player_mut) {
                        p.fire_pose = self.config.durations.fire_pose_frames;
                    }
                    events.push(GameEvent::FireballThrown {
                        player: *owner,
                        fireball,
                    });
                }
                Command::Spawn(SpawnRequest::Particle { kind, at, velocity }) => {
                    next.spawn(EntityInner::Particle(ParticleComponents::new(*kind, *at, *velocity)));
                }
                Command::Despawn { target } => {
                    next.mark_removed(*target);
                }
            }
        }
        events
    }
}
