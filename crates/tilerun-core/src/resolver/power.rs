//! Power resolver for pickups, damage and deaths.
//!
//! The `PowerResolver` handles:
//! - `Collect`: consume an item and apply its power-up, life or coin
//! - `HurtPlayer`: one tier down, or death for a small player
//! - `KillPlayer`: unconditional death (pits)
//! - `GrantCoin`: coin count, coin points, and a life every hundred coins
//!
//! Transitions go through [`PowerState`](crate::power::PowerState), so a
//! request arriving while a queue runs is ignored. An item touched during a
//! queue is still consumed.

use std::collections::BTreeSet;

use glam::Vec2;
use tracing::{debug, info};

use crate::config::{ScoringConfig, SimConfig};
use crate::entity::{Entity, EntityId, MotionState, PlayerComponents};
use crate::item::ItemKind;
use crate::level_state::LevelState;
use crate::output::{GameEvent, Interaction, OutputEnvelope, OutputKind};
use crate::power::{PowerRules, PowerTransition};

use super::{grant_life, Resolver};

/// Resolver for player power, lives and coins.
///
/// # Example
///
/// ```
/// use tilerun_core::config::SimConfig;
/// use tilerun_core::output::OutputKind;
/// use tilerun_core::resolver::{PowerResolver, Resolver};
///
/// let resolver = PowerResolver::new(&SimConfig::default());
/// assert_eq!(resolver.handles(), &[OutputKind::Interaction]);
/// ```
#[derive(Debug, Clone)]
pub struct PowerResolver {
    rules: PowerRules,
    scoring: ScoringConfig,
    death_hop: f32,
}

impl Default for PowerResolver {
    fn default() -> Self {
        Self::new(&SimConfig::default())
    }
}

fn live_player(level: &LevelState, id: EntityId) -> Option<&PlayerComponents> {
    level
        .get(id)
        .filter(|e| !e.is_removed())
        .and_then(Entity::as_player)
}

impl PowerResolver {
    /// Creates a power resolver with the level's tunables.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        Self {
            rules: PowerRules::from_config(config),
            scoring: config.scoring.clone(),
            death_hop: config.physics.death_hop,
        }
    }

    fn collect(
        &self,
        player: EntityId,
        item: EntityId,
        current: &LevelState,
        next: &mut LevelState,
        consumed: &mut BTreeSet<EntityId>,
        events: &mut Vec<GameEvent>,
    ) {
        let tangible = live_player(current, player).is_some_and(PlayerComponents::is_tangible);
        let Some(kind) = current
            .get(item)
            .filter(|e| !e.is_removed())
            .and_then(Entity::as_item)
            .filter(|i| i.collectible())
            .map(|i| i.kind)
        else {
            return;
        };
        if !tangible || !consumed.insert(item) {
            return;
        }
        next.mark_removed(item);
        events.push(GameEvent::ItemCollected { player, kind });

        let Some(p) = next.get_mut(player).and_then(Entity::as_player_mut) else {
            return;
        };
        if let Some(power_up) = kind.power_up() {
            let transition = p.power.collect(power_up, &self.rules);
            debug!(%player, ?kind, ?transition, "power-up collected");
            if transition == PowerTransition::StarStarted {
                p.star_combo = 0;
                events.push(GameEvent::StarStarted { player });
            }
            p.score = p.score.saturating_add(u64::from(self.scoring.power_up));
            events.push(GameEvent::ScoreAwarded {
                player,
                points: self.scoring.power_up,
            });
            return;
        }
        match kind {
            ItemKind::OneUp => grant_life(p, player, events),
            ItemKind::Coin => self.coin(p, player, events),
            ItemKind::Mushroom | ItemKind::FireFlower | ItemKind::Star => {}
        }
    }

    fn coin(&self, p: &mut PlayerComponents, player: EntityId, events: &mut Vec<GameEvent>) {
        p.coins += 1;
        p.score = p.score.saturating_add(u64::from(self.scoring.coin));
        events.push(GameEvent::CoinCollected {
            player,
            coins: p.coins,
        });
        events.push(GameEvent::ScoreAwarded {
            player,
            points: self.scoring.coin,
        });
        if self.scoring.coins_per_life > 0 && p.coins >= self.scoring.coins_per_life {
            p.coins -= self.scoring.coins_per_life;
            grant_life(p, player, events);
        }
    }

    fn die(&self, p: &mut PlayerComponents, player: EntityId, events: &mut Vec<GameEvent>) {
        p.lives = p.lives.saturating_sub(1);
        p.body.velocity = Vec2::new(0.0, -self.death_hop);
        p.body.solid = false;
        p.body.on_ground = false;
        p.controls_enabled = false;
        p.motion = MotionState::default();
        info!(%player, lives = p.lives, "player died");
        events.push(GameEvent::PlayerDied {
            player,
            lives: p.lives,
        });
    }

    fn hurt(
        &self,
        player: EntityId,
        by: EntityId,
        current: &LevelState,
        next: &mut LevelState,
        events: &mut Vec<GameEvent>,
    ) {
        if !live_player(current, player).is_some_and(PlayerComponents::is_tangible) {
            return;
        }
        let Some(p) = next.get_mut(player).and_then(Entity::as_player_mut) else {
            return;
        };
        match p.power.damage(&self.rules) {
            PowerTransition::Shrinking { from, to } => {
                debug!(%player, %by, ?from, ?to, "player hurt");
                events.push(GameEvent::PlayerHurt { player });
            }
            PowerTransition::Died => self.die(p, player, events),
            _ => {}
        }
    }

    fn kill(
        &self,
        player: EntityId,
        current: &LevelState,
        next: &mut LevelState,
        events: &mut Vec<GameEvent>,
    ) {
        if live_player(current, player).is_none() {
            return;
        }
        let Some(p) = next.get_mut(player).and_then(Entity::as_player_mut) else {
            return;
        };
        if p.power.kill() == PowerTransition::Died {
            self.die(p, player, events);
        }
    }
}

impl Resolver for PowerResolver {
    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Interaction]
    }

    fn resolve(
        &self,
        outputs: &[&OutputEnvelope],
        current: &LevelState,
        next: &mut LevelState,
    ) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let mut consumed = BTreeSet::new();
        for envelope in outputs {
            let Some(interaction) = envelope.output().as_interaction() else {
                continue;
            };
            match *interaction {
                Interaction::Collect { player, item } => {
                    self.collect(player, item, current, next, &mut consumed, &mut events);
                }
                Interaction::HurtPlayer { player, by } => {
                    self.hurt(player, by, current, next, &mut events);
                }
                Interaction::KillPlayer { player } => self.kill(player, current, next, &mut events),
                Interaction::GrantCoin { player } => {
                    if live_player(current, player).is_some() {
                        if let Some(p) = next.get_mut(player).and_then(Entity::as_player_mut) {
                            self.coin(p, player, &mut events);
                        }
                    }
                }
                Interaction::Stomp { .. }
                | Interaction::KickShell { .. }
                | Interaction::ShootEnemy { .. }
                | Interaction::HopItem { .. } => {}
            }
        }
        events
    }
}
