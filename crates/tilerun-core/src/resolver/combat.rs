//! Combat resolver for enemy interactions.
//!
//! The `CombatResolver` handles:
//! - `Stomp`: flatten, shell or kick the enemy and bounce the player
//! - `KickShell`: send an idle shell sliding
//! - `ShootEnemy`: knock an enemy off the level
//! - `HopItem`: pop an item resting on a bumped tile
//!
//! # Scoring
//!
//! Chained kills walk the combo ladder in [`ScoringConfig`]: stomps between
//! landings, kills by one sliding shell, and kills during one star each have
//! their own counter. Steps past the end of the ladder grant a life.
//!
//! [`ScoringConfig`]: crate::config::ScoringConfig

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::{ComboAward, SimConfig};
use crate::enemy::{self, EnemyComponents, EnemyState, ShellMotion, StompResult};
use crate::entity::{Entity, EntityId};
use crate::item;
use crate::level_state::LevelState;
use crate::output::{GameEvent, Interaction, OutputEnvelope, OutputKind, ShotCause};

use super::{award, Resolver};

/// Resolver for stomps, kicks, shots and item hops.
///
/// # Example
///
/// ```
/// use tilerun_core::config::SimConfig;
/// use tilerun_core::output::OutputKind;
/// use tilerun_core::resolver::{CombatResolver, Resolver};
///
/// let resolver = CombatResolver::new(SimConfig::default());
/// assert!(resolver.handles().contains(&OutputKind::Interaction));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CombatResolver {
    config: SimConfig,
}

/// Per-resolve bookkeeping.
struct Pass<'a> {
    current: &'a LevelState,
    next: &'a mut LevelState,
    /// Enemies already stomped, kicked or shot this step
    struck: BTreeSet<EntityId>,
    events: Vec<GameEvent>,
}

fn live_enemy(level: &LevelState, id: EntityId) -> Option<&EnemyComponents> {
    level
        .get(id)
        .filter(|e| !e.is_removed())
        .and_then(Entity::as_enemy)
}

fn sign_or(value: f32, fallback: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        fallback
    }
}

impl CombatResolver {
    /// Creates a combat resolver with the level's tunables.
    #[must_use]
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    fn stomp(&self, player: EntityId, target: EntityId, pass: &mut Pass<'_>) {
        let current = pass.current;
        let Some(before) = live_enemy(current, target) else {
            return;
        };
        let Some(stomper) = current.get(player).and_then(Entity::as_player) else {
            return;
        };
        if !pass.struck.insert(target) {
            return;
        }
        let direction = sign_or(
            before.body.bounds.center().x - stomper.body.bounds.center().x,
            stomper.body.facing.sign(),
        );

        let Some(enemy) = pass.next.get_mut(target).and_then(Entity::as_enemy_mut) else {
            return;
        };
        let result = enemy::stomp(enemy, direction, &self.config);
        if result == StompResult::Kicked {
            enemy::kick(enemy, Some(player), direction, &self.config);
        }
        let kind = enemy.kind;
        if result == StompResult::Refused {
            return;
        }
        debug!(%player, enemy = %target, ?result, "stomp");
        pass.events.push(GameEvent::Stomped {
            player,
            enemy: target,
            kind,
        });

        let Some(p) = pass.next.get_mut(player).and_then(Entity::as_player_mut) else {
            return;
        };
        p.body.velocity.y = -self.config.physics.stomp_bounce;
        p.body.on_ground = false;
        p.motion.jump_active = false;

        let points = match result {
            StompResult::Kicked => {
                pass.events.push(GameEvent::ShellKicked {
                    shell: target,
                    by: Some(player),
                });
                ComboAward::Points(self.config.scoring.kick)
            }
            _ => {
                let step = p.stomp_combo;
                p.stomp_combo += 1;
                self.config.scoring.combo_award(step)
            }
        };
        award(pass.next, player, points, &mut pass.events);
    }

    fn kick(&self, player: EntityId, shell: EntityId, direction: f32, pass: &mut Pass<'_>) {
        let idle = live_enemy(pass.current, shell)
            .is_some_and(|e| matches!(e.state, EnemyState::Shell(ShellMotion::Idle { .. })));
        if !idle || !pass.struck.insert(shell) {
            return;
        }
        let Some(enemy) = pass.next.get_mut(shell).and_then(Entity::as_enemy_mut) else {
            return;
        };
        enemy::kick(enemy, Some(player), direction, &self.config);
        debug!(%player, %shell, direction, "shell kicked");
        pass.events.push(GameEvent::ShellKicked {
            shell,
            by: Some(player),
        });
        award(
            pass.next,
            player,
            ComboAward::Points(self.config.scoring.kick),
            &mut pass.events,
        );
    }

    fn shoot(&self, target: EntityId, cause: ShotCause, direction: f32, pass: &mut Pass<'_>) {
        let active = live_enemy(pass.current, target).is_some_and(|e| e.state.is_active());
        if !active || !pass.struck.insert(target) {
            return;
        }
        let Some(enemy) = pass.next.get_mut(target).and_then(Entity::as_enemy_mut) else {
            return;
        };
        enemy::shoot(enemy, direction, &self.config.actors);
        debug!(enemy = %target, ?cause, "enemy shot");
        pass.events.push(GameEvent::EnemyShot {
            enemy: target,
            cause,
        });

        let scoring = &self.config.scoring;
        let credit = match cause {
            ShotCause::Shell { shell, kicker } => {
                let step = pass
                    .next
                    .get_mut(shell)
                    .and_then(Entity::as_enemy_mut)
                    .map_or(0, |s| {
                        let step = s.chain;
                        s.chain += 1;
                        step
                    });
                kicker.map(|k| (k, scoring.combo_award(step)))
            }
            ShotCause::Star { player } => {
                let step = pass
                    .next
                    .get_mut(player)
                    .and_then(Entity::as_player_mut)
                    .map_or(0, |p| {
                        let step = p.star_combo;
                        p.star_combo += 1;
                        step
                    });
                Some((player, scoring.combo_award(step)))
            }
            ShotCause::Fireball { owner: player } | ShotCause::Bump { player } => {
                Some((player, scoring.combo_award(0)))
            }
        };
        if let Some((player, points)) = credit {
            award(pass.next, player, points, &mut pass.events);
        }
    }

    fn hop(&self, target: EntityId, current: &LevelState, next: &mut LevelState) {
        let live = current
            .get(target)
            .is_some_and(|e| !e.is_removed() && e.as_item().is_some());
        if !live {
            return;
        }
        if let Some(it) = next.get_mut(target).and_then(Entity::as_item_mut) {
            item::hop(it, &self.config.actors);
        }
    }
}

impl Resolver for CombatResolver {
    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Interaction]
    }

    fn resolve(
        &self,
        outputs: &[&OutputEnvelope],
        current: &LevelState,
        next: &mut LevelState,
    ) -> Vec<GameEvent> {
        let mut pass = Pass {
            current,
            next,
            struck: BTreeSet::new(),
            events: Vec::new(),
        };
        for envelope in outputs {
            let Some(interaction) = envelope.output().as_interaction() else {
                continue;
            };
            match *interaction {
                Interaction::Stomp { player, enemy } => {
                    self.stomp(player, enemy, &mut pass);
                }
                Interaction::KickShell {
                    player,
                    shell,
                    direction,
                } => self.kick(player, shell, direction, &mut pass),
                Interaction::ShootEnemy {
                    enemy,
                    cause,
                    direction,
                } => self.shoot(enemy, cause, direction, &mut pass),
                Interaction::HopItem { item } => self.hop(item, pass.current, pass.next),
                // Pickups, damage and coins belong to the power resolver
                Interaction::Collect { .. }
                | Interaction::HurtPlayer { .. }
                | Interaction::KillPlayer { .. }
                | Interaction::GrantCoin { .. } => {}
            }
        }
        pass.events
    }
}
