//! Resolvers apply a step's outputs to the next level state.
//!
//! # Architecture
//!
//! Each resolver declares which output kinds it handles via
//! [`Resolver::handles()`]. During the resolution phase:
//! 1. `next` is cloned from `current`
//! 2. Outputs are routed to resolvers by kind, in emission order
//! 3. Each resolver mutates `next` and reports the events its effects caused
//! 4. The [`EventResolver`] records the phase events plus every derived event
//!
//! # Invariants
//!
//! - Decisions (is the target alive, was it already hit) are made against
//!   `current`; effects accumulate in `next`
//! - Resolvers are deterministic given the same inputs and output order
//! - An enemy is affected by at most one stomp or shot per step; the first
//!   output wins
//!
//! # Available Resolvers
//!
//! - [`LifecycleResolver`]: spawns and despawns
//! - [`CombatResolver`]: stomps, kicks, shots, item hops, combo scoring
//! - [`PowerResolver`]: pickups, damage, deaths, coins
//! - [`EventResolver`]: records events for the sink and `take_events`

mod combat;
mod event;
mod lifecycle;
mod power;

pub use combat::CombatResolver;
pub use event::EventResolver;
pub use lifecycle::LifecycleResolver;
pub use power::PowerResolver;

use crate::config::ComboAward;
use crate::entity::{EntityId, PlayerComponents};
use crate::level_state::LevelState;
use crate::output::{GameEvent, OutputEnvelope, OutputKind};

/// Resolver processes outputs and mutates the next state.
///
/// # Example
///
/// ```
/// use tilerun_core::level_state::LevelState;
/// use tilerun_core::output::{GameEvent, OutputEnvelope, OutputKind};
/// use tilerun_core::resolver::Resolver;
///
/// struct Silent;
///
/// impl Resolver for Silent {
///     fn handles(&self) -> &[OutputKind] {
///         &[OutputKind::Interaction]
///     }
///
///     fn resolve(
///         &self,
///         _outputs: &[&OutputEnvelope],
///         _current: &LevelState,
///         _next: &mut LevelState,
///     ) -> Vec<GameEvent> {
///         Vec::new()
///     }
/// }
/// ```
pub trait Resolver: Send + Sync {
    /// Output kinds this resolver handles.
    fn handles(&self) -> &[OutputKind];

    /// Apply `outputs` to `next`, returning the events the effects caused.
    ///
    /// # Invariants
    ///
    /// - Validity checks use `current`
    /// - Must be deterministic given the same inputs and output order
    fn resolve(
        &self,
        outputs: &[&OutputEnvelope],
        current: &LevelState,
        next: &mut LevelState,
    ) -> Vec<GameEvent>;
}

/// Credit a player with points or a life.
pub(crate) fn award(
    next: &mut LevelState,
    player: EntityId,
    award: ComboAward,
    events: &mut Vec<GameEvent>,
) {
    let Some(p) = next.get_mut(player).and_then(|e| e.as_player_mut()) else {
        return;
    };
    match award {
        ComboAward::Points(points) => {
            p.score = p.score.saturating_add(u64::from(points));
            events.push(GameEvent::ScoreAwarded { player, points });
        }
        ComboAward::ExtraLife => grant_life(p, player, events),
    }
}

pub(crate) fn grant_life(p: &mut PlayerComponents, player: EntityId, events: &mut Vec<GameEvent>) {
    p.lives = p.lives.saturating_add(1);
    events.push(GameEvent::LifeGained {
        player,
        lives: p.lives,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Character;
    use crate::entity::EntityInner;
    use crate::level_state::LevelInfo;
    use glam::Vec2;

    #[test]
    fn resolver_is_object_safe() {
        fn _accepts_boxed(_resolver: Box<dyn Resolver>) {}
        fn _accepts_slice(_resolvers: &[Box<dyn Resolver>]) {}
    }

    #[test]
    fn award_points_and_life() {
        let mut level = LevelState::new(LevelInfo::default());
        let id = level.spawn(EntityInner::Player(PlayerComponents::spawn(
            0,
            Character::Mario,
            Vec2::ZERO,
            3,
        )));
        let mut events = Vec::new();
        award(&mut level, id, ComboAward::Points(400), &mut events);
        award(&mut level, id, ComboAward::ExtraLife, &mut events);
        let p = level.get(id).and_then(|e| e.as_player()).unwrap();
        assert_eq!(p.score, 400);
        assert_eq!(p.lives, 4);
        assert_eq!(
            events,
            vec![
                GameEvent::ScoreAwarded {
                    player: id,
                    points: 400
                },
                GameEvent::LifeGained { player: id, lives: 4 },
            ]
        );
    }
}
