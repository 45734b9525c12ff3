//! Enemy behaviours.
//!
//! Every enemy runs the same small state machine; the kind decides which
//! transitions exist.
//!
//! ```text
//!   Patrol ──stomp──> Stomped ──timer──> removed           (Goomba)
//!   Patrol ──stomp──> Shell(Idle) ──touch──> Shell(Sliding) (Koopa)
//!                      ^   │ wake timer           │ stomp
//!                      │   └──────> Patrol        │
//!                      └──────────────────────────┘
//!   any ──shot──> Shot ──off-level──> removed
//! ```

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tilegrid::TileSet;

use crate::collision;
use crate::config::{ActorConfig, Durations, SimConfig};
use crate::entity::{Body, EntityId, Facing};
use crate::kinematics;

/// Enemy species.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnemyKind {
    /// Walks, flattens when stomped.
    Goomba,
    /// Walks, retreats into a kickable shell when stomped.
    KoopaTroopa,
    /// Walks, hurts anyone landing on it.
    Spiny,
}

impl EnemyKind {
    /// Hitbox while walking.
    #[must_use]
    pub fn size(self) -> Vec2 {
        match self {
            Self::KoopaTroopa => Vec2::new(16.0, 24.0),
            Self::Goomba | Self::Spiny => Vec2::new(16.0, 16.0),
        }
    }

    /// Whether landing on it is a stomp rather than damage.
    #[must_use]
    pub fn stompable(self) -> bool {
        !matches!(self, Self::Spiny)
    }

    /// Whether a stomp turns it into a shell.
    #[must_use]
    pub fn has_shell(self) -> bool {
        matches!(self, Self::KoopaTroopa)
    }

    /// Sprite frames for a state, cycled every 8 frames.
    #[must_use]
    pub fn frames(self, state: &EnemyState) -> &'static [u8] {
        match (self, state) {
            (_, EnemyState::Shot) => &[3],
            (Self::Goomba, EnemyState::Stomped { .. }) => &[2],
            (Self::KoopaTroopa, EnemyState::Shell(ShellMotion::Idle { frames }))
                if *frames > WAKE_WARNING =>
            {
                &[2, 6]
            }
            (Self::KoopaTroopa, EnemyState::Shell(ShellMotion::Idle { .. })) => &[2],
            (Self::KoopaTroopa, EnemyState::Shell(ShellMotion::Sliding { .. })) => &[2, 3, 4, 5],
            _ => &[0, 1],
        }
    }
}

/// Frames into an idle shell after which it starts shaking.
const WAKE_WARNING: u32 = 240;
/// Hitbox height of a shell.
const SHELL_HEIGHT: f32 = 16.0;

/// Motion of a shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShellMotion {
    /// Resting.
    Idle {
        /// Frames spent resting
        frames: u32,
    },
    /// Kicked and sliding.
    Sliding {
        /// Player who kicked it
        kicker: Option<EntityId>,
        /// Frames left during which the kicker is ignored
        grace: u32,
    },
}

/// Behaviour state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnemyState {
    /// Walking back and forth.
    Patrol,
    /// Flattened; removed when the timer runs out.
    Stomped {
        /// Frames spent flattened
        frames: u32,
    },
    /// Inside its shell.
    Shell(ShellMotion),
    /// Knocked off the level.
    Shot,
}

impl EnemyState {
    /// Whether the enemy hurts players it touches from the side.
    #[must_use]
    pub fn is_harmful(&self) -> bool {
        matches!(
            self,
            Self::Patrol | Self::Shell(ShellMotion::Sliding { .. })
        )
    }

    /// Whether the enemy still collides with tiles and actors.
    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Shot)
    }
}

/// Components for enemy entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnemyComponents {
    /// Shared actor state
    pub body: Body,
    /// Species
    pub kind: EnemyKind,
    /// Behaviour state
    pub state: EnemyState,
    /// Kills made by this enemy as a sliding shell
    pub chain: u32,
    /// Animation clock
    pub clock: u32,
    /// Spin angle while shot, radians
    pub spin: f32,
}

impl EnemyComponents {
    /// A patrolling enemy standing with its bottom-left at `feet`.
    #[must_use]
    pub fn patrolling(kind: EnemyKind, feet: Vec2, config: &ActorConfig) -> Self {
        let size = kind.size();
        let mut body = Body::new(tilegrid::Aabb::new(feet.x, feet.y - size.y, size.x, size.y));
        body.facing = Facing::Left;
        body.velocity.x = -config.patrol_speed;
        Self {
            body,
            kind,
            state: EnemyState::Patrol,
            chain: 0,
            clock: 0,
            spin: 0.0,
        }
    }

    /// Current sprite frame.
    #[must_use]
    pub fn frame(&self) -> u8 {
        let frames = self.kind.frames(&self.state);
        frames[(self.clock / 8) as usize % frames.len()]
    }

    /// Whether this is a sliding shell.
    #[must_use]
    pub fn is_sliding_shell(&self) -> bool {
        matches!(self.state, EnemyState::Shell(ShellMotion::Sliding { .. }))
    }

    /// Kicker a sliding shell still ignores, if any.
    #[must_use]
    pub fn protected_kicker(&self) -> Option<EntityId> {
        match self.state {
            EnemyState::Shell(ShellMotion::Sliding {
                kicker: Some(kicker),
                grace,
            }) if grace > 0 => Some(kicker),
            _ => None,
        }
    }
}

/// What happened when an enemy was stomped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StompResult {
    /// Flattened.
    Flattened,
    /// Retreated into its shell, or a sliding shell was stopped.
    Shelled,
    /// An idle shell was stomped and kicked away.
    Kicked,
    /// Not stompable in its current state.
    Refused,
}

/// Timed transitions that happened during [`tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnemyTick {
    /// The flatten timer ran out.
    Expired,
    /// A shell woke up and walks again.
    Woke,
}

/// Advance timers by one frame.
///
/// A shell due to wake keeps waiting while a ceiling leaves no room to stand.
pub fn tick(
    enemy: &mut EnemyComponents,
    durations: &Durations,
    actors: &ActorConfig,
    tiles: &TileSet,
) -> Option<EnemyTick> {
    enemy.clock = enemy.clock.wrapping_add(1);
    match &mut enemy.state {
        EnemyState::Stomped { frames } => {
            *frames += 1;
            (*frames >= durations.stomped_frames).then_some(EnemyTick::Expired)
        }
        EnemyState::Shell(ShellMotion::Idle { frames }) => {
            *frames = (*frames + 1).min(durations.shell_wake_frames);
            let mut standing = enemy.body.bounds;
            standing.resize_from_bottom(enemy.kind.size());
            if *frames >= durations.shell_wake_frames && !collision::hits_ceiling(&standing, tiles) {
                enemy.state = EnemyState::Patrol;
                enemy.body.bounds = standing;
                enemy.body.velocity.x = enemy.body.facing.sign() * actors.patrol_speed;
                debug!(kind = ?enemy.kind, "shell woke up");
                Some(EnemyTick::Woke)
            } else {
                None
            }
        }
        EnemyState::Shell(ShellMotion::Sliding { grace, .. }) => {
            *grace = grace.saturating_sub(1);
            None
        }
        EnemyState::Shot => {
            enemy.spin += 0.2;
            None
        }
        EnemyState::Patrol => None,
    }
}

/// Integrate velocity for the frame. Returns `None` for enemies that stand still.
#[must_use]
pub fn plan_motion(enemy: &EnemyComponents, config: &SimConfig) -> Option<Body> {
    let mut body = enemy.body.clone();
    let gravity = config.physics.gravity;
    let terminal = config.physics.terminal_fall;
    match enemy.state {
        EnemyState::Stomped { .. } => return None,
        EnemyState::Patrol => {
            body.velocity.x = body.facing.sign() * config.actors.patrol_speed;
        }
        EnemyState::Shell(ShellMotion::Idle { .. }) => body.velocity.x = 0.0,
        EnemyState::Shell(ShellMotion::Sliding { .. }) => {
            body.velocity.x = body.facing.sign() * config.actors.shell_speed;
        }
        EnemyState::Shot => {}
    }
    kinematics::apply_gravity(&mut body, gravity, terminal);
    Some(body)
}

/// Turn around after running into a wall.
pub fn bounce_off_wall(enemy: &mut EnemyComponents) {
    enemy.body.facing = enemy.body.facing.flipped();
    enemy.body.velocity.x = -enemy.body.velocity.x;
}

/// Apply a stomp from above.
pub fn stomp(enemy: &mut EnemyComponents, kick_direction: f32, config: &SimConfig) -> StompResult {
    if !enemy.kind.stompable() {
        return StompResult::Refused;
    }
    match enemy.state {
        EnemyState::Patrol if enemy.kind.has_shell() => {
            retreat_into_shell(enemy);
            StompResult::Shelled
        }
        EnemyState::Patrol => {
            enemy.state = EnemyState::Stomped { frames: 0 };
            enemy.body.velocity = Vec2::ZERO;
            enemy.body.bounds.resize_from_bottom(Vec2::new(16.0, 8.0));
            StompResult::Flattened
        }
        EnemyState::Shell(ShellMotion::Sliding { .. }) => {
            retreat_into_shell(enemy);
            StompResult::Shelled
        }
        EnemyState::Shell(ShellMotion::Idle { .. }) => {
            kick(enemy, None, kick_direction, config);
            StompResult::Kicked
        }
        EnemyState::Stomped { .. } | EnemyState::Shot => StompResult::Refused,
    }
}

fn retreat_into_shell(enemy: &mut EnemyComponents) {
    enemy.state = EnemyState::Shell(ShellMotion::Idle { frames: 0 });
    enemy.body.velocity.x = 0.0;
    enemy.chain = 0;
    let width = enemy.body.bounds.width();
    enemy.body.bounds.resize_from_bottom(Vec2::new(width, SHELL_HEIGHT));
}

/// Send a shell sliding in `direction` (-1 or 1).
pub fn kick(enemy: &mut EnemyComponents, kicker: Option<EntityId>, direction: f32, config: &SimConfig) {
    enemy.body.facing = Facing::from_sign(direction);
    enemy.body.velocity.x = direction.signum() * config.actors.shell_speed;
    enemy.chain = 0;
    enemy.state = EnemyState::Shell(ShellMotion::Sliding {
        kicker,
        grace: config.durations.kick_grace_frames,
    });
}

/// Knock the enemy off the level with a hop away from `direction`'s source.
pub fn shoot(enemy: &mut EnemyComponents, direction: f32, actors: &ActorConfig) {
    enemy.state = EnemyState::Shot;
    enemy.body.solid = false;
    enemy.body.on_ground = false;
    enemy.body.velocity = Vec2::new(direction.signum() * actors.shot_push, -actors.shot_hop);
}
