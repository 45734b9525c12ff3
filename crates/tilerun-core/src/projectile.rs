//! Fireballs and short-lived particles.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tilegrid::Aabb;

use crate::config::{FireballConfig, SimConfig};
use crate::entity::{Body, EntityId, Facing};
use crate::kinematics;

/// Fireball box edge length.
pub const FIREBALL_SIZE: f32 = 8.0;

/// Components for fireballs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectileComponents {
    /// Shared actor state
    pub body: Body,
    /// Player who threw it
    pub owner: EntityId,
    /// Frames alive
    pub age: u32,
}

impl ProjectileComponents {
    /// A fireball thrown from `hand` towards `facing`.
    #[must_use]
    pub fn fireball(owner: EntityId, hand: Vec2, facing: Facing, config: &FireballConfig) -> Self {
        let mut body = Body::new(fireball_bounds(hand));
        body.facing = facing;
        body.velocity = Vec2::new(facing.sign() * config.speed, config.bounce / 2.0);
        Self {
            body,
            owner,
            age: 0,
        }
    }
}

/// Box of a fireball leaving `hand`.
#[must_use]
pub fn fireball_bounds(hand: Vec2) -> Aabb {
    let half = FIREBALL_SIZE / 2.0;
    Aabb::new(hand.x - half, hand.y - half, FIREBALL_SIZE, FIREBALL_SIZE)
}

/// Integrate one frame of fireball flight.
#[must_use]
pub fn plan_motion(fireball: &ProjectileComponents, config: &SimConfig) -> Body {
    let mut body = fireball.body.clone();
    body.velocity.x = body.facing.sign() * config.fireball.speed;
    kinematics::apply_gravity(&mut body, config.fireball.gravity, config.physics.terminal_fall);
    body
}

/// Apply the tile sweep result. Returns `false` when the fireball burns out.
pub fn settle(fireball: &mut ProjectileComponents, landed: bool, hit_wall: bool, config: &FireballConfig) -> bool {
    fireball.age += 1;
    if hit_wall || fireball.age >= config.lifetime_frames {
        return false;
    }
    if landed {
        fireball.body.velocity.y = -config.bounce;
        fireball.body.on_ground = false;
    }
    true
}

/// Particle variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleKind {
    /// Brick fragment.
    Debris,
    /// Coin popping out of a block.
    CoinPop,
}

impl ParticleKind {
    /// Frames before the particle disappears.
    #[must_use]
    pub const fn lifetime(self) -> u32 {
        match self {
            Self::Debris => 90,
            Self::CoinPop => 30,
        }
    }

    /// Launch velocity.
    #[must_use]
    pub const fn launch(self) -> Vec2 {
        match self {
            Self::Debris => Vec2::ZERO,
            Self::CoinPop => Vec2::new(0.0, -6.0),
        }
    }
}

/// Components for cosmetic particles. Particles ignore tiles and actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticleComponents {
    /// Shared actor state; never solid
    pub body: Body,
    /// Variant
    pub kind: ParticleKind,
    /// Frames alive
    pub age: u32,
}

impl ParticleComponents {
    /// A particle centred on `at` with an initial velocity.
    #[must_use]
    pub fn new(kind: ParticleKind, at: Vec2, velocity: Vec2) -> Self {
        let mut body = Body::new(Aabb::new(at.x - 4.0, at.y - 4.0, 8.0, 8.0));
        body.velocity = velocity;
        body.solid = false;
        Self { body, kind, age: 0 }
    }
}

/// Move a particle one frame. Returns `false` once it has expired.
pub fn advance_particle(particle: &mut ParticleComponents, gravity: f32, terminal: f32) -> bool {
    kinematics::apply_gravity(&mut particle.body, gravity, terminal);
    let delta = particle.body.velocity;
    particle.body.bounds = particle.body.bounds.translated(delta);
    particle.body.displacement = delta;
    particle.age += 1;
    particle.age < particle.kind.lifetime()
}
