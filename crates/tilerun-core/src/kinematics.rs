//! Per-frame velocity integration.
//!
//! Kinematics only touches velocity, facing and timers. Positions are moved
//! by the tile sweep in [`crate::collision`], which is the only place that
//! knows about tiles.
//!
//! # Horizontal model
//!
//! - Grounded and standing: accelerate towards the held cap, or decay
//!   `vx *= 1 - acc` with nothing held, snapping to zero below `min_speed_x`.
//! - Airborne or crouching: pushing against the current motion adds an extra
//!   acceleration step (turnaround); nothing held keeps momentum.
//! - Above the cap (run released): decay towards the cap one step per frame.
//!
//! # Vertical model
//!
//! A jump press on the ground sets `vy = -min_jump`. While jump stays held the
//! upward speed is driven to `max_jump` until the hold counter reaches
//! `jump_hold_frames`. Gravity is added every frame and doubled while falling,
//! unless jump is held or the player is swimming.

use glam::Vec2;

use crate::config::{CharacterProfile, MediumScale, PhysicsConfig};
use crate::entity::{Body, Facing, MotionState};
use crate::input::{Buttons, InputFrame};
use crate::power::PowerTier;

/// Hitbox for a tier and crouch state.
#[must_use]
pub fn hitbox(tier: PowerTier, crouching: bool) -> Vec2 {
    match (tier, crouching) {
        (PowerTier::Small, false) => Vec2::new(16.0, 16.0),
        (PowerTier::Small, true) => Vec2::new(16.0, 8.0),
        (_, false) => Vec2::new(16.0, 32.0),
        (_, true) => Vec2::new(16.0, 16.0),
    }
}

/// Whether a run timer has charged p-speed.
#[must_use]
pub fn pspeed_active(run_timer: u32, physics: &PhysicsConfig) -> bool {
    run_timer >= physics.max_run_timer
}

/// Add gravity and clamp to terminal speed.
pub fn apply_gravity(body: &mut Body, gravity: f32, terminal: f32) {
    body.velocity.y = (body.velocity.y + gravity).min(terminal);
}

/// Constants for one player's integration step.
#[derive(Debug, Clone, Copy)]
pub struct PlayerMotion<'a> {
    /// Character acceleration and jump height
    pub profile: CharacterProfile,
    /// Shared movement constants
    pub physics: &'a PhysicsConfig,
    /// Medium scaling for the level
    pub medium: MediumScale,
}

/// Step one speed component towards `cap` in direction `dir`.
fn accelerate(vx: f32, dir: f32, acc: f32, cap: f32) -> f32 {
    let along = vx * dir;
    let next = if along > cap {
        (along - acc).max(cap)
    } else {
        (along + acc).min(cap)
    };
    next * dir
}

/// Move `vx` towards zero by `step` without crossing it.
fn bleed(vx: f32, step: f32) -> f32 {
    if vx > 0.0 {
        (vx - step).max(0.0)
    } else {
        (vx + step).min(0.0)
    }
}

/// Integrate one frame of player input into velocity.
///
/// Pass `InputFrame::default()` when controls are frozen.
pub fn step_player(body: &mut Body, motion: &mut MotionState, input: &InputFrame, params: &PlayerMotion<'_>) {
    let physics = params.physics;
    let acc = params.profile.acceleration;
    let dir = input.horizontal();

    if body.on_ground {
        motion.crouching = input.holds(Buttons::DOWN);
    }

    let pspeed = pspeed_active(body.timers.run, physics);
    let cap = if !input.holds(Buttons::RUN) {
        physics.walk_speed
    } else if pspeed {
        physics.pspeed_speed
    } else {
        physics.run_speed
    };

    // ===== Horizontal =====
    let mut vx = body.velocity.x;
    if body.on_ground && !motion.crouching {
        if dir == 0.0 {
            vx = if vx.abs() <= physics.min_speed_x {
                0.0
            } else {
                vx * (1.0 - acc)
            };
        } else {
            vx = accelerate(vx, dir, acc, cap);
            body.facing = Facing::from_sign(dir);
        }
    } else {
        if body.on_ground {
            vx = bleed(vx, acc);
        }
        if dir != 0.0 {
            if vx * dir < 0.0 {
                vx += dir * acc;
            }
            vx = accelerate(vx, dir, acc, cap);
        }
    }
    vx = vx.clamp(-physics.pspeed_speed, physics.pspeed_speed);
    body.velocity.x = vx;

    let skidding = body.on_ground && !motion.crouching && vx != 0.0 && vx * body.facing.sign() < 0.0;
    body.timers.skid = if skidding { body.timers.skid + 1 } else { 0 };

    if body.on_ground {
        body.timers.run = if vx.abs() >= physics.run_speed {
            (body.timers.run + 1).min(physics.max_run_timer)
        } else {
            body.timers.run.saturating_sub(1)
        };
    } else if !pspeed {
        body.timers.run = body.timers.run.saturating_sub(1);
    }

    // ===== Vertical =====
    let min_jump = physics.min_jump * params.medium.impulse;
    let max_jump = params.profile.max_jump * params.medium.impulse;
    let mut vy = body.velocity.y;
    if motion.swimming {
        if input.pressed(Buttons::JUMP) {
            vy = -max_jump;
        }
        motion.jump_active = false;
        body.timers.jump_hold = 0;
    } else if body.on_ground && input.pressed(Buttons::JUMP) {
        vy = -min_jump;
        motion.jump_active = true;
        body.timers.jump_hold = 1;
    } else if input.holds(Buttons::JUMP)
        && motion.jump_active
        && body.timers.jump_hold < physics.jump_hold_frames
    {
        vy = (vy - max_jump).max(-max_jump);
        body.timers.jump_hold += 1;
    } else if !input.holds(Buttons::JUMP) {
        motion.jump_active = false;
        body.timers.jump_hold = 0;
    }

    let gravity = physics.gravity * params.medium.gravity;
    let fast_fall = vy > 0.0 && !input.holds(Buttons::JUMP) && !motion.swimming;
    body.velocity.y = vy;
    apply_gravity(
        body,
        if fast_fall { gravity * 2.0 } else { gravity },
        params.medium.terminal_fall,
    );
    debug_assert!(body.velocity.is_finite());
}
