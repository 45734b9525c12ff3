//! Animation selection.
//!
//! [`select`] is a pure function from a player's physical state to a cell in
//! the sprite sheet. Rows are power tiers; columns are poses:
//!
//! | column | pose |
//! |---|---|
//! | 0 | idle |
//! | 1, 2 | crouch, crouch while airborne |
//! | 3..=8 | walk cycle |
//! | 9 | skid |
//! | 10, 11 | jump, fall |
//! | 12..=14 | p-speed run cycle |
//! | 15, 16 | p-speed jump, p-speed fall |
//! | 17 | fire throw |
//! | 18 | dead |
//! | 19..=22 | swim cycle |
//!
//! When several conditions hold at once the pose is picked in this order:
//! dead, crouching, fire throw, skidding, rising, falling, idle, walking.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::entity::Facing;
use crate::power::PowerTier;

const IDLE: u8 = 0;
const CROUCH: u8 = 1;
const CROUCH_FALL: u8 = 2;
const WALK_START: u8 = 3;
const WALK_FRAMES: u8 = 6;
const SKID: u8 = 9;
const JUMP: u8 = 10;
const FALL: u8 = 11;
const RUN_START: u8 = 12;
const RUN_FRAMES: u8 = 3;
const PSPEED_JUMP: u8 = 15;
const PSPEED_FALL: u8 = 16;
const FIRE_THROW: u8 = 17;
const DEAD: u8 = 18;
const SWIM_START: u8 = 19;
const SWIM_FRAMES: u8 = 4;

/// Clock units per walk/run frame.
const CLOCK_PER_FRAME: f32 = 6.0;
/// Divisor from horizontal speed to clock units.
const CLOCK_SPEED_DIVISOR: f32 = 1.25;

/// Pose chosen by the selector, before it is mapped to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Pose {
    /// Standing still
    #[default]
    Idle,
    /// Walk or run cycle
    Walk,
    /// Turning around against momentum
    Skid,
    /// Moving up through the air
    Rising,
    /// Moving down through the air
    Falling,
    /// Swimming stroke
    Swim,
    /// Ducking
    Crouch,
    /// Throwing a fireball
    FireThrow,
    /// Death arc
    Dead,
}

/// Everything the selector looks at.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AnimationInput {
    /// Tier to draw (the flicker queue's tier during transformations)
    pub tier: PowerTier,
    /// Player is dead
    pub dead: bool,
    /// Player is crouching
    pub crouching: bool,
    /// Throw pose is active
    pub fire_pose: bool,
    /// Standing on something
    pub on_ground: bool,
    /// Frames since last grounded
    pub fall_frames: u32,
    /// Frames off the ground before airborne poses kick in
    pub fall_grace: u32,
    /// Current velocity
    pub velocity: Vec2,
    /// Facing direction
    pub facing: Facing,
    /// Level is underwater
    pub swimming: bool,
    /// P-speed is active
    pub pspeed: bool,
    /// Walk cycle clock
    pub clock: f32,
    /// Post-damage invulnerability left
    pub hurt_frames: u32,
    /// Star power left
    pub star_frames: u32,
    /// Simulation tick
    pub tick: u64,
}

/// A cell of the sprite sheet plus draw flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnimationFrame {
    /// Sheet row: the drawn power tier
    pub row: u8,
    /// Sheet column
    pub column: u8,
    /// Selected pose
    pub pose: Pose,
    /// Mirror horizontally (facing left)
    pub flip: bool,
    /// False on the hidden half of the damage flicker
    pub visible: bool,
    /// 0 for the normal palette, 1..=4 while star power cycles colours
    pub palette: u8,
}

impl AnimationInput {
    fn airborne(&self) -> bool {
        !self.on_ground && (self.velocity.y < 0.0 || self.fall_frames > self.fall_grace)
    }

    fn skidding(&self) -> bool {
        self.on_ground && self.velocity.x != 0.0 && self.velocity.x * self.facing.sign() < 0.0
    }
}

/// Pick the pose by priority.
#[must_use]
pub fn select_pose(input: &AnimationInput) -> Pose {
    if input.dead {
        Pose::Dead
    } else if input.crouching {
        Pose::Crouch
    } else if input.fire_pose {
        Pose::FireThrow
    } else if input.skidding() {
        Pose::Skid
    } else if input.airborne() && input.swimming {
        Pose::Swim
    } else if input.airborne() && input.velocity.y < 0.0 {
        Pose::Rising
    } else if input.airborne() {
        Pose::Falling
    } else if input.velocity.x == 0.0 {
        Pose::Idle
    } else {
        Pose::Walk
    }
}

/// Map the current state to a sprite-sheet cell.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn select(input: &AnimationInput) -> AnimationFrame {
    let pose = select_pose(input);
    let cycle = (input.clock.max(0.0) / CLOCK_PER_FRAME) as u32;

    let column = match pose {
        Pose::Dead => DEAD,
        Pose::Crouch if input.airborne() => CROUCH_FALL,
        Pose::Crouch => CROUCH,
        Pose::FireThrow => FIRE_THROW,
        Pose::Skid => SKID,
        Pose::Swim => SWIM_START + ((input.tick / 8) % u64::from(SWIM_FRAMES)) as u8,
        Pose::Rising if input.pspeed => PSPEED_JUMP,
        Pose::Rising => JUMP,
        Pose::Falling if input.pspeed => PSPEED_FALL,
        Pose::Falling => FALL,
        Pose::Idle => IDLE,
        Pose::Walk if input.pspeed => RUN_START + (cycle % u32::from(RUN_FRAMES)) as u8,
        Pose::Walk => WALK_START + (cycle % u32::from(WALK_FRAMES)) as u8,
    };

    let visible = input.dead || input.hurt_frames == 0 || (input.hurt_frames / 2) % 2 == 0;
    let palette = if input.star_frames > 0 {
        1 + ((input.tick / 2) % 4) as u8
    } else {
        0
    };

    AnimationFrame {
        row: input.tier.index(),
        column,
        pose,
        flip: input.facing == Facing::Left,
        visible,
        palette,
    }
}

/// Advance the walk cycle clock by the distance covered this frame.
#[must_use]
pub fn advance_clock(clock: f32, speed_x: f32) -> f32 {
    let next = clock + speed_x.abs() / CLOCK_SPEED_DIVISOR;
    // Keep the clock bounded; a full walk cycle is a multiple of every cycle length
    next % (CLOCK_PER_FRAME * 12.0)
}

/// Frame of the p-meter HUD gauge (0..=7).
///
/// While p-speed is active the gauge flashes between its last two frames
/// every 6 frames.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn power_meter_frame(run_timer: u32, pspeed: bool, tick: u64) -> u8 {
    if pspeed {
        if (tick / 6) % 2 == 0 {
            7
        } else {
            6
        }
    } else {
        (run_timer / 10).min(7) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grounded() -> AnimationInput {
        AnimationInput {
            on_ground: true,
            fall_grace: 4,
            ..AnimationInput::default()
        }
    }

    mod priority_tests {
        use super::*;

        #[test]
        fn dead_beats_everything() {
            let input = AnimationInput {
                dead: true,
                crouching: true,
                fire_pose: true,
                velocity: Vec2::new(3.0, -2.0),
                ..grounded()
            };
            assert_eq!(select(&input).column, DEAD);
        }

        #[test]
        fn crouching_while_falling_uses_crouch_fall() {
            let input = AnimationInput {
                crouching: true,
                on_ground: false,
                fall_frames: 10,
                velocity: Vec2::new(0.0, 2.0),
                ..grounded()
            };
            let frame = select(&input);
            assert_eq!(frame.pose, Pose::Crouch);
            assert_eq!(frame.column, CROUCH_FALL);
        }

        #[test]
        fn fire_pose_beats_skid() {
            let input = AnimationInput {
                fire_pose: true,
                velocity: Vec2::new(2.0, 0.0),
                facing: Facing::Left,
                ..grounded()
            };
            assert_eq!(select_pose(&input), Pose::FireThrow);
        }

        #[test]
        fn skid_when_moving_against_facing() {
            let input = AnimationInput {
                velocity: Vec2::new(2.0, 0.0),
                facing: Facing::Left,
                ..grounded()
            };
            let frame = select(&input);
            assert_eq!(frame.column, SKID);
            assert!(frame.flip);
        }

        #[test]
        fn rising_then_falling() {
            let rising = AnimationInput {
                on_ground: false,
                velocity: Vec2::new(1.0, -3.0),
                ..grounded()
            };
            assert_eq!(select(&rising).column, JUMP);

            let falling = AnimationInput {
                on_ground: false,
                fall_frames: 5,
                velocity: Vec2::new(1.0, 1.0),
                ..grounded()
            };
            assert_eq!(select(&falling).column, FALL);

            let pspeed_fall = AnimationInput {
                pspeed: true,
                ..falling
            };
            assert_eq!(select(&pspeed_fall).column, PSPEED_FALL);
        }

        #[test]
        fn fall_grace_keeps_ground_pose() {
            let input = AnimationInput {
                on_ground: false,
                fall_frames: 3,
                velocity: Vec2::new(0.0, 0.5),
                ..grounded()
            };
            assert_eq!(select_pose(&input), Pose::Idle);
        }

        #[test]
        fn swimming_replaces_air_poses() {
            let input = AnimationInput {
                on_ground: false,
                swimming: true,
                velocity: Vec2::new(0.0, -1.0),
                ..grounded()
            };
            let column = select(&input).column;
            assert!((SWIM_START..SWIM_START + SWIM_FRAMES).contains(&column));
        }
    }

    mod cycle_tests {
        use super::*;

        #[test]
        fn walk_cycle_advances_with_clock() {
            let mut input = AnimationInput {
                velocity: Vec2::new(2.5, 0.0),
                ..grounded()
            };
            assert_eq!(select(&input).column, WALK_START);
            input.clock = 6.0;
            assert_eq!(select(&input).column, WALK_START + 1);
            input.clock = 36.0;
            assert_eq!(select(&input).column, WALK_START);
        }

        #[test]
        fn run_cycle_at_pspeed() {
            let input = AnimationInput {
                velocity: Vec2::new(4.5, 0.0),
                pspeed: true,
                clock: 12.0,
                ..grounded()
            };
            assert_eq!(select(&input).column, RUN_START + 2);
        }

        #[test]
        fn clock_advance() {
            assert_eq!(advance_clock(0.0, -2.5), 2.0);
        }
    }

    mod flag_tests {
        use super::*;

        #[test]
        fn hurt_flicker_hides_alternate_windows() {
            let visible: Vec<bool> = (1..=8)
                .map(|hurt_frames| {
                    select(&AnimationInput {
                        hurt_frames,
                        ..grounded()
                    })
                    .visible
                })
                .collect();
            assert_eq!(
                visible,
                vec![true, false, false, true, true, false, false, true]
            );
        }

        #[test]
        fn star_cycles_palette() {
            let palettes: Vec<u8> = (0..8)
                .map(|tick| {
                    select(&AnimationInput {
                        star_frames: 100,
                        tick,
                        ..grounded()
                    })
                    .palette
                })
                .collect();
            assert_eq!(palettes, vec![1, 1, 2, 2, 3, 3, 4, 4]);
        }

        #[test]
        fn row_follows_tier() {
            let input = AnimationInput {
                tier: PowerTier::Fire,
                ..grounded()
            };
            assert_eq!(select(&input).row, 2);
        }
    }

    #[test]
    fn power_meter() {
        assert_eq!(power_meter_frame(0, false, 0), 0);
        assert_eq!(power_meter_frame(35, false, 0), 3);
        assert_eq!(power_meter_frame(75, false, 0), 7);
        assert_eq!(power_meter_frame(75, true, 0), 7);
        assert_eq!(power_meter_frame(75, true, 6), 6);
    }
}
