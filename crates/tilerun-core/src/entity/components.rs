//! Component structs shared by every actor, plus the player's components.
//!
//! Each actor kind embeds a [`Body`]: the box, velocity and timers the
//! kinematics integrator and the tile sweep operate on. Kind-specific
//! components live next to their behaviour ([`crate::enemy`],
//! [`crate::item`], [`crate::projectile`]).

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tilegrid::{Aabb, TileSet};

use crate::animation::AnimationFrame;
use crate::collision;
use crate::config::Character;
use crate::input::{Buttons, InputFrame};
use crate::kinematics::hitbox;
use crate::pipe::PipeTransit;
use crate::power::{PowerState, PowerTier};

/// Horizontal facing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Towards -x
    Left,
    /// Towards +x
    #[default]
    Right,
}

impl Facing {
    /// -1 for left, 1 for right.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// Facing for a direction sign. Zero faces right.
    #[must_use]
    pub fn from_sign(sign: f32) -> Self {
        if sign < 0.0 {
            Self::Left
        } else {
            Self::Right
        }
    }

    /// The opposite facing.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Per-actor frame counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyTimers {
    /// Frames spent off the ground
    pub fall: u32,
    /// Frames the current jump has been driven upward; 0 when not jumping
    pub jump_hold: u32,
    /// Frames spent skidding
    pub skid: u32,
    /// P-speed charge, 0..=`max_run_timer`
    pub run: u32,
}

/// Physical state shared by all actors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    /// Bounding box
    pub bounds: Aabb,
    /// Velocity in units per frame (+y is down)
    pub velocity: Vec2,
    /// Facing
    pub facing: Facing,
    /// Standing on a top-collidable edge
    pub on_ground: bool,
    /// Frame counters
    pub timers: BodyTimers,
    /// Actual displacement during the last tile sweep
    pub displacement: Vec2,
    /// Whether tiles block this body
    pub solid: bool,
}

impl Body {
    /// A resting, airborne body occupying `bounds`.
    #[must_use]
    pub fn new(bounds: Aabb) -> Self {
        Self {
            bounds,
            velocity: Vec2::ZERO,
            facing: Facing::Right,
            on_ground: false,
            timers: BodyTimers::default(),
            displacement: Vec2::ZERO,
            solid: true,
        }
    }

    /// Box at the start of the last sweep.
    #[must_use]
    pub fn previous_bounds(&self) -> Aabb {
        self.bounds.translated(-self.displacement)
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::new(Aabb::new(0.0, 0.0, 16.0, 16.0))
    }
}

/// Player motion modes set by input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionState {
    /// Ducking; follows input while grounded and is held by a low ceiling
    pub crouching: bool,
    /// A jump started on the ground is still being driven
    pub jump_active: bool,
    /// In an underwater level
    pub swimming: bool,
}

/// Components for player entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerComponents {
    /// Shared actor state
    pub body: Body,
    /// Controller slot; index into the per-step input slice
    pub slot: usize,
    /// Physics profile
    pub character: Character,
    /// Power-state machine
    pub power: PowerState,
    /// Remaining lives
    pub lives: u32,
    /// Score
    pub score: u64,
    /// Coins towards the next extra life
    pub coins: u32,
    /// Whether input is applied
    pub controls_enabled: bool,
    /// Latched input for the current frame
    pub input: InputFrame,
    /// Buttons held on the previous frame
    pub prev_buttons: Buttons,
    /// Crouch/jump/swim modes
    pub motion: MotionState,
    /// In-flight pipe transfer
    pub pipe: Option<PipeTransit>,
    /// Stomps chained without touching the ground
    pub stomp_combo: u32,
    /// Enemies shot during the current star
    pub star_combo: u32,
    /// Frames left in the fire-throw pose
    pub fire_pose: u32,
    /// Walk/run cycle clock
    pub anim_clock: f32,
    /// Frame selected at the end of the last step
    pub frame: AnimationFrame,
    /// Crossed the goal line
    pub cleared: bool,
}

impl PlayerComponents {
    /// A small player standing with its bottom-left corner at `feet`.
    #[must_use]
    pub fn spawn(slot: usize, character: Character, feet: Vec2, lives: u32) -> Self {
        let size = hitbox(PowerTier::Small, false);
        Self {
            body: Body::new(Aabb::new(feet.x, feet.y - size.y, size.x, size.y)),
            slot,
            character,
            power: PowerState::new(PowerTier::Small),
            lives,
            score: 0,
            coins: 0,
            controls_enabled: true,
            input: InputFrame::default(),
            prev_buttons: Buttons::empty(),
            motion: MotionState::default(),
            pipe: None,
            stomp_combo: 0,
            star_combo: 0,
            fire_pose: 0,
            anim_clock: 0.0,
            frame: AnimationFrame::default(),
            cleared: false,
        }
    }

    /// Whether the player takes part in actor contacts this frame.
    #[must_use]
    pub fn is_tangible(&self) -> bool {
        !self.power.is_dead() && self.pipe.is_none() && !self.cleared
    }

    /// Refit the hitbox to the displayed tier and crouch state, keeping the feet planted.
    ///
    /// A box that would grow into a ceiling is refused. The player is held
    /// crouched instead, or keeps its current box when even that does not fit.
    /// Players inside a pipe are refit without looking at tiles.
    pub fn refit_hitbox(&mut self, tiles: &TileSet) {
        let tier = self.power.display_tier();
        let current = self.body.bounds;
        let candidates = [
            (self.motion.crouching, hitbox(tier, self.motion.crouching)),
            (true, hitbox(tier, true)),
        ];
        for (crouching, size) in candidates {
            if size == current.size {
                self.motion.crouching = crouching;
                return;
            }
            let mut grown = current;
            grown.resize_from_bottom(size);
            if size.y <= current.height() || self.pipe.is_some() || !collision::hits_ceiling(&grown, tiles) {
                self.motion.crouching = crouching;
                self.body.bounds = grown;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facing_signs() {
        assert_eq!(Facing::Left.sign(), -1.0);
        assert_eq!(Facing::Right.sign(), 1.0);
        assert_eq!(Facing::from_sign(-3.0), Facing::Left);
        assert_eq!(Facing::from_sign(0.0), Facing::Right);
        assert_eq!(Facing::Left.flipped(), Facing::Right);
    }

    #[test]
    fn previous_bounds_undoes_displacement() {
        let mut body = Body::new(Aabb::new(10.0, 20.0, 16.0, 16.0));
        body.bounds = body.bounds.translated(Vec2::new(3.0, -2.0));
        body.displacement = Vec2::new(3.0, -2.0);
        assert_eq!(body.previous_bounds().min, Vec2::new(10.0, 20.0));
    }

    #[test]
    fn player_spawns_small_on_feet() {
        let player = PlayerComponents::spawn(0, Character::Mario, Vec2::new(32.0, 192.0), 3);
        assert_eq!(player.body.bounds.bottom(), 192.0);
        assert_eq!(player.body.bounds.height(), 16.0);
        assert_eq!(player.power.tier(), PowerTier::Small);
        assert!(player.is_tangible());
    }

    mod refit_tests {
        use super::*;
        use glam::IVec2;
        use tilegrid::Tile;

        fn ceiling_over(cell: IVec2) -> TileSet {
            let mut tiles = TileSet::new();
            tiles.insert(Tile::solid(cell)).unwrap();
            tiles
        }

        fn big(player: &mut PlayerComponents) {
            player.power = PowerState::new(PowerTier::Big);
        }

        #[test]
        fn grows_in_open_space() {
            let mut player = PlayerComponents::spawn(0, Character::Mario, Vec2::new(32.0, 192.0), 3);
            big(&mut player);
            player.refit_hitbox(&TileSet::new());
            assert_eq!(player.body.bounds, Aabb::new(32.0, 160.0, 16.0, 32.0));
            assert!(!player.motion.crouching);
        }

        #[test]
        fn blocked_growth_crouches() {
            // Tile (2, 10) spans y 160..176, right above the small player's head
            let tiles = ceiling_over(IVec2::new(2, 10));
            let mut player = PlayerComponents::spawn(0, Character::Mario, Vec2::new(32.0, 192.0), 3);
            big(&mut player);
            player.refit_hitbox(&tiles);
            assert_eq!(player.body.bounds, Aabb::new(32.0, 176.0, 16.0, 16.0));
            assert!(player.motion.crouching);
        }

        #[test]
        fn crouched_player_stays_down_under_a_ceiling() {
            let tiles = ceiling_over(IVec2::new(2, 10));
            let mut player = PlayerComponents::spawn(0, Character::Mario, Vec2::new(32.0, 192.0), 3);
            big(&mut player);
            player.motion.crouching = true;
            player.refit_hitbox(&tiles);
            player.motion.crouching = false;
            player.refit_hitbox(&tiles);
            assert!(player.motion.crouching);
            assert_eq!(player.body.bounds.height(), 16.0);
        }

        #[test]
        fn platforms_overhead_do_not_block() {
            let mut tiles = TileSet::new();
            tiles
                .insert(Tile::new(IVec2::new(2, 10), tilegrid::TileMaterial::Platform))
                .unwrap();
            let mut player = PlayerComponents::spawn(0, Character::Mario, Vec2::new(32.0, 192.0), 3);
            big(&mut player);
            player.refit_hitbox(&tiles);
            assert_eq!(player.body.bounds.height(), 32.0);
        }

        #[test]
        fn shrinking_is_never_refused() {
            let tiles = ceiling_over(IVec2::new(2, 10));
            let mut player = PlayerComponents::spawn(0, Character::Mario, Vec2::new(32.0, 192.0), 3);
            player.body.bounds = Aabb::new(32.0, 160.0, 16.0, 32.0);
            player.refit_hitbox(&tiles);
            assert_eq!(player.body.bounds, Aabb::new(32.0, 176.0, 16.0, 16.0));
        }
    }

    #[test]
    fn player_roundtrips_through_json() {
        let player = PlayerComponents::spawn(1, Character::Luigi, Vec2::new(0.0, 64.0), 5);
        let json = serde_json::to_string(&player).unwrap();
        let back: PlayerComponents = serde_json::from_str(&json).unwrap();
        assert_eq!(player, back);
    }
}
