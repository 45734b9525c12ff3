//! Simulation tunables.
//!
//! Everything numeric the simulation reads lives in [`SimConfig`]. A config is
//! read once when a level is built and stays constant for that level. Every
//! section is `#[serde(default)]`, so a JSON file only needs the keys it
//! overrides.
//!
//! ```
//! use tilerun_core::config::SimConfig;
//!
//! let config = SimConfig::from_json(r#"{ "nitpicks": { "low_gravity": true } }"#).unwrap();
//! assert!(config.nitpicks.low_gravity);
//! assert_eq!(config.physics.walk_speed, 2.5);
//! ```

use std::f32::consts::PI;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ConfigError;

// =============================================================================
// Physics
// =============================================================================

/// Gravity/impulse scaling applied in a special medium.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediumScale {
    /// Multiplier on gravity
    pub gravity: f32,
    /// Multiplier on jump and swim impulses
    pub impulse: f32,
    /// Terminal fall speed in the medium
    pub terminal_fall: f32,
}

impl MediumScale {
    /// No scaling.
    pub const NORMAL: Self = Self {
        gravity: 1.0,
        impulse: 1.0,
        terminal_fall: 6.0,
    };
}

/// Movement constants, in world units per frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Speed cap while walking
    pub walk_speed: f32,
    /// Speed cap while holding run
    pub run_speed: f32,
    /// Speed cap once p-speed is active
    pub pspeed_speed: f32,
    /// Below this magnitude ground friction snaps speed to zero
    pub min_speed_x: f32,
    /// Gravity added every frame
    pub gravity: f32,
    /// Upward impulse on jump press
    pub min_jump: f32,
    /// Frames the jump can be sustained while held
    pub jump_hold_frames: u32,
    /// Frames at run speed needed to reach p-speed
    pub max_run_timer: u32,
    /// Terminal fall speed
    pub terminal_fall: f32,
    /// Upward speed after stomping an enemy
    pub stomp_bounce: f32,
    /// Upward speed of the death hop
    pub death_hop: f32,
    /// Largest horizontal overlap rescued by the corner nudge
    pub corner_rescue: f32,
    /// Frames off the ground before airborne poses are shown
    pub fall_grace_frames: u32,
    /// Scaling while swimming
    pub underwater: MediumScale,
    /// Scaling in low-gravity mode
    pub low_gravity: MediumScale,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            walk_speed: 2.5,
            run_speed: 4.0,
            pspeed_speed: 4.5,
            min_speed_x: PI / 10.0,
            gravity: 0.25,
            min_jump: 1.0,
            jump_hold_frames: 10,
            max_run_timer: 75,
            terminal_fall: 6.0,
            stomp_bounce: 4.0,
            death_hop: 5.0,
            corner_rescue: 4.0,
            fall_grace_frames: 4,
            underwater: MediumScale {
                gravity: 0.4,
                impulse: 0.6,
                terminal_fall: 2.0,
            },
            low_gravity: MediumScale {
                gravity: 0.5,
                impulse: 0.8,
                terminal_fall: 6.0,
            },
        }
    }
}

/// Behaviour toggles that change the feel of the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Nitpicks {
    /// Damage sends a fire player straight to small
    pub classic_powerdown: bool,
    /// Treat every level as underwater
    pub always_underwater: bool,
    /// Reduced gravity and impulses
    pub low_gravity: bool,
    /// Mushrooms become fire flowers for players who are already big
    pub progressive_powerups: bool,
}

impl Default for Nitpicks {
    fn default() -> Self {
        Self {
            classic_powerdown: false,
            always_underwater: false,
            low_gravity: false,
            progressive_powerups: true,
        }
    }
}

/// Lengths of timed states, in frames unless noted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Durations {
    /// Entries in a grow/shrink flicker queue
    pub transform_queue_len: usize,
    /// Frames each queue entry is shown
    pub transform_step_frames: u32,
    /// Invulnerability after shrinking
    pub hurt_invulnerable_frames: u32,
    /// Star invulnerability, in seconds
    pub star_seconds: f32,
    /// How long a flattened enemy lingers
    pub stomped_frames: u32,
    /// How long an idle shell waits before walking again
    pub shell_wake_frames: u32,
    /// Frames a kicked shell ignores its kicker
    pub kick_grace_frames: u32,
    /// Frames to slide into or out of a pipe
    pub pipe_frames: u32,
    /// Frames the throw pose is held after firing
    pub fire_pose_frames: u32,
    /// Frames of the death arc before the outcome is decided
    pub death_frames: u32,
    /// Frames an item takes to rise out of its block
    pub item_emerge_frames: u32,
}

impl Default for Durations {
    fn default() -> Self {
        Self {
            transform_queue_len: 7,
            transform_step_frames: 4,
            hurt_invulnerable_frames: 120,
            star_seconds: 10.0,
            stomped_frames: 30,
            shell_wake_frames: 300,
            kick_grace_frames: 8,
            pipe_frames: 32,
            fire_pose_frames: 8,
            death_frames: 150,
            item_emerge_frames: 16,
        }
    }
}

/// Fireball tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireballConfig {
    /// Horizontal speed
    pub speed: f32,
    /// Gravity
    pub gravity: f32,
    /// Upward speed after touching a floor
    pub bounce: f32,
    /// Frames before the fireball burns out
    pub lifetime_frames: u32,
    /// Live fireballs allowed per player
    pub max_per_player: usize,
}

impl Default for FireballConfig {
    fn default() -> Self {
        Self {
            speed: 5.0,
            gravity: 0.4,
            bounce: 3.0,
            lifetime_frames: 180,
            max_per_player: 2,
        }
    }
}

/// Enemy and item motion tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorConfig {
    /// Walking enemy speed
    pub patrol_speed: f32,
    /// Kicked shell speed
    pub shell_speed: f32,
    /// Upward speed when an enemy is shot
    pub shot_hop: f32,
    /// Sideways speed when an enemy is shot
    pub shot_push: f32,
    /// Walking item speed (mushroom, 1-up)
    pub item_speed: f32,
    /// Upward speed of a bouncing star
    pub star_bounce: f32,
    /// Upward speed given to items on a bumped tile
    pub item_hop: f32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            patrol_speed: 0.5,
            shell_speed: 4.0,
            shot_hop: 3.0,
            shot_push: 1.0,
            item_speed: 1.0,
            star_bounce: 4.0,
            item_hop: 3.0,
        }
    }
}

/// Points and extra lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Points per coin
    pub coin: u32,
    /// Points per power-up collected
    pub power_up: u32,
    /// Points for kicking a shell
    pub kick: u32,
    /// Coins that buy an extra life
    pub coins_per_life: u32,
    /// Lives each player starts with
    pub starting_lives: u32,
    /// Chained kill awards; steps past the end grant a life
    pub combo: Vec<u32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            coin: 200,
            power_up: 1000,
            kick: 400,
            coins_per_life: 100,
            starting_lives: 3,
            combo: vec![100, 200, 400, 500, 800, 1000, 2000, 4000, 5000, 8000],
        }
    }
}

/// What a combo step is worth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComboAward {
    /// Points
    Points(u32),
    /// An extra life
    ExtraLife,
}

impl ScoringConfig {
    /// Award for the `step`-th kill in a chain (0-based).
    #[must_use]
    pub fn combo_award(&self, step: u32) -> ComboAward {
        self.combo
            .get(step as usize)
            .map_or(ComboAward::ExtraLife, |&points| ComboAward::Points(points))
    }
}

// =============================================================================
// Characters
// =============================================================================

/// Playable character. Characters differ in acceleration and jump height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Character {
    /// Balanced
    #[default]
    Mario,
    /// Floaty: slow to accelerate, jumps higher
    Luigi,
    /// Quick to accelerate
    YellowToad,
    /// Quickest to accelerate
    BlueToad,
}

/// Per-character movement constants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterProfile {
    /// Horizontal acceleration and friction factor
    pub acceleration: f32,
    /// Sustained jump speed
    pub max_jump: f32,
}

impl Character {
    /// All characters in slot order.
    pub const ALL: [Character; 4] = [
        Character::Mario,
        Character::Luigi,
        Character::YellowToad,
        Character::BlueToad,
    ];

    /// Movement constants for this character.
    #[must_use]
    pub const fn profile(self) -> CharacterProfile {
        match self {
            Character::Mario => CharacterProfile {
                acceleration: 0.1,
                max_jump: 4.0,
            },
            Character::Luigi => CharacterProfile {
                acceleration: 0.05,
                max_jump: 5.0,
            },
            Character::YellowToad => CharacterProfile {
                acceleration: 0.2,
                max_jump: 4.0,
            },
            Character::BlueToad => CharacterProfile {
                acceleration: 0.25,
                max_jump: 4.0,
            },
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mario => write!(f, "mario"),
            Self::Luigi => write!(f, "luigi"),
            Self::YellowToad => write!(f, "yellowtoad"),
            Self::BlueToad => write!(f, "bluetoad"),
        }
    }
}

// =============================================================================
// SimConfig
// =============================================================================

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed steps per second
    pub frame_rate: u32,
    /// Movement constants
    pub physics: PhysicsConfig,
    /// Behaviour toggles
    pub nitpicks: Nitpicks,
    /// Timed state lengths
    pub durations: Durations,
    /// Fireball tunables
    pub fireball: FireballConfig,
    /// Enemy and item motion
    pub actors: ActorConfig,
    /// Points and lives
    pub scoring: ScoringConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            frame_rate: 60,
            physics: PhysicsConfig::default(),
            nitpicks: Nitpicks::default(),
            durations: Durations::default(),
            fireball: FireballConfig::default(),
            actors: ActorConfig::default(),
            scoring: ScoringConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed JSON and
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise the
    /// errors of [`from_json`](Self::from_json).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Load a config file, falling back to defaults on any failure.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => {
                debug!(path = %path.display(), "loaded simulation config");
                config
            }
            Err(e) => {
                warn!("Failed to load {}: {e}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Check that every tunable is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let physics = &self.physics;
        if self.frame_rate == 0 {
            return Err(invalid("frame_rate", "must be positive"));
        }
        if !(physics.walk_speed > 0.0
            && physics.walk_speed <= physics.run_speed
            && physics.run_speed <= physics.pspeed_speed)
        {
            return Err(invalid(
                "physics.walk_speed",
                "speeds must satisfy 0 < walk <= run <= pspeed",
            ));
        }
        if physics.gravity <= 0.0 || physics.terminal_fall <= 0.0 {
            return Err(invalid(
                "physics.gravity",
                "gravity and terminal fall must be positive",
            ));
        }
        if physics.max_run_timer == 0 {
            return Err(invalid("physics.max_run_timer", "must be positive"));
        }
        if self.durations.transform_queue_len % 2 == 0 {
            return Err(invalid(
                "durations.transform_queue_len",
                "must be odd so the queue ends on the target tier",
            ));
        }
        if self.durations.transform_step_frames == 0 {
            return Err(invalid("durations.transform_step_frames", "must be positive"));
        }
        if self.scoring.combo.is_empty() {
            return Err(invalid("scoring.combo", "needs at least one step"));
        }
        if self.scoring.coins_per_life == 0 {
            return Err(invalid("scoring.coins_per_life", "must be positive"));
        }
        Ok(())
    }

    /// Star invulnerability length in frames.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn star_frames(&self) -> u32 {
        (self.durations.star_seconds.max(0.0) * self.frame_rate as f32).round() as u32
    }

    /// Medium scaling for a level.
    #[must_use]
    pub fn medium(&self, underwater: bool) -> MediumScale {
        if underwater || self.nitpicks.always_underwater {
            self.physics.underwater
        } else if self.nitpicks.low_gravity {
            self.physics.low_gravity
        } else {
            MediumScale {
                terminal_fall: self.physics.terminal_fall,
                ..MediumScale::NORMAL
            }
        }
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}
