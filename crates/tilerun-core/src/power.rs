//! Power-state machine.
//!
//! A player's committed tier only changes when a size-change queue drains.
//! While a queue runs the player is frozen and every new transition request is
//! refused.
//!
//! ```text
//!            Mushroom / FireFlower            queue drained
//!   Normal ──────────────────────> Transforming ────────────> Normal (tier up)
//!     │  damage (big/fire)                    queue drained
//!     ├──────────────────────────> Shrinking ───────────────> Normal (tier down)
//!     │  damage (small) / pit
//!     └──────────────────────────> Dead
//! ```
//!
//! Star invulnerability and post-damage invulnerability are timers that run
//! alongside the phase.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;

/// Size/ability level. Ordering follows strength.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum PowerTier {
    /// Tier 0
    #[default]
    Small,
    /// Tier 1
    Big,
    /// Tier 2
    Fire,
}

impl PowerTier {
    /// Numeric tier in `0..=2`.
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Small => 0,
            Self::Big => 1,
            Self::Fire => 2,
        }
    }

    /// Whether bumps from this tier shatter bricks.
    #[must_use]
    pub const fn is_strong(self) -> bool {
        !matches!(self, Self::Small)
    }
}

/// Pickups that act on the power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerUp {
    /// Grow
    Mushroom,
    /// Gain fire
    FireFlower,
    /// Star invulnerability
    Star,
}

/// Flicker queue of alternating tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeQueue {
    entries: VecDeque<PowerTier>,
    from: PowerTier,
    to: PowerTier,
    frame: u32,
}

impl SizeQueue {
    fn new(from: PowerTier, to: PowerTier, len: usize) -> Self {
        let entries = (0..len)
            .map(|i| if i % 2 == 0 { to } else { from })
            .collect();
        Self {
            entries,
            from,
            to,
            frame: 0,
        }
    }

    /// Tier currently shown.
    #[must_use]
    pub fn front(&self) -> PowerTier {
        self.entries.front().copied().unwrap_or(self.to)
    }

    /// Entries left to show.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.entries.len()
    }

    /// Tier committed once the queue drains.
    #[must_use]
    pub fn target(&self) -> PowerTier {
        self.to
    }
}

/// Phase of the power-state machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerPhase {
    /// Accepting transitions.
    Normal,
    /// Growing through a queue.
    Transforming(SizeQueue),
    /// Shrinking through a queue.
    Shrinking(SizeQueue),
    /// Death arc in progress.
    Dead {
        /// Frames since death
        frames: u32,
    },
}

/// Result of a transition request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTransition {
    /// Refused: a queue is running, the player is dead, or invulnerable.
    Ignored,
    /// Accepted but changes nothing (e.g. a mushroom while already big).
    Unchanged,
    /// A grow queue started.
    Growing {
        /// Committed tier before
        from: PowerTier,
        /// Tier after the queue drains
        to: PowerTier,
    },
    /// A shrink queue started.
    Shrinking {
        /// Committed tier before
        from: PowerTier,
        /// Tier after the queue drains
        to: PowerTier,
    },
    /// Star invulnerability started.
    StarStarted,
    /// The player died.
    Died,
}

/// Something that happened while ticking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTick {
    /// A queue drained and the tier changed.
    Committed {
        /// Previous tier
        from: PowerTier,
        /// New tier
        to: PowerTier,
    },
    /// Star invulnerability ran out.
    StarEnded,
}

/// Timing rules, read from [`SimConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerRules {
    /// Entries per queue
    pub queue_len: usize,
    /// Frames per entry
    pub step_frames: u32,
    /// Invulnerability after shrinking
    pub hurt_frames: u32,
    /// Star length
    pub star_frames: u32,
    /// Fire drops straight to small
    pub classic_powerdown: bool,
}

impl PowerRules {
    /// Extract the rules from a config.
    #[must_use]
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            queue_len: config.durations.transform_queue_len.max(1),
            step_frames: config.durations.transform_step_frames.max(1),
            hurt_frames: config.durations.hurt_invulnerable_frames,
            star_frames: config.star_frames(),
            classic_powerdown: config.nitpicks.classic_powerdown,
        }
    }
}

impl Default for PowerRules {
    fn default() -> Self {
        Self::from_config(&SimConfig::default())
    }
}

/// Power state of one player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PowerState {
    tier: PowerTier,
    phase: PowerPhase,
    star_frames: u32,
    hurt_frames: u32,
}

impl Default for PowerState {
    fn default() -> Self {
        Self::new(PowerTier::Small)
    }
}

impl PowerState {
    /// Start at `tier` in the normal phase.
    #[must_use]
    pub fn new(tier: PowerTier) -> Self {
        Self {
            tier,
            phase: PowerPhase::Normal,
            star_frames: 0,
            hurt_frames: 0,
        }
    }

    /// Committed tier.
    #[must_use]
    pub fn tier(&self) -> PowerTier {
        self.tier
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> &PowerPhase {
        &self.phase
    }

    /// Tier to draw: the queue's front entry while one runs.
    #[must_use]
    pub fn display_tier(&self) -> PowerTier {
        match &self.phase {
            PowerPhase::Transforming(queue) | PowerPhase::Shrinking(queue) => queue.front(),
            _ => self.tier,
        }
    }

    /// Remaining star frames.
    #[must_use]
    pub fn star_frames(&self) -> u32 {
        self.star_frames
    }

    /// Remaining post-damage invulnerability frames.
    #[must_use]
    pub fn hurt_frames(&self) -> u32 {
        self.hurt_frames
    }

    /// Whether the player is dead.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        matches!(self.phase, PowerPhase::Dead { .. })
    }

    /// Frames since death, if dead.
    #[must_use]
    pub fn death_frames(&self) -> Option<u32> {
        match self.phase {
            PowerPhase::Dead { frames } => Some(frames),
            _ => None,
        }
    }

    /// Whether a size queue is running.
    #[must_use]
    pub fn is_transforming(&self) -> bool {
        matches!(
            self.phase,
            PowerPhase::Transforming(_) | PowerPhase::Shrinking(_)
        )
    }

    /// Whether player input is ignored.
    #[must_use]
    pub fn freezes_input(&self) -> bool {
        !matches!(self.phase, PowerPhase::Normal)
    }

    /// Whether enemy contact is harmless.
    #[must_use]
    pub fn is_invulnerable(&self) -> bool {
        self.star_frames > 0 || self.hurt_frames > 0
    }

    /// Whether star power is active.
    #[must_use]
    pub fn has_star(&self) -> bool {
        self.star_frames > 0
    }

    /// Apply a pickup.
    pub fn collect(&mut self, item: PowerUp, rules: &PowerRules) -> PowerTransition {
        if !matches!(self.phase, PowerPhase::Normal) {
            return PowerTransition::Ignored;
        }
        let target = match (item, self.tier) {
            (PowerUp::Star, _) => {
                self.star_frames = rules.star_frames;
                return PowerTransition::StarStarted;
            }
            (PowerUp::Mushroom | PowerUp::FireFlower, PowerTier::Small) => PowerTier::Big,
            (PowerUp::FireFlower, PowerTier::Big) => PowerTier::Fire,
            _ => return PowerTransition::Unchanged,
        };
        let from = self.tier;
        self.phase = PowerPhase::Transforming(SizeQueue::new(from, target, rules.queue_len));
        PowerTransition::Growing { from, to: target }
    }

    /// Apply enemy damage.
    pub fn damage(&mut self, rules: &PowerRules) -> PowerTransition {
        if !matches!(self.phase, PowerPhase::Normal) || self.is_invulnerable() {
            return PowerTransition::Ignored;
        }
        let target = match self.tier {
            PowerTier::Small => {
                self.die();
                return PowerTransition::Died;
            }
            PowerTier::Fire if !rules.classic_powerdown => PowerTier::Big,
            PowerTier::Big | PowerTier::Fire => PowerTier::Small,
        };
        let from = self.tier;
        self.phase = PowerPhase::Shrinking(SizeQueue::new(from, target, rules.queue_len));
        PowerTransition::Shrinking { from, to: target }
    }

    /// Unconditional death (pits). Ignored if already dead.
    pub fn kill(&mut self) -> PowerTransition {
        if self.is_dead() {
            return PowerTransition::Ignored;
        }
        self.die();
        PowerTransition::Died
    }

    fn die(&mut self) {
        self.phase = PowerPhase::Dead { frames: 0 };
        self.star_frames = 0;
        self.hurt_frames = 0;
    }

    /// Advance timers and queues by one frame.
    pub fn tick(&mut self, rules: &PowerRules) -> Option<PowerTick> {
        let mut event = None;

        if self.star_frames > 0 {
            self.star_frames -= 1;
            if self.star_frames == 0 {
                event = Some(PowerTick::StarEnded);
            }
        }
        self.hurt_frames = self.hurt_frames.saturating_sub(1);

        match &mut self.phase {
            PowerPhase::Normal => {}
            PowerPhase::Dead { frames } => *frames = frames.saturating_add(1),
            PowerPhase::Transforming(queue) | PowerPhase::Shrinking(queue) => {
                queue.frame += 1;
                if queue.frame >= rules.step_frames {
                    queue.frame = 0;
                    queue.entries.pop_front();
                }
                if queue.entries.is_empty() {
                    let (from, to) = (queue.from, queue.to);
                    let shrinking = matches!(self.phase, PowerPhase::Shrinking(_));
                    self.tier = to;
                    self.phase = PowerPhase::Normal;
                    if shrinking {
                        self.hurt_frames = rules.hurt_frames;
                    }
                    return Some(PowerTick::Committed { from, to });
                }
            }
        }
        event
    }
}
