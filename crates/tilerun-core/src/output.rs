//! Outputs emitted by the step phases and consumed by the resolvers.
//!
//! The collision and contact phases never mutate what they iterate. Instead
//! they describe what should happen as [`Output`]s, which the resolution phase
//! applies to the next state.
//!
//! # Architecture
//!
//! The output hierarchy is split for routing:
//! - [`Command`]: entity lifecycle requests (spawn, despawn)
//! - [`Interaction`]: actor-vs-actor and actor-vs-tile consequences (stomp,
//!   kick, shot, pickup, damage)
//! - [`GameEvent`]: notifications for the event sink (bump, break, score...)
//!
//! Every output travels in an [`OutputEnvelope`] carrying the entity that
//! caused it, the tick, and a per-tick sequence number, so the log replays in
//! the order things happened.
//!
//! # Example
//!
//! ```
//! use tilerun_core::entity::EntityId;
//! use tilerun_core::output::{Command, Output, OutputBuffer, OutputKind};
//!
//! let mut buffer = OutputBuffer::new(7);
//! buffer.push(Command::Despawn { target: EntityId::new(3) }, Some(EntityId::new(1)));
//!
//! let envelopes = buffer.into_envelopes();
//! assert_eq!(envelopes[0].tick(), 7);
//! assert_eq!(envelopes[0].kind(), OutputKind::Command);
//! ```

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;
use tilegrid::TileId;

use crate::enemy::EnemyKind;
use crate::entity::{EntityId, Facing};
use crate::item::ItemKind;
use crate::level_state::LevelOutcome;
use crate::power::PowerTier;
use crate::projectile::ParticleKind;

// =============================================================================
// Commands
// =============================================================================

/// An entity to create during resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpawnRequest {
    /// An item rising out of the tile at `cell`.
    Item {
        /// Variant
        kind: ItemKind,
        /// Tile the item emerges from
        cell: IVec2,
    },
    /// A fireball thrown by a player.
    Fireball {
        /// Thrower
        owner: EntityId,
        /// Centre of the fireball at launch
        hand: Vec2,
        /// Throw direction
        facing: Facing,
    },
    /// A cosmetic particle.
    Particle {
        /// Variant
        kind: ParticleKind,
        /// Centre at launch
        at: Vec2,
        /// Launch velocity
        velocity: Vec2,
    },
}

/// Entity lifecycle requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// Create an entity.
    Spawn(SpawnRequest),
    /// Remove an entity at the end of the step.
    Despawn {
        /// Entity to remove
        target: EntityId,
    },
}

// =============================================================================
// Interactions
// =============================================================================

/// What knocked an enemy off the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShotCause {
    /// A player's fireball.
    Fireball {
        /// Thrower
        owner: EntityId,
    },
    /// A sliding shell.
    Shell {
        /// The shell
        shell: EntityId,
        /// Player who kicked it, if any
        kicker: Option<EntityId>,
    },
    /// Contact with a star-powered player.
    Star {
        /// The player
        player: EntityId,
    },
    /// The tile under the enemy was bumped.
    Bump {
        /// Player who bumped it
        player: EntityId,
    },
}

impl ShotCause {
    /// Player credited with the kill.
    #[must_use]
    pub const fn credited(&self) -> Option<EntityId> {
        match *self {
            Self::Fireball { owner } => Some(owner),
            Self::Shell { kicker, .. } => kicker,
            Self::Star { player } | Self::Bump { player } => Some(player),
        }
    }
}

/// Consequences of contacts and bumps, applied by the resolvers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Interaction {
    /// A player landed on an enemy.
    Stomp {
        /// Stomper
        player: EntityId,
        /// Enemy underfoot
        enemy: EntityId,
    },
    /// A player touched an idle shell from the side.
    KickShell {
        /// Kicker
        player: EntityId,
        /// Shell
        shell: EntityId,
        /// Slide direction, -1 or 1
        direction: f32,
    },
    /// An enemy is knocked off the level.
    ShootEnemy {
        /// Target
        enemy: EntityId,
        /// What hit it
        cause: ShotCause,
        /// Direction of the push, -1 or 1
        direction: f32,
    },
    /// A player touched a collectible item.
    Collect {
        /// Collector
        player: EntityId,
        /// Item
        item: EntityId,
    },
    /// An enemy hurt a player.
    HurtPlayer {
        /// Victim
        player: EntityId,
        /// Enemy responsible
        by: EntityId,
    },
    /// A player dies regardless of power tier.
    KillPlayer {
        /// Victim
        player: EntityId,
    },
    /// A coin popped out of a block for a player.
    GrantCoin {
        /// Recipient
        player: EntityId,
    },
    /// An item resting on a bumped tile hops.
    HopItem {
        /// Item
        item: EntityId,
    },
}

impl Interaction {
    /// The player this interaction concerns, if any.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        match *self {
            Self::Stomp { player, .. }
            | Self::KickShell { player, .. }
            | Self::Collect { player, .. }
            | Self::HurtPlayer { player, .. }
            | Self::KillPlayer { player }
            | Self::GrantCoin { player } => Some(player),
            Self::ShootEnemy { cause, .. } => cause.credited(),
            Self::HopItem { .. } => None,
        }
    }
}

// =============================================================================
// Events
// =============================================================================

/// Notifications delivered to the event sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A tile started bouncing.
    TileBumped {
        /// Tile
        tile: TileId,
        /// Player who bumped it
        by: EntityId,
    },
    /// A tile was struck from below but did not react (ground, hard,
    /// spent or still bouncing).
    TileBonked {
        /// Tile
        tile: TileId,
        /// Player who struck it
        by: EntityId,
    },
    /// A brick shattered.
    TileBroken {
        /// Tile
        tile: TileId,
        /// Player who broke it
        by: EntityId,
    },
    /// A player gained a coin.
    CoinCollected {
        /// Recipient
        player: EntityId,
        /// Coin count afterwards
        coins: u32,
    },
    /// An item entered the level.
    ItemSpawned {
        /// New item
        item: EntityId,
        /// Variant
        kind: ItemKind,
    },
    /// A player picked up an item.
    ItemCollected {
        /// Collector
        player: EntityId,
        /// Variant
        kind: ItemKind,
    },
    /// A player stomped an enemy.
    Stomped {
        /// Stomper
        player: EntityId,
        /// Enemy
        enemy: EntityId,
        /// Species
        kind: EnemyKind,
    },
    /// A shell started sliding.
    ShellKicked {
        /// Shell
        shell: EntityId,
        /// Kicker, if a player
        by: Option<EntityId>,
    },
    /// An enemy was knocked off the level.
    EnemyShot {
        /// Enemy
        enemy: EntityId,
        /// What hit it
        cause: ShotCause,
    },
    /// A player's committed power tier changed.
    PowerChanged {
        /// Player
        player: EntityId,
        /// Previous tier
        from: PowerTier,
        /// New tier
        to: PowerTier,
    },
    /// Star power started.
    StarStarted {
        /// Player
        player: EntityId,
    },
    /// Star power ran out.
    StarEnded {
        /// Player
        player: EntityId,
    },
    /// A player took damage and started shrinking.
    PlayerHurt {
        /// Victim
        player: EntityId,
    },
    /// A player died.
    PlayerDied {
        /// Victim
        player: EntityId,
        /// Lives left afterwards
        lives: u32,
    },
    /// A player gained a life.
    LifeGained {
        /// Player
        player: EntityId,
        /// Lives afterwards
        lives: u32,
    },
    /// Points were awarded.
    ScoreAwarded {
        /// Player
        player: EntityId,
        /// Points added
        points: u32,
    },
    /// A fireball left a player's hand.
    FireballThrown {
        /// Thrower
        player: EntityId,
        /// New fireball
        fireball: EntityId,
    },
    /// A player entered a pipe.
    PipeEntered {
        /// Traveller
        player: EntityId,
        /// Pipe index
        pipe: usize,
    },
    /// A player came out of a pipe.
    PipeExited {
        /// Traveller
        player: EntityId,
        /// Pipe index
        pipe: usize,
    },
    /// A player crossed the goal line.
    CourseCleared {
        /// Player
        player: EntityId,
    },
    /// The level outcome changed.
    OutcomeChanged {
        /// New outcome
        outcome: LevelOutcome,
    },
}

// =============================================================================
// Top-Level Output Enum
// =============================================================================

/// Output kind for resolver routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputKind {
    /// Lifecycle requests
    Command,
    /// Contact and bump consequences
    Interaction,
    /// Notifications
    Event,
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Command => write!(f, "Command"),
            Self::Interaction => write!(f, "Interaction"),
            Self::Event => write!(f, "Event"),
        }
    }
}

/// A proposal for a state change, or a notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Output {
    /// A lifecycle request
    Command(Command),
    /// A contact or bump consequence
    Interaction(Interaction),
    /// A notification
    Event(GameEvent),
}

impl Output {
    /// Returns the kind of this output for resolver routing.
    #[must_use]
    pub const fn kind(&self) -> OutputKind {
        match self {
            Self::Command(_) => OutputKind::Command,
            Self::Interaction(_) => OutputKind::Interaction,
            Self::Event(_) => OutputKind::Event,
        }
    }

    /// Returns the command if this is a command output.
    #[must_use]
    pub const fn as_command(&self) -> Option<&Command> {
        match self {
            Self::Command(cmd) => Some(cmd),
            _ => None,
        }
    }

    /// Returns the interaction if this is an interaction output.
    #[must_use]
    pub const fn as_interaction(&self) -> Option<&Interaction> {
        match self {
            Self::Interaction(i) => Some(i),
            _ => None,
        }
    }

    /// Returns the event if this is an event output.
    #[must_use]
    pub const fn as_event(&self) -> Option<&GameEvent> {
        match self {
            Self::Event(e) => Some(e),
            _ => None,
        }
    }

    /// Returns `true` if this is an event output.
    #[must_use]
    pub const fn is_event(&self) -> bool {
        matches!(self, Self::Event(_))
    }
}

impl From<Command> for Output {
    fn from(cmd: Command) -> Self {
        Self::Command(cmd)
    }
}

impl From<SpawnRequest> for Output {
    fn from(spawn: SpawnRequest) -> Self {
        Self::Command(Command::Spawn(spawn))
    }
}

impl From<Interaction> for Output {
    fn from(i: Interaction) -> Self {
        Self::Interaction(i)
    }
}

impl From<GameEvent> for Output {
    fn from(e: GameEvent) -> Self {
        Self::Event(e)
    }
}

// =============================================================================
// Output Envelope
// =============================================================================

/// An output with the metadata needed to order and trace it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEnvelope {
    output: Output,
    source: Option<EntityId>,
    tick: u64,
    sequence: u32,
}

impl OutputEnvelope {
    /// Wrap an output.
    #[must_use]
    pub fn new(output: Output, source: Option<EntityId>, tick: u64, sequence: u32) -> Self {
        Self {
            output,
            source,
            tick,
            sequence,
        }
    }

    /// The wrapped output.
    #[must_use]
    pub fn output(&self) -> &Output {
        &self.output
    }

    /// Consume the envelope.
    #[must_use]
    pub fn into_output(self) -> Output {
        self.output
    }

    /// Entity whose behaviour produced the output, if any.
    #[must_use]
    pub const fn source(&self) -> Option<EntityId> {
        self.source
    }

    /// Tick the output was produced in.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Position within the tick.
    #[must_use]
    pub const fn sequence(&self) -> u32 {
        self.sequence
    }

    /// Kind of the wrapped output.
    #[must_use]
    pub const fn kind(&self) -> OutputKind {
        self.output.kind()
    }

    /// The wrapped event, if this is one.
    #[must_use]
    pub const fn event(&self) -> Option<&GameEvent> {
        self.output.as_event()
    }
}

/// Collects the outputs of one step, numbering them in emission order.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    tick: u64,
    envelopes: Vec<OutputEnvelope>,
}

impl OutputBuffer {
    /// Empty buffer for `tick`.
    #[must_use]
    pub fn new(tick: u64) -> Self {
        Self {
            tick,
            envelopes: Vec::new(),
        }
    }

    /// Append an output.
    pub fn push(&mut self, output: impl Into<Output>, source: Option<EntityId>) {
        // Sequence numbers are per tick; a step emits far fewer than u32::MAX outputs.
        #[allow(clippy::cast_possible_truncation)]
        let sequence = self.envelopes.len() as u32;
        self.envelopes
            .push(OutputEnvelope::new(output.into(), source, self.tick, sequence));
    }

    /// Number of outputs collected.
    #[must_use]
    pub fn len(&self) -> usize {
        self.envelopes.len()
    }

    /// Whether nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.envelopes.is_empty()
    }

    /// Outputs collected so far.
    #[must_use]
    pub fn envelopes(&self) -> &[OutputEnvelope] {
        &self.envelopes
    }

    /// Consume the buffer.
    #[must_use]
    pub fn into_envelopes(self) -> Vec<OutputEnvelope> {
        self.envelopes
    }
}

/// Receives every event as the step that produced it finishes.
///
/// Closures taking `(tick, &GameEvent)` implement the trait.
pub trait EventSink: Send {
    /// Deliver one event.
    fn emit(&mut self, tick: u64, event: &GameEvent);
}

impl<F> EventSink for F
where
    F: FnMut(u64, &GameEvent) + Send,
{
    fn emit(&mut self, tick: u64, event: &GameEvent) {
        self(tick, event);
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    mod output_kind_tests {
        use super::*;

        #[test]
        fn kinds_route_by_variant() {
            let despawn = Output::from(Command::Despawn {
                target: EntityId::new(1),
            });
            let coin = Output::from(Interaction::GrantCoin {
                player: EntityId::new(0),
            });
            let event = Output::from(GameEvent::OutcomeChanged {
                outcome: LevelOutcome::Cleared,
            });
            assert_eq!(despawn.kind(), OutputKind::Command);
            assert_eq!(coin.kind(), OutputKind::Interaction);
            assert_eq!(event.kind(), OutputKind::Event);
            assert!(event.is_event());
            assert!(coin.as_command().is_none());
        }

        #[test]
        fn spawn_request_converts_to_command() {
            let output = Output::from(SpawnRequest::Particle {
                kind: ParticleKind::CoinPop,
                at: Vec2::ZERO,
                velocity: Vec2::ZERO,
            });
            assert!(matches!(output, Output::Command(Command::Spawn(_))));
        }

        #[test]
        fn display() {
            assert_eq!(OutputKind::Interaction.to_string(), "Interaction");
        }
    }

    mod buffer_tests {
        use super::*;

        #[test]
        fn sequences_follow_emission_order() {
            let mut buffer = OutputBuffer::new(3);
            assert!(buffer.is_empty());
            for i in 0..3 {
                buffer.push(
                    Interaction::HopItem {
                        item: EntityId::new(i),
                    },
                    None,
                );
            }
            let envelopes = buffer.into_envelopes();
            let sequences: Vec<_> = envelopes.iter().map(OutputEnvelope::sequence).collect();
            assert_eq!(sequences, vec![0, 1, 2]);
            assert!(envelopes.iter().all(|e| e.tick() == 3 && e.source().is_none()));
        }
    }

    mod attribution_tests {
        use super::*;

        #[test]
        fn shell_kill_credits_kicker() {
            let cause = ShotCause::Shell {
                shell: EntityId::new(5),
                kicker: Some(EntityId::new(0)),
            };
            assert_eq!(cause.credited(), Some(EntityId::new(0)));
            let unkicked = ShotCause::Shell {
                shell: EntityId::new(5),
                kicker: None,
            };
            assert_eq!(unkicked.credited(), None);
        }

        #[test]
        fn interaction_player() {
            let shot = Interaction::ShootEnemy {
                enemy: EntityId::new(4),
                cause: ShotCause::Fireball {
                    owner: EntityId::new(1),
                },
                direction: 1.0,
            };
            assert_eq!(shot.player(), Some(EntityId::new(1)));
            assert_eq!(
                Interaction::HopItem {
                    item: EntityId::new(2)
                }
                .player(),
                None
            );
        }
    }

    #[test]
    fn closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |tick: u64, event: &GameEvent| seen.push((tick, event.clone()));
            sink.emit(
                9,
                &GameEvent::StarEnded {
                    player: EntityId::new(0),
                },
            );
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, 9);
    }

    #[test]
    fn envelope_roundtrips_through_json() {
        let envelope = OutputEnvelope::new(
            GameEvent::TileBumped {
                tile: TileId(4),
                by: EntityId::new(0),
            }
            .into(),
            Some(EntityId::new(0)),
            12,
            1,
        );
        let json = serde_json::to_string(&envelope).unwrap();
        let back: OutputEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, envelope);
    }
}
