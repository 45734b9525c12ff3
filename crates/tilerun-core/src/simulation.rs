//! Simulation module with the 7-phase step loop.
//!
//! The `Simulation` struct owns one level and advances it one fixed frame at a
//! time:
//!
//! 1. **CONTROL**: latch input, tick power states, enemy timers, pipe transits
//! 2. **MOTION**: integrate velocities for every actor in parallel
//! 3. **TILE COLLISION**: sweep actors against tiles, X then Y; bonk reactions
//! 4. **TILE REACTION**: advance bouncing tiles; release payloads at the apex
//! 5. **CONTACT**: detect actor-vs-actor contacts against the frozen state
//! 6. **RESOLUTION**: clone current to next, run resolvers with the outputs
//! 7. **APPLY**: swap buffers, compact, derive animation, evaluate the outcome
//!
//! # Determinism
//!
//! - Motion runs in parallel but its results are sorted by entity id
//! - Entities are iterated in id order (via `BTreeMap`)
//! - Outputs carry their emission sequence and resolvers consume them in order
//! - Simultaneous tile contacts are ordered by [`tilegrid::contact_order`]
//!
//! # Example
//!
//! ```
//! use tilerun_core::config::{Character, SimConfig};
//! use tilerun_core::input::Buttons;
//! use tilerun_core::level::LevelData;
//! use tilerun_core::simulation::Simulation;
//!
//! let data = LevelData::from_json(
//!     "1-1",
//!     r#"{
//!         "name": "1-1",
//!         "width": 20,
//!         "height": 15,
//!         "spawn": { "x": 2, "y": 12 },
//!         "tiles": [
//!             { "x": 2, "y": 13, "kind": "ground" },
//!             { "x": 3, "y": 13, "kind": "ground" }
//!         ]
//!     }"#,
//! )
//! .unwrap();
//!
//! let mut sim = Simulation::from_level_data(&data, SimConfig::default(), &[Character::Mario]).unwrap();
//! for _ in 0..10 {
//!     sim.step(&[Buttons::empty()]);
//! }
//!
//! assert_eq!(sim.tick(), 10);
//! assert!(sim.player(0).unwrap().1.body.on_ground);
//! ```

use rayon::prelude::*;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use glam::Vec2;
use tilegrid::{hash_tiles, BounceSignal, Tile, TileId, TileSet};
use tracing::{debug, info, trace, warn};

use crate::animation::{self, AnimationInput};
use crate::collision::{self, contact, ContactKind};
use crate::config::{Character, MediumScale, SimConfig};
use crate::enemy::{self, EnemyComponents, EnemyState, EnemyTick, ShellMotion};
use crate::entity::{Body, Entity, EntityId, EntityInner, EntityTag, MotionState, PlayerComponents};
use crate::error::LevelError;
use crate::input::{Buttons, InputFrame};
use crate::item::{self, ItemComponents};
use crate::kinematics::{self, PlayerMotion};
use crate::level::{BuiltLevel, LevelData};
use crate::level_state::{LevelOutcome, LevelState};
use crate::output::{
    Command, EventSink, GameEvent, Interaction, OutputBuffer, OutputEnvelope, ShotCause, SpawnRequest,
};
use crate::pipe::{PipeNetwork, PipeProgress, PipeTransit};
use crate::power::{PowerPhase, PowerRules, PowerTick, PowerTier};
use crate::projectile::{self, ProjectileComponents};
use crate::reaction::{self, Bump, PendingPayload};
use crate::resolver::{CombatResolver, EventResolver, LifecycleResolver, PowerResolver, Resolver};

// =============================================================================
// Simulation
// =============================================================================

/// A player entering the level.
#[derive(Debug, Clone, Copy)]
struct Entrant {
    slot: usize,
    character: Character,
    lives: u32,
    score: u64,
    coins: u32,
}

/// The main simulation orchestrator implementing the 7-phase step loop.
///
/// `Simulation` manages:
/// - Current and next level state (double-buffered)
/// - The tile set and pipe network, which only the step phases mutate
/// - Resolvers for output processing
/// - The event log and an optional event sink
///
/// # Double Buffering
///
/// Phases 1-4 update `current` in place. Contact detection reads the
/// post-collision `current` and only emits outputs; resolvers write their
/// effects into `next`, which is then swapped in.
pub struct Simulation {
    /// Current level state.
    current: LevelState,
    /// Next level state (written to by resolvers).
    next: LevelState,
    /// Level as built, kept for retries.
    blueprint: BuiltLevel,
    /// Live tile set.
    tiles: TileSet,
    /// Pipes and their claims.
    pipes: PipeNetwork,
    /// Tunables, constant for the level.
    config: SimConfig,
    /// Gravity and jump scaling for the level.
    medium: MediumScale,
    /// Whether players swim.
    underwater: bool,
    /// Power-state timing.
    power_rules: PowerRules,
    /// Resolvers that apply outputs, in order.
    resolvers: Vec<Box<dyn Resolver>>,
    /// Event log.
    events: EventResolver,
    /// Receives every recorded event after each step.
    sink: Option<Box<dyn EventSink>>,
    /// Steps are skipped while paused.
    paused: bool,
    /// Bumpers of tiles whose payload waits for the bounce apex.
    pending_payloads: BTreeMap<TileId, PendingPayload>,
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("current", &self.current)
            .field("tiles", &self.tiles.len())
            .field("pipes", &self.pipes.len())
            .field("resolvers", &format!("[{} resolvers]", self.resolvers.len()))
            .field("events", &self.events.event_count())
            .field("sink", &self.sink.is_some())
            .field("paused", &self.paused)
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Creates a simulation for a built level with one player per character.
    ///
    /// Players are spawned first, in slot order, so player `n` has entity id
    /// `n`. Enemies and free-standing items follow in declaration order.
    #[must_use]
    pub fn new(level: BuiltLevel, config: SimConfig, characters: &[Character]) -> Self {
        let entrants: Vec<Entrant> = characters
            .iter()
            .enumerate()
            .map(|(slot, &character)| Entrant {
                slot,
                character,
                lives: config.scoring.starting_lives,
                score: 0,
                coins: 0,
            })
            .collect();
        let current = populate(&level, &config, &entrants);
        let underwater = level.info.underwater || config.nitpicks.always_underwater;
        let medium = config.medium(level.info.underwater);

        info!(
            course = %level.info.name,
            players = entrants.len(),
            entities = current.len(),
            underwater,
            "simulation started"
        );

        Self {
            next: current.clone(),
            current,
            tiles: level.tiles.clone(),
            pipes: level.pipes.clone(),
            blueprint: level,
            medium,
            underwater,
            power_rules: PowerRules::from_config(&config),
            resolvers: vec![
                Box::new(LifecycleResolver::new(config.clone())),
                Box::new(CombatResolver::new(config.clone())),
                Box::new(PowerResolver::new(&config)),
            ],
            config,
            events: EventResolver::new(),
            sink: None,
            paused: false,
            pending_payloads: BTreeMap::new(),
        }
    }

    /// Validates and builds `data`, then creates a simulation for it.
    ///
    /// # Errors
    ///
    /// Returns the [`LevelError`] of the first malformed field; no simulation
    /// is created from partially valid data.
    pub fn from_level_data(
        data: &LevelData,
        config: SimConfig,
        characters: &[Character],
    ) -> Result<Self, LevelError> {
        Ok(Self::new(data.build()?, config, characters))
    }

    /// Executes one frame using the 7-phase step loop.
    ///
    /// `inputs` holds one button set per player slot; missing slots count as
    /// no buttons held. Does nothing while paused or once the level has an
    /// outcome other than [`LevelOutcome::Playing`].
    pub fn step(&mut self, inputs: &[Buttons]) {
        if self.paused || self.current.outcome() != LevelOutcome::Playing {
            return;
        }
        let tick = self.current.tick();
        let mark = self.events.event_count();
        let mut out = OutputBuffer::new(tick);

        // Phase 1: CONTROL
        self.control_phase(inputs, &mut out);

        // Phase 2: MOTION
        self.motion_phase();

        // Phase 3: TILE COLLISION
        self.collision_phase(&mut out);

        // Phase 4: TILE REACTION
        self.reaction_phase(&mut out);

        // Phase 5: CONTACT
        detect_contacts(&self.current, &mut out);
        trace!(tick, outputs = out.len(), "contact phase complete");

        // Phase 6: RESOLUTION
        let sequence = self.resolution_phase(out);

        // Phase 7: APPLY
        self.apply_phase(sequence);

        self.forward_events(mark);
    }

    // =========================================================================
    // Phase 1: CONTROL
    // =========================================================================

    fn control_phase(&mut self, inputs: &[Buttons], out: &mut OutputBuffer) {
        let mut control = Control {
            pipes: &mut self.pipes,
            tiles: &self.tiles,
            config: &self.config,
            rules: &self.power_rules,
            underwater: self.underwater,
            out,
        };
        for id in self.current.ids() {
            let Some(entity) = self.current.get_mut(id) else {
                continue;
            };
            if entity.is_removed() {
                continue;
            }
            let expired = match entity.inner_mut() {
                EntityInner::Player(p) => {
                    let buttons = inputs.get(p.slot).copied().unwrap_or_default();
                    control.player(id, p, buttons);
                    false
                }
                EntityInner::Enemy(e) => {
                    enemy::tick(e, &control.config.durations, &control.config.actors, control.tiles)
                        == Some(EnemyTick::Expired)
                }
                EntityInner::Item(i) => {
                    item::tick(i);
                    false
                }
                EntityInner::Projectile(_) | EntityInner::Particle(_) => false,
            };
            if expired {
                debug!(enemy = %id, "flattened enemy removed");
                entity.mark_removed();
            }
        }
    }

    // =========================================================================
    // Phase 2: MOTION
    // =========================================================================

    fn motion_phase(&mut self) {
        let config = &self.config;
        let medium = self.medium;
        let mut planned: Vec<(EntityId, Body, Option<MotionState>)> = {
            let live: Vec<&Entity> = self.current.live().collect();
            live.par_iter()
                .filter_map(|entity| {
                    plan_motion(entity, config, medium).map(|(body, motion)| (entity.id(), body, motion))
                })
                .collect()
        };

        // CRITICAL: Sort for determinism
        planned.sort_by_key(|(id, _, _)| *id);

        for (id, body, motion) in planned {
            let Some(entity) = self.current.get_mut(id) else {
                continue;
            };
            *entity.body_mut() = body;
            if let (Some(motion), Some(p)) = (motion, entity.as_player_mut()) {
                p.motion = motion;
            }
        }
    }

    // =========================================================================
    // Phase 3: TILE COLLISION
    // =========================================================================

    fn collision_phase(&mut self, out: &mut OutputBuffer) {
        let sweeper = Sweeper {
            tiles: &self.tiles,
            config: &self.config,
            width: self.current.info().width,
            height: self.current.info().height,
        };
        let mut bonks = Vec::new();

        for id in self.current.ids() {
            let Some(entity) = self.current.get_mut(id) else {
                continue;
            };
            if entity.is_removed() {
                continue;
            }
            let keep = match entity.inner_mut() {
                EntityInner::Player(p) => {
                    if let Some(tile) = sweeper.player(id, p, out) {
                        bonks.push((id, tile, p.power.tier()));
                    }
                    true
                }
                EntityInner::Enemy(e) => sweeper.enemy(e),
                EntityInner::Item(i) => sweeper.item(i),
                EntityInner::Projectile(f) => sweeper.projectile(f),
                EntityInner::Particle(particle) => projectile::advance_particle(
                    particle,
                    sweeper.config.physics.gravity,
                    sweeper.config.physics.terminal_fall,
                ),
            };
            if !keep {
                trace!(entity = %id, "entity left the level");
                entity.mark_removed();
            }
        }

        for (player, tile, tier) in bonks {
            self.bump_tile(player, tile, tier, out);
        }
    }

    fn bump_tile(&mut self, player: EntityId, tile: TileId, tier: PowerTier, out: &mut OutputBuffer) {
        let Some(bounds) = self.tiles.get(tile).map(Tile::bounds) else {
            return;
        };
        match self.tiles.bump(tile, tier.is_strong()) {
            Ok(outcome) => {
                trace!(%player, tile = tile.0, ?outcome, "tile bumped");
                let bump = Bump {
                    tile,
                    bounds,
                    bumper: player,
                    tier,
                };
                if let Some(pending) = reaction::react(&bump, outcome, &self.current, out) {
                    self.pending_payloads.insert(tile, pending);
                }
            }
            Err(err) => warn!(%player, tile = tile.0, %err, "bump ignored"),
        }
    }

    // =========================================================================
    // Phase 4: TILE REACTION
    // =========================================================================

    fn reaction_phase(&mut self, out: &mut OutputBuffer) {
        let progressive = self.config.nitpicks.progressive_powerups;
        for (tile, signal) in self.tiles.advance_reactions() {
            match signal {
                BounceSignal::Apex { payload: Some(payload) } => {
                    let Some(cell) = self.tiles.get(tile).map(Tile::cell) else {
                        continue;
                    };
                    let pending = self.pending_payloads.remove(&tile);
                    debug!(tile = tile.0, ?payload, "payload released");
                    out.push(
                        reaction::release(cell, payload, pending, progressive),
                        pending.map(|p| p.bumper),
                    );
                }
                BounceSignal::Apex { payload: None } => {}
                BounceSignal::Settled => {
                    self.pending_payloads.remove(&tile);
                }
            }
        }
    }

    // =========================================================================
    // Phase 6: RESOLUTION
    // =========================================================================

    /// Route outputs to resolvers and record events. Returns the next free
    /// sequence number of the tick.
    fn resolution_phase(&mut self, out: OutputBuffer) -> u32 {
        let tick = self.current.tick();
        let envelopes = out.into_envelopes();
        self.next.clone_from(&self.current);

        let mut derived = Vec::new();
        for resolver in &self.resolvers {
            let routed: Vec<&OutputEnvelope> = envelopes
                .iter()
                .filter(|envelope| resolver.handles().contains(&envelope.kind()))
                .collect();
            if !routed.is_empty() {
                derived.extend(resolver.resolve(&routed, &self.current, &mut self.next));
            }
        }

        let base = envelopes.len();
        let derived: Vec<OutputEnvelope> = derived
            .into_iter()
            .enumerate()
            .map(|(i, event)| OutputEnvelope::new(event.into(), None, tick, sequence_number(base + i)))
            .collect();
        let events: Vec<&OutputEnvelope> = envelopes
            .iter()
            .chain(&derived)
            .filter(|envelope| envelope.output().is_event())
            .collect();
        self.events.resolve(&events, &self.current, &mut self.next);

        trace!(tick, outputs = base, derived = derived.len(), "resolution complete");
        sequence_number(base + derived.len())
    }

    // =========================================================================
    // Phase 7: APPLY
    // =========================================================================

    fn apply_phase(&mut self, mut sequence: u32) {
        std::mem::swap(&mut self.current, &mut self.next);
        let removed = self.current.compact();
        if removed > 0 {
            trace!(removed, "compacted");
        }

        self.animate();

        for event in self.check_goal() {
            self.record(event, &mut sequence);
        }

        let outcome = self.evaluate_outcome();
        if outcome != self.current.outcome() {
            info!(course = %self.current.info().name, ?outcome, tick = self.current.tick(), "level outcome");
            self.current.set_outcome(outcome);
            self.record(GameEvent::OutcomeChanged { outcome }, &mut sequence);
        }

        self.current.advance_tick();
    }

    fn animate(&mut self) {
        let tick = self.current.tick();
        let physics = &self.config.physics;
        for id in self.current.ids() {
            let Some(p) = self.current.get_mut(id).and_then(Entity::as_player_mut) else {
                continue;
            };
            p.anim_clock = animation::advance_clock(p.anim_clock, p.body.velocity.x);
            let growing_fire = matches!(
                p.power.phase(),
                PowerPhase::Transforming(queue) if queue.target() == PowerTier::Fire
            );
            p.frame = animation::select(&AnimationInput {
                tier: p.power.display_tier(),
                dead: p.power.is_dead(),
                crouching: p.motion.crouching,
                fire_pose: p.fire_pose > 0 || growing_fire,
                on_ground: p.body.on_ground,
                fall_frames: p.body.timers.fall,
                fall_grace: physics.fall_grace_frames,
                velocity: p.body.velocity,
                facing: p.body.facing,
                swimming: p.motion.swimming,
                pspeed: kinematics::pspeed_active(p.body.timers.run, physics),
                clock: p.anim_clock,
                hurt_frames: p.power.hurt_frames(),
                star_frames: p.power.star_frames(),
                tick,
            });
        }
    }

    fn check_goal(&mut self) -> Vec<GameEvent> {
        let Some(goal) = self.current.info().goal_x else {
            return Vec::new();
        };
        let mut events = Vec::new();
        for id in self.current.ids() {
            let Some(p) = self.current.get_mut(id).and_then(Entity::as_player_mut) else {
                continue;
            };
            if p.cleared || p.power.is_dead() || p.body.bounds.right() < goal {
                continue;
            }
            p.cleared = true;
            p.controls_enabled = false;
            info!(player = %id, "course cleared");
            events.push(GameEvent::CourseCleared { player: id });
        }
        events
    }

    fn evaluate_outcome(&self) -> LevelOutcome {
        let players: Vec<&PlayerComponents> = self.current.players().map(|(_, p)| p).collect();
        if players.is_empty() {
            return LevelOutcome::Playing;
        }
        if players.iter().any(|p| p.cleared) {
            return LevelOutcome::Cleared;
        }
        let death_frames = self.config.durations.death_frames;
        let all_down = players
            .iter()
            .all(|p| p.power.death_frames().is_some_and(|frames| frames >= death_frames));
        if !all_down {
            LevelOutcome::Playing
        } else if players.iter().any(|p| p.lives > 0) {
            LevelOutcome::Retry
        } else {
            LevelOutcome::GameOver
        }
    }

    fn record(&self, event: GameEvent, sequence: &mut u32) {
        self.events.record(OutputEnvelope::new(
            event.into(),
            None,
            self.current.tick(),
            *sequence,
        ));
        *sequence = sequence.saturating_add(1);
    }

    fn forward_events(&mut self, mark: usize) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        for envelope in self.events.drain_from(mark) {
            if let Some(event) = envelope.event() {
                sink.emit(envelope.tick(), event);
            }
        }
    }

    // =========================================================================
    // Flow control
    // =========================================================================

    /// Stop advancing until [`resume`](Self::resume).
    pub fn pause(&mut self) {
        self.paused = true;
    }

    /// Continue advancing.
    pub fn resume(&mut self) {
        self.paused = false;
    }

    /// Whether steps are being skipped.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Restart the level after [`LevelOutcome::Retry`].
    ///
    /// Players with lives left re-enter at the spawn point keeping their
    /// score and coins; tiles, pipes and actors return to their initial
    /// state. Returns `false` when the level is not waiting for a retry.
    pub fn retry(&mut self) -> bool {
        if self.current.outcome() != LevelOutcome::Retry {
            return false;
        }
        let entrants: Vec<Entrant> = self
            .current
            .players()
            .filter(|(_, p)| p.lives > 0)
            .map(|(_, p)| Entrant {
                slot: p.slot,
                character: p.character,
                lives: p.lives,
                score: p.score,
                coins: p.coins,
            })
            .collect();
        self.current = populate(&self.blueprint, &self.config, &entrants);
        self.next = self.current.clone();
        self.tiles = self.blueprint.tiles.clone();
        self.pipes = self.blueprint.pipes.clone();
        self.pending_payloads.clear();
        info!(course = %self.blueprint.info.name, players = entrants.len(), "course restarted");
        true
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Returns a read-only reference to the current level state.
    #[must_use]
    pub fn level(&self) -> &LevelState {
        &self.current
    }

    /// Returns a mutable reference to the current level state.
    ///
    /// Use this for setup before running steps. Avoid mutating the level while
    /// a game is in progress; use outputs and resolvers instead.
    #[must_use]
    pub fn level_mut(&mut self) -> &mut LevelState {
        &mut self.current
    }

    /// The live tile set.
    #[must_use]
    pub fn tiles(&self) -> &TileSet {
        &self.tiles
    }

    /// The pipe network.
    #[must_use]
    pub fn pipes(&self) -> &PipeNetwork {
        &self.pipes
    }

    /// Tunables for this level.
    #[must_use]
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Returns the current simulation tick.
    ///
    /// The tick counter starts at 0 and increments by 1 after each
    /// non-skipped `step()`.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.current.tick()
    }

    /// Current level outcome.
    #[must_use]
    pub fn outcome(&self) -> LevelOutcome {
        self.current.outcome()
    }

    /// Player in `slot` with its entity id.
    #[must_use]
    pub fn player(&self, slot: usize) -> Option<(EntityId, &PlayerComponents)> {
        self.current.players().find(|(_, p)| p.slot == slot)
    }

    /// Drains the event log.
    pub fn take_events(&self) -> Vec<OutputEnvelope> {
        self.events.take_events()
    }

    /// Events in the log, not yet drained.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.events.event_count()
    }

    /// Install a sink that receives every event after each step.
    ///
    /// Events handed to the sink are drained from the log; only events
    /// recorded before the sink was installed remain for [`take_events`](Self::take_events).
    pub fn set_sink(&mut self, sink: impl EventSink + 'static) {
        self.sink = Some(Box::new(sink));
    }

    /// Remove the event sink.
    pub fn clear_sink(&mut self) {
        self.sink = None;
    }

    /// Adds a custom resolver, run after the built-in ones.
    pub fn add_resolver(&mut self, resolver: Box<dyn Resolver>) {
        self.resolvers.push(resolver);
    }

    /// Returns the number of resolvers in the simulation.
    #[must_use]
    pub fn resolver_count(&self) -> usize {
        self.resolvers.len()
    }

    /// Hash of the tile set.
    #[must_use]
    pub fn tile_hash(&self) -> u64 {
        hash_tiles(&self.tiles)
    }

    /// Hash of the whole simulation state, for replay checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        match serde_json::to_vec(&self.current) {
            Ok(bytes) => bytes.hash(&mut hasher),
            Err(err) => {
                debug_assert!(false, "level state failed to serialize: {err}");
                warn!(%err, "state hash covers tiles only");
                err.to_string().hash(&mut hasher);
            }
        }
        self.tile_hash().hash(&mut hasher);
        hasher.finish()
    }
}

// =============================================================================
// Setup
// =============================================================================

fn populate(level: &BuiltLevel, config: &SimConfig, entrants: &[Entrant]) -> LevelState {
    let mut state = LevelState::new(level.info.clone());
    for entrant in entrants {
        let mut player =
            PlayerComponents::spawn(entrant.slot, entrant.character, level.info.spawn, entrant.lives);
        player.score = entrant.score;
        player.coins = entrant.coins;
        state.spawn(EntityInner::Player(player));
    }
    for &(kind, feet) in &level.enemies {
        state.spawn(EntityInner::Enemy(EnemyComponents::patrolling(
            kind,
            feet,
            &config.actors,
        )));
    }
    for &(kind, feet) in &level.items {
        state.spawn(EntityInner::Item(ItemComponents::place(kind, feet)));
    }
    state
}

fn sequence_number(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

// =============================================================================
// Control
// =============================================================================

struct Control<'a> {
    pipes: &'a mut PipeNetwork,
    tiles: &'a TileSet,
    config: &'a SimConfig,
    rules: &'a PowerRules,
    underwater: bool,
    out: &'a mut OutputBuffer,
}

impl Control<'_> {
    fn player(&mut self, id: EntityId, p: &mut PlayerComponents, buttons: Buttons) {
        p.input = InputFrame::latch(buttons, p.prev_buttons);
        p.prev_buttons = buttons;

        match p.power.tick(self.rules) {
            Some(PowerTick::Committed { from, to }) => {
                debug!(player = %id, ?from, ?to, "power committed");
                self.out.push(GameEvent::PowerChanged { player: id, from, to }, Some(id));
            }
            Some(PowerTick::StarEnded) => {
                p.star_combo = 0;
                self.out.push(GameEvent::StarEnded { player: id }, Some(id));
            }
            None => {}
        }
        p.controls_enabled = !p.power.freezes_input() && !p.cleared;
        p.fire_pose = p.fire_pose.saturating_sub(1);
        p.motion.swimming = self.underwater;
        if p.power.is_dead() {
            return;
        }

        if let Some(transit) = p.pipe {
            match self
                .pipes
                .advance(transit, &mut p.body, id, self.config.durations.pipe_frames)
            {
                PipeProgress::Moving(next) | PipeProgress::Teleported(next) => p.pipe = Some(next),
                PipeProgress::Finished => {
                    p.pipe = None;
                    self.out.push(
                        GameEvent::PipeExited {
                            player: id,
                            pipe: transit.pipe(),
                        },
                        Some(id),
                    );
                }
            }
            return;
        }
        if !p.controls_enabled {
            return;
        }

        if let Some(index) = self.pipes.find_entry(&p.body, &p.input) {
            if self.pipes.try_claim(index, id) {
                p.pipe = Some(PipeTransit::Entering { pipe: index, frames: 0 });
                p.body.velocity = Vec2::ZERO;
                debug!(player = %id, pipe = index, "pipe entered");
                self.out.push(GameEvent::PipeEntered { player: id, pipe: index }, Some(id));
                return;
            }
            trace!(player = %id, pipe = index, "pipe busy");
        }

        if p.power.tier() == PowerTier::Fire && p.input.pressed(Buttons::RUN) && !p.motion.crouching {
            let bounds = &p.body.bounds;
            let hand = Vec2::new(
                bounds.center().x + p.body.facing.sign() * bounds.width() / 2.0,
                bounds.top() + bounds.height() / 4.0,
            );
            // Thrown point-blank into a wall: fizzles
            if collision::overlaps_tiles(&projectile::fireball_bounds(hand), self.tiles) {
                trace!(player = %id, "fireball smothered");
                return;
            }
            self.out.push(
                SpawnRequest::Fireball {
                    owner: id,
                    hand,
                    facing: p.body.facing,
                },
                Some(id),
            );
        }
    }
}

// =============================================================================
// Motion
// =============================================================================

/// New body (and player motion state) for one entity, or `None` to leave it.
fn plan_motion(entity: &Entity, config: &SimConfig, medium: MediumScale) -> Option<(Body, Option<MotionState>)> {
    match entity.inner() {
        EntityInner::Player(p) => {
            if p.pipe.is_some() {
                return None;
            }
            let mut body = p.body.clone();
            if p.power.is_dead() {
                kinematics::apply_gravity(
                    &mut body,
                    config.physics.gravity * medium.gravity,
                    medium.terminal_fall,
                );
                return Some((body, None));
            }
            let mut motion = p.motion;
            let input = if p.controls_enabled {
                p.input
            } else {
                InputFrame::default()
            };
            kinematics::step_player(
                &mut body,
                &mut motion,
                &input,
                &PlayerMotion {
                    profile: p.character.profile(),
                    physics: &config.physics,
                    medium,
                },
            );
            Some((body, Some(motion)))
        }
        EntityInner::Enemy(e) => enemy::plan_motion(e, config).map(|body| (body, None)),
        EntityInner::Item(i) => item::plan_motion(i, config).map(|body| (body, None)),
        EntityInner::Projectile(f) => Some((projectile::plan_motion(f, config), None)),
        EntityInner::Particle(_) => None,
    }
}

// =============================================================================
// Tile collision
// =============================================================================

struct Sweeper<'a> {
    tiles: &'a TileSet,
    config: &'a SimConfig,
    width: f32,
    height: f32,
}

impl Sweeper<'_> {
    fn off_level(&self, body: &Body) -> bool {
        let bounds = &body.bounds;
        bounds.top() > self.height || bounds.right() < 0.0 || bounds.left() > self.width
    }

    /// Sweep a player. Returns the tile bonked from below, if any.
    fn player(&self, id: EntityId, p: &mut PlayerComponents, out: &mut OutputBuffer) -> Option<TileId> {
        p.refit_hitbox(self.tiles);
        if p.pipe.is_some() {
            return None;
        }
        let contacts = collision::sweep(&mut p.body, self.tiles, self.config.physics.corner_rescue);
        if p.power.is_dead() {
            return None;
        }

        let body = &mut p.body;
        if body.bounds.left() < 0.0 {
            body.bounds.set_left(0.0);
            body.velocity.x = body.velocity.x.max(0.0);
        } else if body.bounds.right() > self.width {
            body.bounds.set_right(self.width);
            body.velocity.x = body.velocity.x.min(0.0);
        }

        if contacts.landed {
            p.stomp_combo = 0;
            p.motion.jump_active = false;
            p.body.timers.jump_hold = 0;
        }
        if let Some(nudge) = contacts.rescued {
            trace!(player = %id, nudge, "corner rescue");
        }
        if p.body.bounds.top() > self.height {
            out.push(Interaction::KillPlayer { player: id }, Some(id));
            return None;
        }
        contacts.bonked
    }

    fn enemy(&self, e: &mut EnemyComponents) -> bool {
        let contacts = collision::sweep(&mut e.body, self.tiles, 0.0);
        if contacts.wall.is_some() && e.state.is_harmful() {
            enemy::bounce_off_wall(e);
        }
        !self.off_level(&e.body)
    }

    fn item(&self, i: &mut ItemComponents) -> bool {
        if i.emerging > 0 || !i.kind.falls() {
            return true;
        }
        let contacts = collision::sweep(&mut i.body, self.tiles, 0.0);
        item::settle(i, contacts.landed, contacts.wall.is_some(), &self.config.actors);
        !self.off_level(&i.body)
    }

    fn projectile(&self, f: &mut ProjectileComponents) -> bool {
        let contacts = collision::sweep(&mut f.body, self.tiles, 0.0);
        projectile::settle(f, contacts.landed, contacts.wall.is_some(), &self.config.fireball)
            && !self.off_level(&f.body)
    }
}

// =============================================================================
// Contact
// =============================================================================

/// -1 when `to` is left of `from`, otherwise 1.
fn direction(from: &Body, to: &Body) -> f32 {
    if to.bounds.center().x < from.bounds.center().x {
        -1.0
    } else {
        1.0
    }
}

fn detect_contacts(level: &LevelState, out: &mut OutputBuffer) {
    for (id, p) in level.players() {
        if p.is_tangible() {
            player_contacts(level, id, p, out);
        }
    }
    shell_contacts(level, out);
    fireball_contacts(level, out);
}

fn player_contacts(level: &LevelState, id: EntityId, p: &PlayerComponents, out: &mut OutputBuffer) {
    let mut stomped = false;
    let mut hurt_by = None;

    for entity in level.live_of(EntityTag::Enemy) {
        let Some(e) = entity.as_enemy() else {
            continue;
        };
        if !e.state.is_active() || !contact::touching(&p.body, &e.body) {
            continue;
        }
        let target = entity.id();
        if p.power.has_star() {
            out.push(
                Interaction::ShootEnemy {
                    enemy: target,
                    cause: ShotCause::Star { player: id },
                    direction: direction(&p.body, &e.body),
                },
                Some(id),
            );
            continue;
        }

        let from_above = collision::classify(&p.body, &e.body) == ContactKind::Stomp;
        if from_above && e.kind.stompable() && !matches!(e.state, EnemyState::Stomped { .. }) {
            out.push(Interaction::Stomp { player: id, enemy: target }, Some(id));
            stomped = true;
        } else if matches!(e.state, EnemyState::Shell(ShellMotion::Idle { .. })) {
            out.push(
                Interaction::KickShell {
                    player: id,
                    shell: target,
                    direction: direction(&p.body, &e.body),
                },
                Some(id),
            );
        } else if e.state.is_harmful() && e.protected_kicker() != Some(id) && hurt_by.is_none() {
            hurt_by = Some(target);
        }
    }

    // A stomp this frame outranks a side hit from a neighbour
    if let Some(by) = hurt_by {
        if !stomped && !p.power.is_invulnerable() {
            out.push(Interaction::HurtPlayer { player: id, by }, Some(id));
        }
    }

    for entity in level.live_of(EntityTag::Item) {
        let Some(item) = entity.as_item() else {
            continue;
        };
        if item.collectible() && contact::touching(&p.body, &item.body) {
            out.push(
                Interaction::Collect {
                    player: id,
                    item: entity.id(),
                },
                Some(id),
            );
        }
    }
}

fn shell_contacts(level: &LevelState, out: &mut OutputBuffer) {
    for entity in level.live_of(EntityTag::Enemy) {
        let Some(shell) = entity.as_enemy() else {
            continue;
        };
        let EnemyState::Shell(ShellMotion::Sliding { kicker, .. }) = shell.state else {
            continue;
        };
        for other in level.live_of(EntityTag::Enemy) {
            if other.id() == entity.id() {
                continue;
            }
            let hit = other
                .as_enemy()
                .is_some_and(|target| target.state.is_active() && contact::touching(&shell.body, &target.body));
            if hit {
                out.push(
                    Interaction::ShootEnemy {
                        enemy: other.id(),
                        cause: ShotCause::Shell {
                            shell: entity.id(),
                            kicker,
                        },
                        direction: shell.body.facing.sign(),
                    },
                    Some(entity.id()),
                );
            }
        }
    }
}

fn fireball_contacts(level: &LevelState, out: &mut OutputBuffer) {
    for entity in level.live_of(EntityTag::Projectile) {
        let Some(fireball) = entity.as_projectile() else {
            continue;
        };
        let hit = level.live_of(EntityTag::Enemy).find(|candidate| {
            candidate
                .as_enemy()
                .is_some_and(|e| e.state.is_active() && contact::touching(&fireball.body, &e.body))
        });
        if let Some(target) = hit {
            out.push(
                Interaction::ShootEnemy {
                    enemy: target.id(),
                    cause: ShotCause::Fireball {
                        owner: fireball.owner,
                    },
                    direction: fireball.body.facing.sign(),
                },
                Some(entity.id()),
            );
            out.push(Command::Despawn { target: entity.id() }, Some(entity.id()));
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
