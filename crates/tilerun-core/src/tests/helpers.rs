//! Test helper functions for building courses and driving simulations.
//!
//! This module provides a small course builder and step utilities that make
//! writing scenario tests more ergonomic and consistent.

use tilegrid::{ContainedItem, TileMaterial};

use crate::config::{Character, SimConfig};
use crate::enemy::EnemyKind;
use crate::entity::{EntityId, PlayerComponents};
use crate::input::Buttons;
use crate::item::ItemKind;
use crate::level::{BuiltLevel, CellPos, EnemyData, ItemData, LevelData, PipeData, TileData};
use crate::output::GameEvent;
use crate::pipe::PipeDirection;
use crate::simulation::Simulation;

// =============================================================================
// Course Layout
// =============================================================================

/// Row of the ground tiles laid by [`CourseBuilder::flat`].
pub const FLOOR_ROW: i32 = 13;

/// World y of the top of the ground.
pub const FLOOR_Y: f32 = 208.0;

/// Height of built courses, in tiles.
pub const COURSE_HEIGHT: u32 = 15;

/// Column players spawn in.
pub const SPAWN_COLUMN: i32 = 2;

/// Fluent builder over [`LevelData`].
#[derive(Debug, Clone)]
pub struct CourseBuilder {
    data: LevelData,
    config: SimConfig,
    characters: Vec<Character>,
}

impl CourseBuilder {
    /// A course `width` tiles wide with ground along [`FLOOR_ROW`] and one Mario.
    pub fn flat(width: u32) -> Self {
        let columns = i32::try_from(width).expect("course width fits in i32");
        let tiles = (0..columns)
            .map(|x| TileData {
                x,
                y: FLOOR_ROW,
                kind: TileMaterial::Ground,
                item: None,
                coins: None,
            })
            .collect();
        Self {
            data: LevelData {
                name: "test".to_string(),
                width,
                height: COURSE_HEIGHT,
                underwater: false,
                spawn: CellPos {
                    x: SPAWN_COLUMN,
                    y: FLOOR_ROW - 1,
                },
                goal_x: None,
                tiles,
                enemies: Vec::new(),
                items: Vec::new(),
                pipes: Vec::new(),
            },
            config: SimConfig::default(),
            characters: vec![Character::Mario],
        }
    }

    /// Remove the ground in columns `from..to`.
    pub fn gap(mut self, from: i32, to: i32) -> Self {
        self.data
            .tiles
            .retain(|t| !(t.y == FLOOR_ROW && (from..to).contains(&t.x)));
        self
    }

    /// Place a plain tile.
    pub fn solid(self, x: i32, y: i32, kind: TileMaterial) -> Self {
        self.block(x, y, kind, None)
    }

    /// Place a block, optionally holding an item.
    pub fn block(mut self, x: i32, y: i32, kind: TileMaterial, item: Option<ContainedItem>) -> Self {
        self.data.tiles.push(TileData {
            x,
            y,
            kind,
            item,
            coins: None,
        });
        self
    }

    /// Place a multi-coin block.
    pub fn coin_block(mut self, x: i32, y: i32, kind: TileMaterial, coins: u32) -> Self {
        self.data.tiles.push(TileData {
            x,
            y,
            kind,
            item: Some(ContainedItem::Coin),
            coins: Some(coins),
        });
        self
    }

    /// Place an enemy standing in cell (`x`, `y`).
    pub fn enemy(mut self, x: i32, y: i32, kind: EnemyKind) -> Self {
        self.data.enemies.push(EnemyData { x, y, kind });
        self
    }

    /// Place a free-standing item in cell (`x`, `y`).
    pub fn item(mut self, x: i32, y: i32, kind: ItemKind) -> Self {
        self.data.items.push(ItemData { x, y, kind });
        self
    }

    /// Add a pipe whose mouth starts at (`x`, `y`).
    pub fn pipe(mut self, x: i32, y: i32, direction: PipeDirection, exit: (i32, i32)) -> Self {
        self.data.pipes.push(PipeData {
            x,
            y,
            width: 2,
            direction,
            exit_x: exit.0,
            exit_y: exit.1,
        });
        self
    }

    /// Put the goal line at column `x`.
    pub fn goal(mut self, x: i32) -> Self {
        self.data.goal_x = Some(x);
        self
    }

    /// Make the course underwater.
    pub fn underwater(mut self) -> Self {
        self.data.underwater = true;
        self
    }

    /// Use a custom config.
    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the characters, one player per entry.
    pub fn players(mut self, characters: &[Character]) -> Self {
        self.characters = characters.to_vec();
        self
    }

    /// The level description.
    pub fn data(&self) -> &LevelData {
        &self.data
    }

    /// Validate and build the level.
    pub fn build(&self) -> BuiltLevel {
        self.data.build().expect("test course is valid")
    }

    /// Build a simulation.
    pub fn sim(self) -> Simulation {
        let level = self.build();
        Simulation::new(level, self.config, &self.characters)
    }
}

// =============================================================================
// Driving
// =============================================================================

/// Step `frames` times with player 0 holding `buttons`.
pub fn run(sim: &mut Simulation, buttons: Buttons, frames: usize) {
    for _ in 0..frames {
        sim.step(&[buttons]);
    }
}

/// Step through a script of (buttons, frames) segments.
pub fn play(sim: &mut Simulation, script: &[(Buttons, usize)]) {
    for &(buttons, frames) in script {
        run(sim, buttons, frames);
    }
}

/// Step until `done` holds or `limit` frames pass. Returns the frames taken.
pub fn run_until(
    sim: &mut Simulation,
    buttons: Buttons,
    limit: usize,
    mut done: impl FnMut(&Simulation) -> bool,
) -> Option<usize> {
    for frame in 0..limit {
        if done(sim) {
            return Some(frame);
        }
        sim.step(&[buttons]);
    }
    done(sim).then_some(limit)
}

// =============================================================================
// Inspection
// =============================================================================

/// Player 0.
pub fn hero(sim: &Simulation) -> &PlayerComponents {
    sim.player(0).expect("player 0 exists").1
}

/// Entity id of player 0.
pub fn hero_id(sim: &Simulation) -> EntityId {
    sim.player(0).expect("player 0 exists").0
}

/// Drain the event log, keeping only the events.
pub fn drain_events(sim: &Simulation) -> Vec<GameEvent> {
    sim.take_events()
        .into_iter()
        .filter_map(|envelope| envelope.event().cloned())
        .collect()
}

/// Number of drained events matching `predicate`.
pub fn count_events(events: &[GameEvent], predicate: impl Fn(&GameEvent) -> bool) -> usize {
    events.iter().filter(|event| predicate(event)).count()
}
