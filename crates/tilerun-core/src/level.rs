//! Declarative level data.
//!
//! Levels are JSON documents in cell coordinates (one cell is
//! [`tilegrid::TILE_SIZE`] world units, +y down). Loading is all-or-nothing:
//! [`LevelData::validate`] checks every placement before [`LevelData::build`]
//! creates a single tile, so a simulation never starts from partial data.
//!
//! ```json
//! {
//!   "name": "1-1",
//!   "width": 64, "height": 15,
//!   "spawn": { "x": 2, "y": 12 },
//!   "goal_x": 60,
//!   "tiles": [
//!     { "x": 0, "y": 13, "kind": "ground" },
//!     { "x": 8, "y": 9, "kind": "question", "item": "mushroom" },
//!     { "x": 9, "y": 9, "kind": "brick", "coins": 10 }
//!   ],
//!   "enemies": [ { "x": 20, "y": 12, "kind": "goomba" } ],
//!   "pipes": [ { "x": 30, "y": 11, "width": 2, "direction": "down", "exit_x": 50, "exit_y": 12 } ]
//! }
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tilegrid::{ContainedItem, Tile, TileMaterial, TileSet, TILE_SIZE};
use tracing::{debug, info};

use crate::enemy::EnemyKind;
use crate::error::LevelError;
use crate::item::ItemKind;
use crate::level_state::LevelInfo;
use crate::pipe::{Pipe, PipeDirection, PipeNetwork};

/// A cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CellPos {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
}

/// One tile placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TileData {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Material
    pub kind: TileMaterial,
    /// Contents released when bumped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item: Option<ContainedItem>,
    /// Coin count for multi-coin blocks
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coins: Option<u32>,
}

/// One enemy placement. The enemy stands on the bottom of its cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnemyData {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Species
    pub kind: EnemyKind,
}

/// One free-standing item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemData {
    /// Column
    pub x: i32,
    /// Row
    pub y: i32,
    /// Variant
    pub kind: ItemKind,
}

/// One pipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipeData {
    /// Mouth column
    pub x: i32,
    /// Mouth row
    pub y: i32,
    /// Mouth length in tiles
    pub width: u32,
    /// Entry direction
    pub direction: PipeDirection,
    /// Exit column
    pub exit_x: i32,
    /// Exit row
    pub exit_y: i32,
}

/// A level as stored on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelData {
    /// Course name
    pub name: String,
    /// Width in tiles
    pub width: u32,
    /// Height in tiles
    pub height: u32,
    /// Underwater course
    #[serde(default)]
    pub underwater: bool,
    /// Cell the players start in
    pub spawn: CellPos,
    /// Column of the goal line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_x: Option<i32>,
    /// Tiles, in declaration order
    #[serde(default)]
    pub tiles: Vec<TileData>,
    /// Enemies
    #[serde(default)]
    pub enemies: Vec<EnemyData>,
    /// Free-standing items
    #[serde(default)]
    pub items: Vec<ItemData>,
    /// Pipes
    #[serde(default)]
    pub pipes: Vec<PipeData>,
}

/// Everything a simulation needs to start a level.
#[derive(Debug, Clone)]
pub struct BuiltLevel {
    /// Static level facts
    pub info: LevelInfo,
    /// Tile set in declaration order
    pub tiles: TileSet,
    /// Pipes
    pub pipes: PipeNetwork,
    /// Enemies with the bottom-left corner of their hitbox
    pub enemies: Vec<(EnemyKind, Vec2)>,
    /// Items with the bottom-left corner of their hitbox
    pub items: Vec<(ItemKind, Vec2)>,
}

/// Bottom-left corner of a cell in world units.
fn feet(x: i32, y: i32) -> Vec2 {
    Vec2::new(x as f32 * TILE_SIZE, (y + 1) as f32 * TILE_SIZE)
}

impl LevelData {
    /// Parse a level from JSON. `course` names the level in errors.
    ///
    /// # Errors
    ///
    /// [`LevelError::Parse`] for malformed JSON, unknown fields, or unknown
    /// tile/enemy/item kinds.
    pub fn from_json(course: &str, json: &str) -> Result<Self, LevelError> {
        serde_json::from_str(json).map_err(|source| LevelError::Parse {
            course: course.to_string(),
            source,
        })
    }

    /// Read and parse a level file.
    ///
    /// # Errors
    ///
    /// [`LevelError::Io`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let course = path.display().to_string();
        let json = fs::read_to_string(path).map_err(|source| LevelError::Io {
            course: course.clone(),
            source,
        })?;
        Self::from_json(&course, &json)
    }

    fn invalid(&self, field: impl Into<String>, reason: impl Into<String>) -> LevelError {
        LevelError::InvalidField {
            course: self.name.clone(),
            field: field.into(),
            reason: reason.into(),
        }
    }

    fn in_bounds(&self, field: impl Into<String>, x: i32, y: i32) -> Result<(), LevelError> {
        let inside = x >= 0
            && y >= 0
            && u32::try_from(x).is_ok_and(|x| x < self.width)
            && u32::try_from(y).is_ok_and(|y| y < self.height);
        if inside {
            Ok(())
        } else {
            Err(LevelError::OutOfBounds {
                course: self.name.clone(),
                field: field.into(),
                x,
                y,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Check every placement.
    ///
    /// # Errors
    ///
    /// The first problem found, naming the course and the field path.
    pub fn validate(&self) -> Result<(), LevelError> {
        if self.width == 0 {
            return Err(self.invalid("width", "must be at least 1"));
        }
        if self.height == 0 {
            return Err(self.invalid("height", "must be at least 1"));
        }
        self.in_bounds("spawn", self.spawn.x, self.spawn.y)?;
        if let Some(goal) = self.goal_x {
            self.in_bounds("goal_x", goal, 0)?;
        }

        let mut occupied = HashSet::new();
        for (i, tile) in self.tiles.iter().enumerate() {
            let field = format!("tiles[{i}]");
            self.in_bounds(field.as_str(), tile.x, tile.y)?;
            if !occupied.insert((tile.x, tile.y)) {
                return Err(LevelError::DuplicateTile {
                    course: self.name.clone(),
                    field,
                    x: tile.x,
                    y: tile.y,
                });
            }
            let holds_things = matches!(
                tile.kind,
                TileMaterial::Brick | TileMaterial::Question | TileMaterial::Hidden
            );
            if tile.item.is_some() && !holds_things {
                return Err(self.invalid(format!("{field}.item"), "only bricks, question and hidden blocks hold items"));
            }
            if let Some(coins) = tile.coins {
                if coins == 0 {
                    return Err(self.invalid(format!("{field}.coins"), "must be at least 1"));
                }
                if !holds_things {
                    return Err(self.invalid(format!("{field}.coins"), "only bricks, question and hidden blocks hold coins"));
                }
                if tile.item.is_some_and(|item| item != ContainedItem::Coin) {
                    return Err(self.invalid(format!("{field}.coins"), "a block holds either coins or an item"));
                }
            }
        }

        for (i, enemy) in self.enemies.iter().enumerate() {
            self.in_bounds(format!("enemies[{i}]"), enemy.x, enemy.y)?;
        }
        for (i, item) in self.items.iter().enumerate() {
            self.in_bounds(format!("items[{i}]"), item.x, item.y)?;
        }
        for (i, pipe) in self.pipes.iter().enumerate() {
            let field = format!("pipes[{i}]");
            if pipe.width == 0 {
                return Err(self.invalid(format!("{field}.width"), "must be at least 1"));
            }
            self.in_bounds(field.as_str(), pipe.x, pipe.y)?;
            let span = i32::try_from(pipe.width).unwrap_or(i32::MAX) - 1;
            let (far_x, far_y) = match pipe.direction {
                PipeDirection::Down | PipeDirection::Up => (pipe.x.saturating_add(span), pipe.y),
                PipeDirection::Left | PipeDirection::Right => (pipe.x, pipe.y.saturating_add(span)),
            };
            self.in_bounds(format!("{field}.width"), far_x, far_y)?;
            self.in_bounds(format!("{field}.exit"), pipe.exit_x, pipe.exit_y)?;
        }
        Ok(())
    }

    /// Validate, then instantiate tiles, pipes and actor placements.
    ///
    /// # Errors
    ///
    /// Any error from [`validate`](Self::validate).
    pub fn build(&self) -> Result<BuiltLevel, LevelError> {
        self.validate()?;

        let mut tiles = TileSet::new();
        for (i, data) in self.tiles.iter().enumerate() {
            let mut tile = Tile::new(IVec2::new(data.x, data.y), data.kind);
            if let Some(item) = data.item {
                tile = tile.with_contents(item);
            }
            if let Some(coins) = data.coins {
                tile = tile.with_coins(coins);
            }
            tiles.insert(tile).map_err(|_| LevelError::DuplicateTile {
                course: self.name.clone(),
                field: format!("tiles[{i}]"),
                x: data.x,
                y: data.y,
            })?;
        }

        let pipes = PipeNetwork::new(
            self.pipes
                .iter()
                .map(|p| Pipe {
                    cell: IVec2::new(p.x, p.y),
                    width: p.width,
                    direction: p.direction,
                    exit: IVec2::new(p.exit_x, p.exit_y),
                })
                .collect(),
        );

        let info = LevelInfo {
            name: self.name.clone(),
            width: self.width as f32 * TILE_SIZE,
            height: self.height as f32 * TILE_SIZE,
            underwater: self.underwater,
            spawn: feet(self.spawn.x, self.spawn.y),
            goal_x: self.goal_x.map(|x| x as f32 * TILE_SIZE),
        };

        let level = BuiltLevel {
            info,
            tiles,
            pipes,
            enemies: self.enemies.iter().map(|e| (e.kind, feet(e.x, e.y))).collect(),
            items: self.items.iter().map(|i| (i.kind, feet(i.x, i.y))).collect(),
        };
        info!(
            course = %self.name,
            tiles = level.tiles.len(),
            enemies = level.enemies.len(),
            items = level.items.len(),
            pipes = level.pipes.len(),
            "level built"
        );
        debug!(course = %self.name, underwater = self.underwater, "level medium");
        Ok(level)
    }
}
