//! # Tilegrid
//!
//! Static tile substrate for the tilerun platformer simulation.
//!
//! A level's solid geometry is a set of axis-aligned 16-unit cells. Each cell
//! declares which of its four edges block motion, whether it reacts to being
//! struck from below, and what it contains. This crate owns that data and the
//! per-tile reaction state machine; the simulation crate owns everything that
//! moves.
//!
//! - **Coordinates**: `x` grows right, `y` grows *down*. A cell `(cx, cy)`
//!   covers `[cx * 16, cx * 16 + 16)` horizontally and the same vertically.
//! - **Ordering**: queries return tiles in level-declaration order via
//!   [`contact_order`], the single place where the multi-tile tie-break lives.
//! - **Determinism**: [`hash_tiles`] digests the full tile state for replay
//!   comparisons.
//!
//! ## Quick Start
//!
//! ```
//! use glam::IVec2;
//! use tilegrid::{Aabb, Edges, Tile, TileSet};
//!
//! let mut tiles = TileSet::new();
//! let floor = tiles.insert(Tile::solid(IVec2::new(0, 4))).unwrap();
//!
//! // A 16x16 box resting on top of the floor cell touches but does not overlap it.
//! let feet = Aabb::new(0.0, 48.0, 16.0, 16.0);
//! assert!(tiles.query(&feet).is_empty());
//! assert!(tiles.get(floor).unwrap().edges().contains(Edges::TOP));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod edges;
pub mod grid;
pub mod hash;
pub mod tile;

// Re-exports for convenience
pub use edges::Edges;
pub use grid::{contact_order, GridError, TileSet};
pub use hash::hash_tiles;
pub use tile::{
    BounceSignal, BumpOutcome, ContainedItem, Tile, TileId, TileMaterial, TileReaction,
};

use glam::{IVec2, Vec2};

/// Edge length of one tile cell in world units.
pub const TILE_SIZE: f32 = 16.0;

/// Converts a cell coordinate to the world position of its top-left corner.
#[must_use]
pub fn cell_origin(cell: IVec2) -> Vec2 {
    cell.as_vec2() * TILE_SIZE
}

/// Returns the cell containing a world-space point.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn cell_at(point: Vec2) -> IVec2 {
    IVec2::new(
        (point.x / TILE_SIZE).floor() as i32,
        (point.y / TILE_SIZE).floor() as i32,
    )
}

/// Axis-aligned bounding box.
///
/// Stored as a top-left corner plus a size. Intersection is strict: boxes
/// that only share an edge do not intersect, which is what lets an actor rest
/// exactly on a floor without being pushed out of it every frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, serde::Serialize, serde::Deserialize)]
pub struct Aabb {
    /// Top-left corner
    pub min: Vec2,
    /// Width and height
    pub size: Vec2,
}

impl Aabb {
    /// Create a box from its top-left corner and size.
    #[must_use]
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            min: Vec2::new(x, y),
            size: Vec2::new(width, height),
        }
    }

    /// The world-space box covered by a tile cell.
    #[must_use]
    pub fn cell(cell: IVec2) -> Self {
        Self {
            min: cell_origin(cell),
            size: Vec2::splat(TILE_SIZE),
        }
    }

    /// Left edge.
    #[must_use]
    pub fn left(&self) -> f32 {
        self.min.x
    }

    /// Right edge.
    #[must_use]
    pub fn right(&self) -> f32 {
        self.min.x + self.size.x
    }

    /// Top edge.
    #[must_use]
    pub fn top(&self) -> f32 {
        self.min.y
    }

    /// Bottom edge.
    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.min.y + self.size.y
    }

    /// Width of the box.
    #[must_use]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    /// Height of the box.
    #[must_use]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    /// Center point.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.min + self.size * 0.5
    }

    /// Move the box so its left edge sits at `x`.
    pub fn set_left(&mut self, x: f32) {
        self.min.x = x;
    }

    /// Move the box so its right edge sits at `x`.
    pub fn set_right(&mut self, x: f32) {
        self.min.x = x - self.size.x;
    }

    /// Move the box so its top edge sits at `y`.
    pub fn set_top(&mut self, y: f32) {
        self.min.y = y;
    }

    /// Move the box so its bottom edge sits at `y`.
    pub fn set_bottom(&mut self, y: f32) {
        self.min.y = y - self.size.y;
    }

    /// Resize the box while keeping its bottom edge and horizontal center.
    pub fn resize_from_bottom(&mut self, size: Vec2) {
        let bottom = self.bottom();
        let center_x = self.center().x;
        self.size = size;
        self.min.x = center_x - size.x * 0.5;
        self.set_bottom(bottom);
    }

    /// A copy of the box moved by `delta`.
    #[must_use]
    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            min: self.min + delta,
            size: self.size,
        }
    }

    /// Smallest box covering both `self` and `other`.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        let min = self.min.min(other.min);
        let max = (self.min + self.size).max(other.min + other.size);
        Self {
            min,
            size: max - min,
        }
    }

    /// Strict overlap test. Zero-size boxes never intersect anything.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.left() < other.right()
            && self.right() > other.left()
            && self.top() < other.bottom()
            && self.bottom() > other.top()
    }

    /// Length of the horizontal overlap between two boxes (0 when disjoint).
    #[must_use]
    pub fn overlap_x(&self, other: &Self) -> f32 {
        (self.right().min(other.right()) - self.left().max(other.left())).max(0.0)
    }

    /// Check if a point is inside the box (edges inclusive on the top-left).
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.left()
            && point.x < self.right()
            && point.y >= self.top()
            && point.y < self.bottom()
    }

    /// Range of cells touched by this box (inclusive min, inclusive max).
    ///
    /// Edges that land exactly on a cell boundary do not pull in the next
    /// cell, matching the strict [`intersects`](Self::intersects) test.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn cell_span(&self) -> (IVec2, IVec2) {
        let min = cell_at(self.min);
        let max = IVec2::new(
            ((self.right() / TILE_SIZE).ceil() as i32 - 1).max(min.x),
            ((self.bottom() / TILE_SIZE).ceil() as i32 - 1).max(min.y),
        );
        (min, max)
    }
}
