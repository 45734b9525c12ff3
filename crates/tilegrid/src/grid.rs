//! Tile storage and spatial queries.
//!
//! Tiles live in a `Vec` in declaration order; a cell index maps grid
//! coordinates to ids for O(1) lookups. Broken tiles stay in the `Vec` (ids
//! are stable) but leave the index, so queries never see them again.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};

use glam::IVec2;
use thiserror::Error;
use tracing::{debug, trace};

use crate::tile::{BounceSignal, BumpOutcome, Tile, TileId};
use crate::{Aabb, Edges};

/// Errors from tile storage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// Two tiles declared on one cell.
    #[error("cell {cell} already holds tile {existing:?}")]
    DuplicateCell {
        /// The contested cell
        cell: IVec2,
        /// Tile already occupying it
        existing: TileId,
    },
    /// Id not issued by this set.
    #[error("unknown tile id {0:?}")]
    UnknownTile(TileId),
}

/// Tie-break between tiles touched in the same sweep.
///
/// Declaration order wins: the tile declared first is resolved first. Every
/// multi-tile resolution goes through this function.
#[must_use]
pub fn contact_order(a: TileId, b: TileId) -> Ordering {
    a.cmp(&b)
}

/// The active tile set of a level.
#[derive(Debug, Clone, Default)]
pub struct TileSet {
    tiles: Vec<Tile>,
    index: HashMap<IVec2, TileId>,
    bouncing: BTreeSet<TileId>,
}

impl TileSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tile. Ids follow insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::DuplicateCell`] if the cell is taken.
    pub fn insert(&mut self, tile: Tile) -> Result<TileId, GridError> {
        if let Some(&existing) = self.index.get(&tile.cell()) {
            return Err(GridError::DuplicateCell {
                cell: tile.cell(),
                existing,
            });
        }
        let id = TileId(u32::try_from(self.tiles.len()).unwrap_or(u32::MAX));
        self.index.insert(tile.cell(), id);
        self.tiles.push(tile);
        Ok(id)
    }

    /// Number of tiles ever inserted, broken ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// True if no tile was ever inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of tiles still in the active set.
    #[must_use]
    pub fn active_len(&self) -> usize {
        self.index.len()
    }

    /// Get a tile by id.
    #[must_use]
    pub fn get(&self, id: TileId) -> Option<&Tile> {
        self.tiles.get(id.index())
    }

    /// Active tile occupying `cell`.
    #[must_use]
    pub fn at(&self, cell: IVec2) -> Option<TileId> {
        self.index.get(&cell).copied()
    }

    /// Whether the tile at `cell` blocks across `edge`.
    #[must_use]
    pub fn blocks(&self, cell: IVec2, edge: Edges) -> bool {
        self.at(cell)
            .and_then(|id| self.get(id))
            .is_some_and(|tile| tile.edges().contains(edge))
    }

    /// All tiles in declaration order, broken ones included.
    pub fn iter(&self) -> impl Iterator<Item = (TileId, &Tile)> {
        self.tiles
            .iter()
            .enumerate()
            .map(|(i, tile)| (TileId(u32::try_from(i).unwrap_or(u32::MAX)), tile))
    }

    /// Active tiles strictly intersecting `area`, sorted by [`contact_order`].
    #[must_use]
    pub fn query(&self, area: &Aabb) -> Vec<TileId> {
        let (min, max) = area.cell_span();
        let mut hits = Vec::new();
        for cy in min.y..=max.y {
            for cx in min.x..=max.x {
                if let Some(&id) = self.index.get(&IVec2::new(cx, cy)) {
                    if Aabb::cell(IVec2::new(cx, cy)).intersects(area) {
                        hits.push(id);
                    }
                }
            }
        }
        hits.sort_by(|a, b| contact_order(*a, *b));
        hits
    }

    /// Strike a tile from below.
    ///
    /// A shattered tile is removed from the active set.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::UnknownTile`] for ids this set did not issue.
    pub fn bump(&mut self, id: TileId, strong: bool) -> Result<BumpOutcome, GridError> {
        let tile = self
            .tiles
            .get_mut(id.index())
            .ok_or(GridError::UnknownTile(id))?;
        let outcome = tile.bump(strong);
        trace!(tile = id.0, ?outcome, "tile bumped");

        match outcome {
            BumpOutcome::Shattered => {
                let cell = tile.cell();
                self.index.remove(&cell);
                debug!(tile = id.0, x = cell.x, y = cell.y, "tile shattered");
            }
            BumpOutcome::Bounced { .. } => {
                self.bouncing.insert(id);
            }
            BumpOutcome::Inert => {}
        }
        Ok(outcome)
    }

    /// Ids of tiles currently bouncing, in contact order.
    pub fn bouncing(&self) -> impl Iterator<Item = TileId> + '_ {
        self.bouncing.iter().copied()
    }

    /// Advance every bouncing tile one frame, returning signals in id order.
    pub fn advance_reactions(&mut self) -> Vec<(TileId, BounceSignal)> {
        let mut signals = Vec::new();
        let mut settled = Vec::new();
        for &id in &self.bouncing {
            let Some(tile) = self.tiles.get_mut(id.index()) else {
                continue;
            };
            if let Some(signal) = tile.advance() {
                if signal == BounceSignal::Settled {
                    settled.push(id);
                }
                signals.push((id, signal));
            }
        }
        for id in settled {
            self.bouncing.remove(&id);
        }
        signals
    }
}
