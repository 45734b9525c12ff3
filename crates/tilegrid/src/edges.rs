//! Per-edge collision flags.
//!
//! A tile only blocks motion across the edges it declares. One-way platforms
//! are tiles with only [`Edges::TOP`]; hidden blocks carry only
//! [`Edges::BOTTOM`] until revealed.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Which sides of a tile stop an actor moving into them.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Edges: u8 {
        /// Blocks actors moving right into the tile's left side.
        const LEFT = 0b0001;
        /// Blocks actors moving left into the tile's right side.
        const RIGHT = 0b0010;
        /// Blocks actors falling onto the tile.
        const TOP = 0b0100;
        /// Blocks actors rising into the tile (bonk).
        const BOTTOM = 0b1000;
        /// Fully solid.
        const SOLID = Self::LEFT.bits() | Self::RIGHT.bits() | Self::TOP.bits() | Self::BOTTOM.bits();
    }
}

impl Default for Edges {
    fn default() -> Self {
        Self::SOLID
    }
}
