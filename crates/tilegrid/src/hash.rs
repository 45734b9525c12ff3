//! State hashing for determinism verification.
//!
//! Two runs fed identical inputs must leave the tile set in an identical
//! state. Floats are hashed through their bit patterns.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::tile::{Tile, TileReaction};
use crate::TileSet;

/// Compute a deterministic hash of every tile, broken ones included.
#[must_use]
pub fn hash_tiles(tiles: &TileSet) -> u64 {
    let mut hasher = DefaultHasher::new();
    tiles.len().hash(&mut hasher);
    for (id, tile) in tiles.iter() {
        id.hash(&mut hasher);
        hash_tile(tile, &mut hasher);
    }
    hasher.finish()
}

fn hash_tile<H: Hasher>(tile: &Tile, hasher: &mut H) {
    tile.cell().hash(hasher);
    tile.material().hash(hasher);
    tile.edges().bits().hash(hasher);
    tile.bonkable().hash(hasher);
    tile.breakable().hash(hasher);
    tile.contents().hash(hasher);
    tile.coins_left().hash(hasher);
    tile.is_broken().hash(hasher);
    tile.is_hit().hash(hasher);

    match tile.reaction() {
        TileReaction::Idle => 0u8.hash(hasher),
        TileReaction::Bouncing {
            offset,
            velocity,
            frame,
            payload,
            apex_reached,
        } => {
            1u8.hash(hasher);
            offset.to_bits().hash(hasher);
            velocity.to_bits().hash(hasher);
            frame.hash(hasher);
            payload.hash(hasher);
            apex_reached.hash(hasher);
        }
        TileReaction::Settled => 2u8.hash(hasher),
        TileReaction::Broken => 3u8.hash(hasher),
    }
}
