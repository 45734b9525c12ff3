//! Axis-separated tile sweep.
//!
//! Bodies move along X first, then along Y. On each axis the box is swept
//! from its start to its tentative position and clamped against the nearest
//! tile edge that protects that direction of travel:
//!
//! | moving | blocked by edge | effect |
//! |---|---|---|
//! | right | `LEFT` | right edge clamped, `vx = 0` |
//! | left | `RIGHT` | left edge clamped, `vx = 0` |
//! | down | `TOP` | bottom clamped, `vy = 0`, landed |
//! | up | `BOTTOM` | top clamped, `vy = 0`, bonk |
//!
//! A tile only blocks when the moving edge started at or before the edge it
//! protects, so a body that already overlaps a tile is never snapped through
//! it. Simultaneous contacts are visited in [`tilegrid::contact_order`].

pub mod contact;

use glam::Vec2;
use tilegrid::{Aabb, Edges, TileId, TileSet};

use crate::entity::Body;

pub use contact::{classify, ContactKind};

/// Slack when comparing a starting edge against a tile edge.
const EDGE_EPSILON: f32 = 1e-3;

/// What the sweep ran into.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TileContacts {
    /// Landed on a top edge this frame
    pub landed: bool,
    /// Direction (-1 or 1) of a wall that stopped horizontal motion
    pub wall: Option<f32>,
    /// Tile struck from below
    pub bonked: Option<TileId>,
    /// Horizontal nudge applied by corner rescue
    pub rescued: Option<f32>,
}

fn overlaps_vertically(a: &Aabb, b: &Aabb) -> bool {
    a.top() < b.bottom() && a.bottom() > b.top()
}

fn overlaps_horizontally(a: &Aabb, b: &Aabb) -> bool {
    a.left() < b.right() && a.right() > b.left()
}

/// Sweep a body through the tile set using its current velocity.
///
/// Non-solid bodies move freely. `corner_rescue` is the largest horizontal
/// overlap with a single head tile that is nudged aside instead of bonking;
/// pass 0 to disable it.
pub fn sweep(body: &mut Body, tiles: &TileSet, corner_rescue: f32) -> TileContacts {
    let origin = body.bounds.min;
    let mut contacts = TileContacts::default();

    if !body.solid {
        body.bounds = body.bounds.translated(body.velocity);
        body.displacement = body.bounds.min - origin;
        return contacts;
    }

    sweep_x(body, tiles, &mut contacts);
    sweep_y(body, tiles, corner_rescue, &mut contacts);
    debug_assert!(body.bounds.min.is_finite(), "actor left the finite plane: {:?}", body.bounds);

    body.displacement = body.bounds.min - origin;
    contacts
}

// ===== X axis =====

fn sweep_x(body: &mut Body, tiles: &TileSet, contacts: &mut TileContacts) {
    let dx = body.velocity.x;
    if dx == 0.0 {
        return;
    }
    let start = body.bounds;
    let mut target = start.translated(Vec2::new(dx, 0.0));

    for id in tiles.query(&start.union(&target)) {
        let Some(tile) = tiles.get(id) else { continue };
        let edges = tile.edges();
        let wall = tile.bounds();
        if !overlaps_vertically(&target, &wall) {
            continue;
        }
        if dx > 0.0
            && edges.contains(Edges::LEFT)
            && start.right() <= wall.left() + EDGE_EPSILON
            && target.right() > wall.left()
        {
            target.set_right(wall.left());
            contacts.wall = Some(1.0);
        } else if dx < 0.0
            && edges.contains(Edges::RIGHT)
            && start.left() >= wall.right() - EDGE_EPSILON
            && target.left() < wall.right()
        {
            target.set_left(wall.right());
            contacts.wall = Some(-1.0);
        }
    }

    if contacts.wall.is_some() {
        body.velocity.x = 0.0;
    }
    body.bounds = target;
}

// ===== Y axis =====

fn sweep_y(body: &mut Body, tiles: &TileSet, corner_rescue: f32, contacts: &mut TileContacts) {
    let dy = body.velocity.y;
    if dy == 0.0 {
        return;
    }
    let start = body.bounds;
    let mut target = start.translated(Vec2::new(0.0, dy));
    let touched = tiles.query(&start.union(&target));

    if dy > 0.0 {
        for &id in &touched {
            let Some(tile) = tiles.get(id) else { continue };
            let floor = tile.bounds();
            if tile.edges().contains(Edges::TOP)
                && overlaps_horizontally(&target, &floor)
                && start.bottom() <= floor.top() + EDGE_EPSILON
                && target.bottom() > floor.top()
            {
                target.set_bottom(floor.top());
                contacts.landed = true;
            }
        }
    } else {
        let heads: Vec<(TileId, Aabb)> = touched
            .iter()
            .filter_map(|&id| tiles.get(id).map(|tile| (id, tile)))
            .filter(|(_, tile)| tile.edges().contains(Edges::BOTTOM))
            .map(|(id, tile)| (id, tile.bounds()))
            .filter(|(_, ceiling)| {
                overlaps_horizontally(&target, ceiling)
                    && start.top() >= ceiling.bottom() - EDGE_EPSILON
                    && target.top() < ceiling.bottom()
            })
            .collect();

        if let [(_, ceiling)] = heads.as_slice() {
            if let Some(nudge) = corner_nudge(&start, &target, ceiling, tiles, corner_rescue) {
                target = target.translated(Vec2::new(nudge, 0.0));
                contacts.rescued = Some(nudge);
            }
        }
        if contacts.rescued.is_none() {
            if let Some(&(first, _)) = heads.first() {
                let lowest = heads
                    .iter()
                    .map(|(_, ceiling)| ceiling.bottom())
                    .fold(f32::MIN, f32::max);
                target.set_top(lowest);
                contacts.bonked = Some(first);
            }
        }
    }

    body.bounds = target;
    if contacts.landed {
        body.velocity.y = 0.0;
        body.on_ground = true;
        body.timers.fall = 0;
    } else {
        if contacts.bonked.is_some() {
            body.velocity.y = 0.0;
        }
        body.on_ground = false;
        body.timers.fall += 1;
    }
}

/// Whether `bounds` overlaps a tile that blocks from below.
///
/// Used before a hitbox grows upwards: the sweep never pushes a body out of
/// a tile it already overlaps, so the box must not be allowed to start inside one.
#[must_use]
pub fn hits_ceiling(bounds: &Aabb, tiles: &TileSet) -> bool {
    tiles
        .query(bounds)
        .iter()
        .filter_map(|&id| tiles.get(id))
        .any(|tile| tile.edges().contains(Edges::BOTTOM))
}

/// Whether `bounds` overlaps any collidable tile.
#[must_use]
pub fn overlaps_tiles(bounds: &Aabb, tiles: &TileSet) -> bool {
    tiles
        .query(bounds)
        .iter()
        .filter_map(|&id| tiles.get(id))
        .any(|tile| !tile.edges().is_empty())
}

/// Horizontal shift that clears a single head tile, if the way is open.
fn corner_nudge(start: &Aabb, target: &Aabb, ceiling: &Aabb, tiles: &TileSet, limit: f32) -> Option<f32> {
    let overlap = start.overlap_x(ceiling);
    if limit <= 0.0 || overlap <= 0.0 || overlap > limit {
        return None;
    }
    let nudge = if start.center().x < ceiling.center().x {
        -overlap
    } else {
        overlap
    };
    let nudged = target.translated(Vec2::new(nudge, 0.0));
    let clear = tiles
        .query(&nudged)
        .iter()
        .filter_map(|&id| tiles.get(id))
        .all(|tile| tile.edges().is_empty());
    clear.then_some(nudge)
}
