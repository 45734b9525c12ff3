//! Warp pipes.
//!
//! A pipe mouth is a row (or, for side pipes, a column) of `width` tiles
//! starting at `cell`. Entering claims the pipe for the traveller; the claim
//! is held until the exit animation finishes, so a second player pressing
//! into the same mouth is refused.
//!
//! ```text
//!   Entering { frames } --pipe_frames--> teleport --> Exiting { frames } --pipe_frames--> released
//! ```

use std::collections::BTreeMap;

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use tilegrid::{cell_origin, Aabb, TILE_SIZE};
use tracing::debug;

use crate::entity::{Body, EntityId};
use crate::input::{Buttons, InputFrame};

/// Tolerance when matching a body edge against a pipe mouth.
const MOUTH_EPSILON: f32 = 0.5;
/// How far inside the mouth the body centre has to be.
const MOUTH_MARGIN: f32 = 4.0;

/// Direction a traveller moves to enter the pipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeDirection {
    /// Stand on top and press down.
    Down,
    /// Stand under it and press up.
    Up,
    /// Walk into its right-hand mouth.
    Left,
    /// Walk into its left-hand mouth.
    Right,
}

impl PipeDirection {
    /// Button that enters the pipe.
    #[must_use]
    pub const fn button(self) -> Buttons {
        match self {
            Self::Down => Buttons::DOWN,
            Self::Up => Buttons::UP,
            Self::Left => Buttons::LEFT,
            Self::Right => Buttons::RIGHT,
        }
    }

    /// Unit travel direction.
    #[must_use]
    pub const fn vector(self) -> Vec2 {
        match self {
            Self::Down => Vec2::new(0.0, 1.0),
            Self::Up => Vec2::new(0.0, -1.0),
            Self::Left => Vec2::new(-1.0, 0.0),
            Self::Right => Vec2::new(1.0, 0.0),
        }
    }
}

/// A pipe mouth and where it leads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipe {
    /// First cell of the mouth
    pub cell: IVec2,
    /// Mouth length in tiles
    pub width: u32,
    /// Entry direction
    pub direction: PipeDirection,
    /// Cell the traveller emerges standing in
    pub exit: IVec2,
}

impl Pipe {
    /// Box covered by the mouth tiles.
    #[must_use]
    pub fn mouth(&self) -> Aabb {
        let span = self.width as f32 * TILE_SIZE;
        let origin = cell_origin(self.cell);
        match self.direction {
            PipeDirection::Down | PipeDirection::Up => Aabb::new(origin.x, origin.y, span, TILE_SIZE),
            PipeDirection::Left | PipeDirection::Right => {
                Aabb::new(origin.x, origin.y, TILE_SIZE, span)
            }
        }
    }

    /// Whether `body` is lined up with the mouth and pressing the right way.
    #[must_use]
    pub fn accepts(&self, body: &Body, input: &InputFrame) -> bool {
        if !input.holds(self.direction.button()) {
            return false;
        }
        let mouth = self.mouth();
        let bounds = &body.bounds;
        let centre = bounds.center();
        let within_x = centre.x >= mouth.left() + MOUTH_MARGIN && centre.x <= mouth.right() - MOUTH_MARGIN;
        let within_y = bounds.top() >= mouth.top() - MOUTH_EPSILON
            && bounds.bottom() <= mouth.bottom() + MOUTH_EPSILON;
        match self.direction {
            PipeDirection::Down => {
                body.on_ground && within_x && (bounds.bottom() - mouth.top()).abs() <= MOUTH_EPSILON
            }
            PipeDirection::Up => within_x && (bounds.top() - mouth.bottom()).abs() <= MOUTH_EPSILON,
            PipeDirection::Right => {
                body.on_ground && within_y && (bounds.right() - mouth.left()).abs() <= MOUTH_EPSILON
            }
            PipeDirection::Left => {
                body.on_ground && within_y && (bounds.left() - mouth.right()).abs() <= MOUTH_EPSILON
            }
        }
    }
}

/// Pipe transfer in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipeTransit {
    /// Sliding into the entry mouth.
    Entering {
        /// Index into the network
        pipe: usize,
        /// Frames elapsed
        frames: u32,
    },
    /// Rising out at the exit.
    Exiting {
        /// Index into the network
        pipe: usize,
        /// Frames elapsed
        frames: u32,
    },
}

impl PipeTransit {
    /// Pipe being travelled.
    #[must_use]
    pub const fn pipe(&self) -> usize {
        match self {
            Self::Entering { pipe, .. } | Self::Exiting { pipe, .. } => *pipe,
        }
    }
}

/// Result of advancing a transit by one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipeProgress {
    /// Still moving.
    Moving(PipeTransit),
    /// Arrived at the exit this frame.
    Teleported(PipeTransit),
    /// Fully out; the claim has been released.
    Finished,
}

/// All pipes of a level plus their claims.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipeNetwork {
    pipes: Vec<Pipe>,
    claims: BTreeMap<usize, EntityId>,
}

impl PipeNetwork {
    /// Network over `pipes`, all unclaimed.
    #[must_use]
    pub fn new(pipes: Vec<Pipe>) -> Self {
        Self {
            pipes,
            claims: BTreeMap::new(),
        }
    }

    /// Pipe by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Pipe> {
        self.pipes.get(index)
    }

    /// Number of pipes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pipes.len()
    }

    /// Whether the level has no pipes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pipes.is_empty()
    }

    /// Current owner of a pipe.
    #[must_use]
    pub fn claimant(&self, index: usize) -> Option<EntityId> {
        self.claims.get(&index).copied()
    }

    /// First pipe, in declaration order, that `body` can enter this frame.
    #[must_use]
    pub fn find_entry(&self, body: &Body, input: &InputFrame) -> Option<usize> {
        self.pipes.iter().position(|pipe| pipe.accepts(body, input))
    }

    /// Claim a pipe. Fails when another traveller holds it.
    pub fn try_claim(&mut self, index: usize, traveller: EntityId) -> bool {
        if index >= self.pipes.len() {
            return false;
        }
        match self.claims.get(&index) {
            Some(owner) => *owner == traveller,
            None => {
                self.claims.insert(index, traveller);
                true
            }
        }
    }

    /// Release a claim held by `traveller`.
    pub fn release(&mut self, index: usize, traveller: EntityId) {
        if self.claims.get(&index) == Some(&traveller) {
            self.claims.remove(&index);
        }
    }

    /// Drop every claim held by `traveller`.
    pub fn release_all(&mut self, traveller: EntityId) {
        self.claims.retain(|_, owner| *owner != traveller);
    }

    /// Move a traveller one frame along its transit.
    pub fn advance(
        &mut self,
        transit: PipeTransit,
        body: &mut Body,
        traveller: EntityId,
        pipe_frames: u32,
    ) -> PipeProgress {
        let Some(pipe) = self.pipes.get(transit.pipe()).cloned() else {
            self.release_all(traveller);
            return PipeProgress::Finished;
        };
        let frames_total = pipe_frames.max(1);
        body.velocity = Vec2::ZERO;
        body.on_ground = false;
        match transit {
            PipeTransit::Entering { pipe: index, frames } => {
                let step = travel(&pipe, body) / frames_total as f32;
                body.bounds = body.bounds.translated(pipe.direction.vector() * step);
                let frames = frames + 1;
                if frames < frames_total {
                    return PipeProgress::Moving(PipeTransit::Entering { pipe: index, frames });
                }
                // Emerge below the exit floor, hidden inside the pipe.
                let exit = cell_origin(pipe.exit);
                let size = body.bounds.size;
                let feet = exit.y + TILE_SIZE;
                body.bounds.min = Vec2::new(exit.x + (TILE_SIZE - size.x) / 2.0, feet);
                debug!(%traveller, pipe = index, "pipe teleport");
                PipeProgress::Teleported(PipeTransit::Exiting { pipe: index, frames: 0 })
            }
            PipeTransit::Exiting { pipe: index, frames } => {
                let rise = body.bounds.height() / frames_total as f32;
                body.bounds = body.bounds.translated(Vec2::new(0.0, -rise));
                let frames = frames + 1;
                if frames < frames_total {
                    return PipeProgress::Moving(PipeTransit::Exiting { pipe: index, frames });
                }
                body.bounds.set_bottom(cell_origin(pipe.exit).y + TILE_SIZE);
                body.on_ground = true;
                self.release(index, traveller);
                debug!(%traveller, pipe = index, "pipe released");
                PipeProgress::Finished
            }
        }
    }
}

/// Distance covered while entering.
fn travel(pipe: &Pipe, body: &Body) -> f32 {
    match pipe.direction {
        PipeDirection::Down | PipeDirection::Up => body.bounds.height(),
        PipeDirection::Left | PipeDirection::Right => body.bounds.width(),
    }
}
