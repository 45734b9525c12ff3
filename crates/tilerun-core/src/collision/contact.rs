//! Actor-vs-actor contact classification.

use crate::entity::Body;

/// How far below the target's previous top the attacker's previous bottom
/// may have been and still count as coming from above.
pub const STOMP_TOLERANCE: f32 = 6.0;

/// Kind of contact between two overlapping actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactKind {
    /// The attacker came down on top of the target.
    Stomp,
    /// Anything else.
    Side,
}

/// Whether two actors overlap after the tile sweep.
#[must_use]
pub fn touching(a: &Body, b: &Body) -> bool {
    a.bounds.intersects(&b.bounds)
}

/// Classify a contact by vertical approach.
///
/// A stomp needs the attacker to be descending relative to the target and to
/// have started the frame with its feet no lower than the target's head plus
/// [`STOMP_TOLERANCE`].
#[must_use]
pub fn classify(attacker: &Body, target: &Body) -> ContactKind {
    let descending = attacker.displacement.y - target.displacement.y > 0.0;
    let feet = attacker.previous_bounds().bottom();
    let head = target.previous_bounds().top();
    if descending && feet <= head + STOMP_TOLERANCE {
        ContactKind::Stomp
    } else {
        ContactKind::Side
    }
}
