//! Per-frame player input.
//!
//! Hosts hand the simulation one [`Buttons`] set per player per step. The
//! simulation latches it against the previous frame to detect presses.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Buttons held during a frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct Buttons: u8 {
        /// Move left
        const LEFT = 1 << 0;
        /// Move right
        const RIGHT = 1 << 1;
        /// Look up / enter upward pipes
        const UP = 1 << 2;
        /// Crouch / enter downward pipes
        const DOWN = 1 << 3;
        /// Run / throw fireballs
        const RUN = 1 << 4;
        /// Jump / swim
        const JUMP = 1 << 5;
    }
}

/// Latched input for one frame: what is held and what went down this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InputFrame {
    /// Buttons held this frame
    pub held: Buttons,
    /// Buttons held this frame but not the previous one
    pub pressed: Buttons,
}

impl InputFrame {
    /// Latch `current` against the previous frame's buttons.
    #[must_use]
    pub fn latch(current: Buttons, previous: Buttons) -> Self {
        Self {
            held: current,
            pressed: current.difference(previous),
        }
    }

    /// Whether `button` is held.
    #[must_use]
    pub fn holds(&self, button: Buttons) -> bool {
        self.held.contains(button)
    }

    /// Whether `button` went down this frame.
    #[must_use]
    pub fn pressed(&self, button: Buttons) -> bool {
        self.pressed.contains(button)
    }

    /// Horizontal direction: -1, 0 or 1. Opposing directions cancel.
    #[must_use]
    pub fn horizontal(&self) -> f32 {
        match (self.holds(Buttons::LEFT), self.holds(Buttons::RIGHT)) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_detected_once() {
        let first = InputFrame::latch(Buttons::JUMP, Buttons::empty());
        assert!(first.pressed(Buttons::JUMP));
        let second = InputFrame::latch(Buttons::JUMP, Buttons::JUMP);
        assert!(!second.pressed(Buttons::JUMP));
        assert!(second.holds(Buttons::JUMP));
    }

    #[test]
    fn opposing_directions_cancel() {
        let frame = InputFrame::latch(Buttons::LEFT | Buttons::RIGHT, Buttons::empty());
        assert_eq!(frame.horizontal(), 0.0);
        assert_eq!(
            InputFrame::latch(Buttons::LEFT, Buttons::empty()).horizontal(),
            -1.0
        );
    }
}
