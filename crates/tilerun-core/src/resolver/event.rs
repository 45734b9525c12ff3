//! Event resolver for the event log.
//!
//! The `EventResolver` captures event outputs without mutating level state.
//! It runs last in the resolution phase and sees both the events the step
//! phases emitted (bumps, pipe transits) and the events other resolvers
//! derived (stomps, score, deaths).
//!
//! # Usage
//!
//! The log is drained with `take_events()`, typically once per frame by the
//! host that plays sounds and updates the HUD. A simulation with an event
//! sink drains each step's events into the sink instead.

use std::sync::{Mutex, PoisonError};

use crate::level_state::LevelState;
use crate::output::{GameEvent, OutputEnvelope, OutputKind};

use super::Resolver;

/// Resolver that records event outputs.
///
/// # Thread Safety
///
/// The internal log is protected by a `Mutex` to satisfy the `Send + Sync`
/// requirements of the `Resolver` trait, even though the resolver is only
/// used from the step loop.
///
/// # Example
///
/// ```
/// use tilerun_core::output::{GameEvent, OutputEnvelope};
/// use tilerun_core::level_state::LevelOutcome;
/// use tilerun_core::resolver::EventResolver;
///
/// let resolver = EventResolver::new();
/// resolver.record(OutputEnvelope::new(
///     GameEvent::OutcomeChanged { outcome: LevelOutcome::Cleared }.into(),
///     None,
///     0,
///     0,
/// ));
///
/// assert_eq!(resolver.event_count(), 1);
/// assert_eq!(resolver.take_events().len(), 1);
/// assert!(resolver.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct EventResolver {
    event_log: Mutex<Vec<OutputEnvelope>>,
}

impl EventResolver {
    /// Creates a new event resolver with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            event_log: Mutex::new(Vec::new()),
        }
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<OutputEnvelope>> {
        self.event_log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Drains and returns all recorded events in the order they were recorded.
    pub fn take_events(&self) -> Vec<OutputEnvelope> {
        std::mem::take(&mut *self.log())
    }

    /// Record one event envelope directly.
    ///
    /// Used for events produced after resolution, such as the level outcome.
    /// Non-event outputs are ignored.
    pub fn record(&self, envelope: OutputEnvelope) {
        if envelope.output().is_event() {
            self.log().push(envelope);
        }
    }

    /// Removes and returns the events recorded from position `from` onwards.
    pub fn drain_from(&self, from: usize) -> Vec<OutputEnvelope> {
        let mut log = self.log();
        let from = from.min(log.len());
        log.drain(from..).collect()
    }

    /// Returns the number of events currently in the log.
    #[must_use]
    pub fn event_count(&self) -> usize {
        self.log().len()
    }

    /// Returns true if the event log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    /// Clears all events from the log without returning them.
    pub fn clear(&self) {
        self.log().clear();
    }
}

impl Resolver for EventResolver {
    fn handles(&self) -> &[OutputKind] {
        &[OutputKind::Event]
    }

    fn resolve(
        &self,
        outputs: &[&OutputEnvelope],
        _current: &LevelState,
        _next: &mut LevelState,
    ) -> Vec<GameEvent> {
        let mut log = self.log();
        for envelope in outputs {
            if envelope.output().is_event() {
                log.push((*envelope).clone());
            }
        }
        Vec::new()
    }
}
