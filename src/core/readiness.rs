//! Readiness tracking and lifecycle notifications.
//!
//! The provider's state lives here together with a broadcast channel that
//! replays every transition to current subscribers in the order the
//! transitions were decided.

use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::refresh::RefreshOutcome;
use crate::error::{ErrorCode, OfrepError};
use crate::types::ReadinessState;

/// Buffered lifecycle events per subscriber before it starts lagging.
pub const LIFECYCLE_CHANNEL_CAPACITY: usize = 64;

/// What caused a refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Initialize,
    ContextChange,
    Poll,
}

/// The state change a refresh outcome calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Stay,
    To(ReadinessState),
    /// Emit `ConfigurationChanged`, then settle on `Ready`.
    ConfigurationChanged,
}

/// Decides the transition for a finished refresh cycle.
pub fn decide(
    trigger: RefreshTrigger,
    current: ReadinessState,
    outcome: &Result<RefreshOutcome, OfrepError>,
) -> Transition {
    if let Err(error) = outcome {
        if error.is_fatal() {
            return Transition::To(ReadinessState::Fatal);
        }
    }

    match trigger {
        RefreshTrigger::Initialize => match outcome {
            Ok(RefreshOutcome::Updated) => Transition::To(ReadinessState::Ready),
            _ => Transition::To(ReadinessState::Error),
        },
        RefreshTrigger::ContextChange => match outcome {
            Ok(RefreshOutcome::Updated) | Ok(RefreshOutcome::NotModified) => {
                Transition::To(ReadinessState::Ready)
            }
            Ok(RefreshOutcome::RateLimited) => Transition::Stay,
            Err(e) if e.code == ErrorCode::RateLimited => Transition::Stay,
            Err(_) => Transition::To(ReadinessState::Error),
        },
        RefreshTrigger::Poll => match outcome {
            Ok(RefreshOutcome::Updated) => Transition::ConfigurationChanged,
            Ok(RefreshOutcome::NotModified) => match current {
                ReadinessState::Error | ReadinessState::Stale => {
                    Transition::To(ReadinessState::Ready)
                }
                _ => Transition::Stay,
            },
            Ok(RefreshOutcome::RateLimited) => Transition::Stay,
            Err(e) if e.code == ErrorCode::RateLimited => Transition::To(ReadinessState::Stale),
            Err(_) => Transition::To(ReadinessState::Error),
        },
    }
}

/// Current readiness plus the lifecycle stream.
pub struct ReadinessTracker {
    state: Mutex<ReadinessState>,
    events: broadcast::Sender<ReadinessState>,
}

impl Default for ReadinessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessTracker {
    /// Creates a tracker in `NotReady`.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(LIFECYCLE_CHANNEL_CAPACITY);
        Self {
            state: Mutex::new(ReadinessState::NotReady),
            events,
        }
    }

    /// Current state.
    pub fn status(&self) -> ReadinessState {
        *self.state.lock()
    }

    /// Whether the terminal `Fatal` state was reached.
    pub fn is_fatal(&self) -> bool {
        self.status() == ReadinessState::Fatal
    }

    /// Receives every transition made after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ReadinessState> {
        self.events.subscribe()
    }

    /// Moves to `next` and notifies subscribers if the state actually changed.
    ///
    /// Returns whether a transition happened. `Fatal` is never left.
    pub fn transition(&self, next: ReadinessState) -> bool {
        let mut state = self.state.lock();
        Self::transition_locked(&mut state, &self.events, next)
    }

    /// Applies a decision from [`decide`] under the state lock.
    ///
    /// `ConfigurationChanged` is always emitted, followed by `Ready`.
    pub fn apply(&self, transition: Transition) {
        let mut state = self.state.lock();
        match transition {
            Transition::Stay => {}
            Transition::To(next) => {
                Self::transition_locked(&mut state, &self.events, next);
            }
            Transition::ConfigurationChanged => {
                if *state == ReadinessState::Fatal {
                    return;
                }
                *state = ReadinessState::ConfigurationChanged;
                let _ = self.events.send(ReadinessState::ConfigurationChanged);
                tracing::debug!("Flag configuration changed");
                Self::transition_locked(&mut state, &self.events, ReadinessState::Ready);
            }
        }
    }

    fn transition_locked(
        state: &mut ReadinessState,
        events: &broadcast::Sender<ReadinessState>,
        next: ReadinessState,
    ) -> bool {
        if *state == next || *state == ReadinessState::Fatal {
            return false;
        }

        tracing::debug!("Readiness {} -> {}", state, next);
        if next == ReadinessState::Fatal {
            tracing::error!("Provider entered fatal state, refreshes stopped");
        }

        *state = next;
        // No subscribers is fine.
        let _ = events.send(next);
        true
    }
}
