//! Session lifecycle state machine.

use serde::Serialize;

/// Lifecycle state of a relay session.
///
/// A session that is not in the registry at all is simply absent; no state
/// value represents that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// The agent process is being spawned.
    #[default]
    Starting,
    /// The agent process is live and relaying.
    Running,
    /// The agent process is being interrupted and torn down.
    Stopping,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Starting -> Running
    /// - Starting -> Stopping (spawn abandoned)
    /// - Running -> Stopping
    /// - Stopping -> Starting (restart)
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (*self, target),
            (Starting, Running) | (Starting, Stopping) | (Running, Stopping) | (Stopping, Starting)
        )
    }

    /// Attempt to transition to a new state.
    ///
    /// Returns `Ok(())` if the transition is valid, or an error otherwise.
    pub fn transition_to(&mut self, target: SessionState) -> crate::Result<()> {
        if self.can_transition_to(target) {
            *self = target;
            Ok(())
        } else {
            Err(crate::error::RelayError::InvalidStateTransition {
                from: *self,
                to: target,
            })
        }
    }

    /// Check if the session can accept turn input.
    pub fn is_running(&self) -> bool {
        matches!(self, SessionState::Running)
    }
}
