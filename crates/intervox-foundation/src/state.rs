use crate::error::AppError;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::RwLock;
use std::sync::Arc;

/// Coarse application lifecycle. The per-question turn machine lives in the
/// session crate; this tracks the session as a whole.
#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Initializing,
    /// Media acquired, plan loaded, waiting for the interview to begin.
    Ready,
    InterviewActive,
    /// Final answers are being flushed and the report fetched.
    Finalizing,
    Stopped,
}

pub struct StateManager {
    state: Arc<RwLock<AppState>>,
    state_tx: Sender<AppState>,
    state_rx: Receiver<AppState>,
}

impl StateManager {
    pub fn new() -> Self {
        let (state_tx, state_rx) = crossbeam_channel::unbounded();
        Self {
            state: Arc::new(RwLock::new(AppState::Initializing)),
            state_tx,
            state_rx,
        }
    }

    pub fn transition(&self, new_state: AppState) -> Result<(), AppError> {
        let mut current = self.state.write();

        let valid = match (&*current, &new_state) {
            (AppState::Initializing, AppState::Ready) => true,
            (AppState::Initializing, AppState::Stopped) => true,
            (AppState::Ready, AppState::InterviewActive) => true,
            (AppState::Ready, AppState::Stopped) => true,
            (AppState::InterviewActive, AppState::Finalizing) => true,
            (AppState::InterviewActive, AppState::Stopped) => true,
            (AppState::Finalizing, AppState::Stopped) => true,
            _ => false,
        };

        if !valid {
            return Err(AppError::Fatal(format!(
                "Invalid state transition: {:?} -> {:?}",
                *current, new_state
            )));
        }

        tracing::info!("State transition: {:?} -> {:?}", *current, new_state);
        *current = new_state.clone();
        let _ = self.state_tx.send(new_state);
        Ok(())
    }

    pub fn current(&self) -> AppState {
        self.state.read().clone()
    }

    pub fn subscribe(&self) -> Receiver<AppState> {
        self.state_rx.clone()
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_lifecycle_is_accepted() {
        let mgr = StateManager::new();
        mgr.transition(AppState::Ready).unwrap();
        mgr.transition(AppState::InterviewActive).unwrap();
        mgr.transition(AppState::Finalizing).unwrap();
        mgr.transition(AppState::Stopped).unwrap();
        assert_eq!(mgr.current(), AppState::Stopped);
    }

    #[test]
    fn skipping_ready_is_rejected() {
        let mgr = StateManager::new();
        assert!(mgr.transition(AppState::InterviewActive).is_err());
        assert_eq!(mgr.current(), AppState::Initializing);
    }

    #[test]
    fn subscribers_observe_transitions() {
        let mgr = StateManager::new();
        let rx = mgr.subscribe();
        mgr.transition(AppState::Ready).unwrap();
        assert_eq!(rx.try_recv().unwrap(), AppState::Ready);
    }
}
