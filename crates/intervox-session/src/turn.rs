//! Turn phases and transient per-question state.

use thiserror::Error;

/// Repeats allowed per question; a further request is a no-op.
pub const MAX_REPEATS: u8 = 2;

/// Named states of the turn machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    ThinkTime,
    Recording,
    Transcribing,
    AwaitingFollowUp,
    ReadyToAdvance,
    Ended,
}

impl TurnPhase {
    /// The transition table. Anything not listed is invalid and rejected.
    pub fn can_transition(self, next: TurnPhase) -> bool {
        use TurnPhase::*;
        matches!(
            (self, next),
            (Idle, ThinkTime)
                | (Idle, Ended)
                | (ThinkTime, Recording)
                | (ThinkTime, Ended)
                | (Recording, Transcribing)
                | (Transcribing, ReadyToAdvance)
                | (Transcribing, AwaitingFollowUp)
                | (ReadyToAdvance, AwaitingFollowUp)
                | (ReadyToAdvance, ThinkTime)
                | (ReadyToAdvance, Ended)
                | (AwaitingFollowUp, ReadyToAdvance)
                | (AwaitingFollowUp, Ended)
        )
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid turn transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TurnPhase, to: TurnPhase },

    #[error("Session has no questions")]
    EmptyPlan,

    #[error("Media error: {0}")]
    Media(#[from] intervox_foundation::MediaError),
}

/// Deferred navigation intent, held while capture or transcription is still
/// in flight. A single slot, consumed exactly once when transcription
/// settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Next,
    End,
    FollowUp,
}

/// Stage of the follow-up sub-turn. Not a new top-level question; the
/// transcript is appended to the current answer record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpStage {
    Prompt,
    Recording,
    Transcribing,
}

#[derive(Debug, Clone)]
pub struct FollowUpTurn {
    pub prompt: String,
    pub stage: FollowUpStage,
}

/// Transient state, reset when a new question becomes current.
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    pub repeat_count: u8,
    pub pending: Option<PendingAction>,
    pub follow_up: Option<FollowUpTurn>,
}

impl TurnState {
    pub fn reset(&mut self) {
        *self = TurnState::default();
    }

    /// Record a repeat request. Returns false when the cap is reached and
    /// the request must be ignored.
    pub fn try_repeat(&mut self) -> bool {
        if self.repeat_count >= MAX_REPEATS {
            return false;
        }
        self.repeat_count += 1;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_are_valid() {
        use TurnPhase::*;
        for (from, to) in [
            (Idle, ThinkTime),
            (ThinkTime, Recording),
            (Recording, Transcribing),
            (Transcribing, ReadyToAdvance),
            (ReadyToAdvance, ThinkTime),
            (ReadyToAdvance, Ended),
        ] {
            assert!(from.can_transition(to), "{:?} -> {:?}", from, to);
        }
    }

    #[test]
    fn capture_is_unreachable_from_idle() {
        assert!(!TurnPhase::Idle.can_transition(TurnPhase::Recording));
        assert!(!TurnPhase::Idle.can_transition(TurnPhase::Transcribing));
    }

    #[test]
    fn recording_cannot_jump_straight_to_advance() {
        assert!(!TurnPhase::Recording.can_transition(TurnPhase::ReadyToAdvance));
        assert!(!TurnPhase::Recording.can_transition(TurnPhase::ThinkTime));
    }

    #[test]
    fn repeat_cap_is_two() {
        let mut turn = TurnState::default();
        assert!(turn.try_repeat());
        assert!(turn.try_repeat());
        assert!(!turn.try_repeat());
        assert_eq!(turn.repeat_count, MAX_REPEATS);
    }

    #[test]
    fn reset_clears_everything() {
        let mut turn = TurnState {
            repeat_count: 2,
            pending: Some(PendingAction::End),
            follow_up: Some(FollowUpTurn {
                prompt: "why?".to_string(),
                stage: FollowUpStage::Recording,
            }),
        };
        turn.reset();
        assert_eq!(turn.repeat_count, 0);
        assert!(turn.pending.is_none());
        assert!(turn.follow_up.is_none());
    }
}
