//! Session core for Intervox: domain types, the answer ledger, and the
//! turn-taking controller that sequences think-time, capture, transcription,
//! follow-up probes, and progression across the question plan.

pub mod backend;
pub mod controller;
pub mod ledger;
pub mod report;
pub mod store;
pub mod turn;
pub mod types;

pub use backend::{
    BackendError, FollowUpProbe, InterviewBackend, MockBackend, PlanRequest, ResumeProfile,
    SkillScore, TurnAdvice,
};
pub use controller::{ControllerConfig, SessionCommand, SessionEvent, TurnController};
pub use ledger::AnswerLedger;
pub use report::local_report;
pub use store::{MemoryResultStore, ResultStore};
pub use turn::{
    FollowUpStage, FollowUpTurn, PendingAction, SessionError, TurnPhase, TurnState, MAX_REPEATS,
};
pub use types::{
    AnswerRecord, InterviewPlan, Question, QuestionKind, QuestionScore, Report, SaveState,
    SessionMeta,
};
