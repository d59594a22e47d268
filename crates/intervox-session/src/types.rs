//! Domain types for an interview session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a question was issued by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    Standard,
    FollowUp,
    Challenge,
    DeepDive,
    Reference,
}

/// One planned interview question. Immutable once issued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub kind: QuestionKind,
    #[serde(default)]
    pub interviewer: String,
    /// Pre-rendered prompt audio, when the backend provides it.
    #[serde(default)]
    pub audio_url: Option<String>,
    #[serde(default)]
    pub ideal_answer: Option<String>,
}

/// Session-level metadata, set once at session start. `session_id` is
/// assigned asynchronously when the backend acknowledges session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMeta {
    pub role: String,
    pub difficulty: String,
    pub question_count: usize,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// The ordered question plan produced by the external planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewPlan {
    pub meta: SessionMeta,
    pub questions: Vec<Question>,
}

impl InterviewPlan {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }
}

/// One completed (or explicitly empty) answer, keyed by question id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub question_id: String,
    pub prompt: String,
    #[serde(default)]
    pub interviewer: String,
    #[serde(default)]
    pub kind: QuestionKind,
    /// Empty string means "no usable answer", which is informative and
    /// distinct from a transcription failure sentinel.
    pub user_answer: String,
    #[serde(default)]
    pub ideal_answer: Option<String>,
    pub answered_at: DateTime<Utc>,
}

impl AnswerRecord {
    pub fn for_question(question: &Question, user_answer: String) -> Self {
        Self {
            question_id: question.id.clone(),
            prompt: question.text.clone(),
            interviewer: question.interviewer.clone(),
            kind: question.kind,
            user_answer,
            ideal_answer: question.ideal_answer.clone(),
            answered_at: Utc::now(),
        }
    }
}

/// Per-turn answer persistence indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaveState {
    Idle,
    Saving,
    Saved,
    Failed,
}

/// Per-question entry of a scored report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionScore {
    pub question_id: String,
    pub prompt: String,
    pub user_answer: String,
    /// 0-100.
    pub score: f32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Final session report, either backend-scored or locally approximated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    #[serde(default)]
    pub session_id: Option<String>,
    pub overall_score: f32,
    pub summary: String,
    /// True when the report was synthesized locally because the scoring
    /// backend was unreachable.
    pub approximate: bool,
    pub per_question: Vec<QuestionScore>,
}
