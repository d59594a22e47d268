//! External backend contracts.
//!
//! The scoring, planning, and résumé services are opaque collaborators; this
//! trait is the seam the controller and app speak through. The HTTP
//! implementation lives in `intervox-client`; a scripted mock ships here for
//! tests and offline runs.

use crate::types::{AnswerRecord, InterviewPlan, Question, Report, SessionMeta};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Backend error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Request for a question plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanRequest {
    pub role: String,
    pub difficulty: String,
    pub interviewers: Vec<String>,
    pub count: usize,
}

/// A backend-issued request for the user to elaborate on their last answer
/// before the session advances.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FollowUpProbe {
    pub prompt: String,
    #[serde(default)]
    pub audio_url: Option<String>,
}

/// Per-turn response to an answer submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnAdvice {
    #[serde(default)]
    pub follow_up: Option<FollowUpProbe>,
    /// Interviewer remark to play before the next question.
    #[serde(default)]
    pub interviewer_comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillScore {
    pub name: String,
    /// 0-100.
    pub score: f32,
}

/// Structured résumé analysis returned by the parsing service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub summary: String,
    pub skills: Vec<SkillScore>,
}

#[async_trait]
pub trait InterviewBackend: Send + Sync {
    /// Register a session; the returned id keys all later calls.
    async fn create_session(&self, meta: &SessionMeta) -> Result<String, BackendError>;

    async fn generate_plan(&self, request: &PlanRequest) -> Result<InterviewPlan, BackendError>;

    async fn parse_resume(
        &self,
        file_name: &str,
        data: Vec<u8>,
        job_description: Option<&str>,
    ) -> Result<ResumeProfile, BackendError>;

    /// Submit one completed turn. Best-effort: the controller treats a
    /// failure as a transient save error, never as a blocker. `session_id`
    /// is `None` when the creation ack has not arrived yet.
    async fn submit_answer(
        &self,
        session_id: Option<&str>,
        record: &AnswerRecord,
    ) -> Result<TurnAdvice, BackendError>;

    async fn fetch_report(&self, session_id: &str) -> Result<Report, BackendError>;
}

/// Scripted backend for tests and the offline demo flow.
pub struct MockBackend {
    /// Advice replayed per submission, keyed by question id; unkeyed
    /// submissions drain `default_advice`.
    advice: Mutex<HashMap<String, VecDeque<TurnAdvice>>>,
    default_advice: TurnAdvice,
    pub submissions: Mutex<Vec<AnswerRecord>>,
    fail_submits: bool,
    fail_report: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            advice: Mutex::new(HashMap::new()),
            default_advice: TurnAdvice::default(),
            submissions: Mutex::new(Vec::new()),
            fail_submits: false,
            fail_report: false,
        }
    }

    /// Queue advice for a specific question id.
    pub fn with_advice(self, question_id: impl Into<String>, advice: TurnAdvice) -> Self {
        self.advice
            .lock()
            .entry(question_id.into())
            .or_default()
            .push_back(advice);
        self
    }

    /// Every submission fails as if the network were down.
    pub fn failing_submits(mut self) -> Self {
        self.fail_submits = true;
        self
    }

    /// Report retrieval fails, forcing the local fallback report.
    pub fn failing_report(mut self) -> Self {
        self.fail_report = true;
        self
    }

    pub fn submitted(&self) -> Vec<AnswerRecord> {
        self.submissions.lock().clone()
    }

    fn sample_question(index: usize) -> Question {
        let prompts = [
            "Tell me about a challenging project you worked on recently.",
            "How do you approach debugging a system you did not write?",
            "Describe a time you disagreed with a teammate on a design.",
            "What trade-offs would you weigh when caching aggressively?",
            "How do you keep a long-running migration safe to roll back?",
        ];
        Question {
            id: format!("q{}", index + 1),
            text: prompts[index % prompts.len()].to_string(),
            topic: "general".to_string(),
            kind: Default::default(),
            interviewer: "alex".to_string(),
            audio_url: None,
            ideal_answer: None,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl InterviewBackend for MockBackend {
    async fn create_session(&self, _meta: &SessionMeta) -> Result<String, BackendError> {
        Ok("mock-session-1".to_string())
    }

    async fn generate_plan(&self, request: &PlanRequest) -> Result<InterviewPlan, BackendError> {
        let questions = (0..request.count.max(1)).map(Self::sample_question).collect();
        Ok(InterviewPlan {
            meta: SessionMeta {
                role: request.role.clone(),
                difficulty: request.difficulty.clone(),
                question_count: request.count.max(1),
                session_id: None,
            },
            questions,
        })
    }

    async fn parse_resume(
        &self,
        _file_name: &str,
        _data: Vec<u8>,
        _job_description: Option<&str>,
    ) -> Result<ResumeProfile, BackendError> {
        Ok(ResumeProfile {
            summary: "Generalist engineer with backend focus".to_string(),
            skills: vec![SkillScore {
                name: "rust".to_string(),
                score: 80.0,
            }],
        })
    }

    async fn submit_answer(
        &self,
        _session_id: Option<&str>,
        record: &AnswerRecord,
    ) -> Result<TurnAdvice, BackendError> {
        if self.fail_submits {
            return Err(BackendError::Network("connection refused".to_string()));
        }
        self.submissions.lock().push(record.clone());
        let scripted = self
            .advice
            .lock()
            .get_mut(&record.question_id)
            .and_then(|q| q.pop_front());
        Ok(scripted.unwrap_or_else(|| self.default_advice.clone()))
    }

    async fn fetch_report(&self, session_id: &str) -> Result<Report, BackendError> {
        if self.fail_report {
            return Err(BackendError::Unavailable("scoring service down".to_string()));
        }
        let submissions = self.submissions.lock();
        Ok(Report {
            session_id: Some(session_id.to_string()),
            overall_score: 75.0,
            summary: "Scored by mock backend".to_string(),
            approximate: false,
            per_question: submissions
                .iter()
                .map(|r| crate::types::QuestionScore {
                    question_id: r.question_id.clone(),
                    prompt: r.prompt.clone(),
                    user_answer: r.user_answer.clone(),
                    score: 75.0,
                    notes: None,
                })
                .collect(),
        })
    }
}
