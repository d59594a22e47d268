//! HTTP client for the external interview backend.
//!
//! Implements the `InterviewBackend` seam from `intervox-session` over the
//! five service contracts: résumé parsing, question-plan generation, session
//! registration, per-turn answer submission, and report retrieval. Also
//! resolves pre-rendered prompt audio URLs for the playback queue.

use async_trait::async_trait;
use intervox_session::{
    AnswerRecord, BackendError, InterviewBackend, InterviewPlan, PlanRequest, Report,
    ResumeProfile, SessionMeta, TurnAdvice,
};
use intervox_tts::{ClipFetcher, TtsError, TtsResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8700".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

#[derive(Serialize)]
struct CreateSessionRequest<'a> {
    role: &'a str,
    difficulty: &'a str,
    question_count: usize,
}

#[derive(Deserialize)]
struct CreateSessionResponse {
    session_id: String,
}

impl HttpBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, BackendError> {
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(BackendError::Service {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json()
            .await
            .map_err(|e| BackendError::MalformedResponse(e.to_string()))
    }

    async fn post_json<Req: Serialize + ?Sized, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, BackendError> {
        let request = self.authorize(self.client.post(self.url(path))).json(body);
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn get_json<Resp: DeserializeOwned>(&self, path: &str) -> Result<Resp, BackendError> {
        let request = self.authorize(self.client.get(self.url(path)));
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::read_json(response).await
    }
}

#[async_trait]
impl InterviewBackend for HttpBackend {
    async fn create_session(&self, meta: &SessionMeta) -> Result<String, BackendError> {
        let body = CreateSessionRequest {
            role: &meta.role,
            difficulty: &meta.difficulty,
            question_count: meta.question_count,
        };
        let response: CreateSessionResponse = self.post_json("/sessions", &body).await?;
        debug!(target: "client", "Session registered: {}", response.session_id);
        Ok(response.session_id)
    }

    async fn generate_plan(&self, request: &PlanRequest) -> Result<InterviewPlan, BackendError> {
        self.post_json("/plans", request).await
    }

    async fn parse_resume(
        &self,
        file_name: &str,
        data: Vec<u8>,
        job_description: Option<&str>,
    ) -> Result<ResumeProfile, BackendError> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| BackendError::Network(e.to_string()))?;
        let mut form = reqwest::multipart::Form::new().part("resume", part);
        if let Some(jd) = job_description {
            form = form.text("job_description", jd.to_string());
        }

        let request = self.authorize(self.client.post(self.url("/resume"))).multipart(form);
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;
        Self::read_json(response).await
    }

    async fn submit_answer(
        &self,
        session_id: Option<&str>,
        record: &AnswerRecord,
    ) -> Result<TurnAdvice, BackendError> {
        let session_id = session_id.ok_or_else(|| {
            BackendError::Unavailable("session not registered yet".to_string())
        })?;
        let path = format!("/sessions/{}/answers", session_id);
        self.post_json(&path, record).await
    }

    async fn fetch_report(&self, session_id: &str) -> Result<Report, BackendError> {
        let path = format!("/sessions/{}/report", session_id);
        self.get_json(&path).await
    }
}

#[async_trait]
impl ClipFetcher for HttpBackend {
    async fn fetch(&self, url: &str) -> TtsResult<Vec<u8>> {
        let response = self
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| TtsError::Fetch(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TtsError::Fetch(format!("{} returned {}", url, status)));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TtsError::Fetch(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joining_handles_trailing_slash() {
        let backend = HttpBackend::new(BackendConfig {
            base_url: "http://api.example/".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(backend.url("/plans"), "http://api.example/plans");
    }

    #[tokio::test]
    async fn submit_without_session_id_is_unavailable() {
        let backend = HttpBackend::new(BackendConfig::default()).unwrap();
        let record = AnswerRecord {
            question_id: "q1".to_string(),
            prompt: "p".to_string(),
            interviewer: String::new(),
            kind: Default::default(),
            user_answer: "a".to_string(),
            ideal_answer: None,
            answered_at: chrono::Utc::now(),
        };
        let result = backend.submit_answer(None, &record).await;
        assert!(matches!(result, Err(BackendError::Unavailable(_))));
    }

    #[test]
    fn plan_payload_shape_round_trips() {
        let raw = r#"{
            "meta": {"role": "backend engineer", "difficulty": "hard", "question_count": 2},
            "questions": [
                {"id": "q1", "text": "Why Rust?", "topic": "systems",
                 "kind": "challenge", "interviewer": "sam",
                 "audio_url": "http://api.example/audio/q1.wav"},
                {"id": "q2", "text": "Tell me about ownership."}
            ]
        }"#;
        let plan: InterviewPlan = serde_json::from_str(raw).unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.meta.session_id, None);
        assert!(plan.questions[0].audio_url.is_some());
        assert_eq!(plan.questions[1].interviewer, "");
    }
}
