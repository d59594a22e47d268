//! Durable session context.
//!
//! One versioned JSON document replaces the ad hoc per-key browser blobs of
//! the original flow: résumé analysis, job description, plan, results,
//! session id, auth token. Unknown fields are ignored on read; a document
//! from a newer schema or unparseable JSON clears the store and surfaces a
//! corrupt-state error whose recovery is restarting the flow.

use chrono::{DateTime, Utc};
use intervox_foundation::StoreError;
use intervox_session::{AnswerRecord, InterviewPlan, ResultStore, ResumeProfile, SessionMeta};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const SCHEMA_VERSION: u32 = 1;

/// Final answers as flushed at session end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResults {
    pub meta: SessionMeta,
    pub records: Vec<AnswerRecord>,
    pub saved_at: DateTime<Utc>,
}

/// The whole persisted session context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDocument {
    pub version: u32,
    #[serde(default)]
    pub resume: Option<ResumeProfile>,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub plan: Option<InterviewPlan>,
    #[serde(default)]
    pub results: Option<SessionResults>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl Default for SessionDocument {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            resume: None,
            job_description: None,
            plan: None,
            results: None,
            session_id: None,
            auth_token: None,
        }
    }
}

/// File-backed store with atomic writes.
pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, or a fresh one when none exists. Corrupt or
    /// newer-versioned documents clear the store before erroring.
    pub fn load(&self) -> Result<SessionDocument, StoreError> {
        if !self.path.exists() {
            return Ok(SessionDocument::default());
        }

        let raw = fs::read_to_string(&self.path)?;
        let doc: SessionDocument = match serde_json::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(target: "store", "Corrupt session document, clearing: {}", e);
                self.clear()?;
                return Err(StoreError::Corrupt(e.to_string()));
            }
        };

        if doc.version > SCHEMA_VERSION {
            warn!(
                target: "store",
                "Session document from newer schema {} (supported {}), clearing",
                doc.version,
                SCHEMA_VERSION
            );
            self.clear()?;
            return Err(StoreError::UnsupportedVersion {
                found: doc.version,
                supported: SCHEMA_VERSION,
            });
        }

        // Older documents migrate by field defaults; re-stamp the version.
        if doc.version < SCHEMA_VERSION {
            debug!(
                target: "store",
                "Migrating session document {} -> {}",
                doc.version,
                SCHEMA_VERSION
            );
            let mut doc = doc;
            doc.version = SCHEMA_VERSION;
            return Ok(doc);
        }

        Ok(doc)
    }

    /// Atomic write: serialize to a sibling temp file, then rename over.
    pub fn save(&self, doc: &SessionDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(doc)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Read-modify-write helper.
    pub fn update(
        &self,
        mutate: impl FnOnce(&mut SessionDocument),
    ) -> Result<SessionDocument, StoreError> {
        let mut doc = self.load()?;
        mutate(&mut doc);
        doc.version = SCHEMA_VERSION;
        self.save(&doc)?;
        Ok(doc)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

impl ResultStore for JsonSessionStore {
    fn save_results(&self, meta: &SessionMeta, records: &[AnswerRecord]) -> Result<(), StoreError> {
        self.update(|doc| {
            doc.session_id = meta.session_id.clone();
            doc.results = Some(SessionResults {
                meta: meta.clone(),
                records: records.to_vec(),
                saved_at: Utc::now(),
            });
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intervox_session::{Question, QuestionKind};

    fn store() -> (tempfile::TempDir, JsonSessionStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path().join("session.json"));
        (dir, store)
    }

    fn meta() -> SessionMeta {
        SessionMeta {
            role: "backend engineer".to_string(),
            difficulty: "medium".to_string(),
            question_count: 1,
            session_id: Some("s-1".to_string()),
        }
    }

    #[test]
    fn missing_file_loads_a_fresh_document() {
        let (_dir, store) = store();
        let doc = store.load().unwrap();
        assert_eq!(doc.version, SCHEMA_VERSION);
        assert!(doc.plan.is_none());
    }

    #[test]
    fn document_round_trips() {
        let (_dir, store) = store();
        store
            .update(|doc| {
                doc.job_description = Some("build services".to_string());
                doc.plan = Some(InterviewPlan {
                    meta: meta(),
                    questions: vec![Question {
                        id: "q1".to_string(),
                        text: "Why?".to_string(),
                        topic: String::new(),
                        kind: QuestionKind::Standard,
                        interviewer: String::new(),
                        audio_url: None,
                        ideal_answer: None,
                    }],
                });
            })
            .unwrap();

        let doc = store.load().unwrap();
        assert_eq!(doc.job_description.as_deref(), Some("build services"));
        assert_eq!(doc.plan.as_ref().map(|p| p.len()), Some(1));
    }

    #[test]
    fn corrupt_json_clears_the_store_and_errors() {
        let (_dir, store) = store();
        fs::write(store.path(), b"{not json").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
        assert!(!store.path().exists(), "corrupt file must be removed");

        // The flow restarts against a fresh document.
        assert!(store.load().is_ok());
    }

    #[test]
    fn newer_schema_clears_the_store_and_errors() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            format!("{{\"version\": {}}}", SCHEMA_VERSION + 1),
        )
        .unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { .. }));
        assert!(!store.path().exists());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let (_dir, store) = store();
        fs::write(
            store.path(),
            format!(
                "{{\"version\": {}, \"some_future_field\": true}}",
                SCHEMA_VERSION
            ),
        )
        .unwrap();
        assert!(store.load().is_ok());
    }

    #[test]
    fn results_flush_through_the_result_store_seam() {
        let (_dir, store) = store();
        let record = AnswerRecord {
            question_id: "q1".to_string(),
            prompt: "p".to_string(),
            interviewer: String::new(),
            kind: QuestionKind::Standard,
            user_answer: "an answer".to_string(),
            ideal_answer: None,
            answered_at: Utc::now(),
        };
        store.save_results(&meta(), &[record]).unwrap();

        let doc = store.load().unwrap();
        let results = doc.results.expect("results stored");
        assert_eq!(results.records.len(), 1);
        assert_eq!(doc.session_id.as_deref(), Some("s-1"));
    }
}
