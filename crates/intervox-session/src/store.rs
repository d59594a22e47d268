//! Result persistence seam.
//!
//! The controller flushes the ledger through this trait when the session
//! ends; the durable JSON implementation lives in `intervox-store`.

use crate::types::{AnswerRecord, SessionMeta};
use intervox_foundation::StoreError;
use parking_lot::Mutex;

pub trait ResultStore: Send + Sync {
    fn save_results(&self, meta: &SessionMeta, records: &[AnswerRecord]) -> Result<(), StoreError>;
}

/// In-memory store for tests and throwaway runs.
#[derive(Default)]
pub struct MemoryResultStore {
    saved: Mutex<Vec<(SessionMeta, Vec<AnswerRecord>)>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(SessionMeta, Vec<AnswerRecord>)> {
        self.saved.lock().clone()
    }

    pub fn last_records(&self) -> Option<Vec<AnswerRecord>> {
        self.saved.lock().last().map(|(_, records)| records.clone())
    }
}

impl ResultStore for MemoryResultStore {
    fn save_results(&self, meta: &SessionMeta, records: &[AnswerRecord]) -> Result<(), StoreError> {
        self.saved.lock().push((meta.clone(), records.to_vec()));
        Ok(())
    }
}
