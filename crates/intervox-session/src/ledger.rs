//! The answer ledger: the ordered, id-keyed collection of submitted answers
//! for the current session. It only grows or overwrites; there is no
//! deletion. Discarded at session end in favor of the persisted summary.

use crate::types::AnswerRecord;

#[derive(Debug, Default, Clone)]
pub struct AnswerLedger {
    records: Vec<AnswerRecord>,
}

impl AnswerLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace-by-id or append. An id present twice keeps the latest record
    /// at its original position.
    pub fn upsert(&mut self, record: AnswerRecord) {
        match self
            .records
            .iter_mut()
            .find(|r| r.question_id == record.question_id)
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Append follow-up content to an existing answer. No-op when the
    /// question has no record yet.
    pub fn append_follow_up(&mut self, question_id: &str, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(record) = self
            .records
            .iter_mut()
            .find(|r| r.question_id == question_id)
        {
            if record.user_answer.is_empty() {
                record.user_answer = text.to_string();
            } else {
                record.user_answer.push('\n');
                record.user_answer.push_str(text);
            }
        }
    }

    pub fn get(&self, question_id: &str) -> Option<&AnswerRecord> {
        self.records.iter().find(|r| r.question_id == question_id)
    }

    pub fn contains(&self, question_id: &str) -> bool {
        self.get(question_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The ordered list consumed by the scoring call.
    pub fn to_payload(&self) -> Vec<AnswerRecord> {
        self.records.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Question, QuestionKind};

    fn question(id: &str) -> Question {
        Question {
            id: id.to_string(),
            text: format!("prompt {}", id),
            topic: String::new(),
            kind: QuestionKind::Standard,
            interviewer: "alex".to_string(),
            audio_url: None,
            ideal_answer: None,
        }
    }

    #[test]
    fn upsert_never_duplicates_an_id() {
        let mut ledger = AnswerLedger::new();
        ledger.upsert(AnswerRecord::for_question(&question("q1"), "first".into()));
        ledger.upsert(AnswerRecord::for_question(&question("q2"), "other".into()));
        ledger.upsert(AnswerRecord::for_question(&question("q1"), "second".into()));

        assert_eq!(ledger.len(), 2);
        let ids: Vec<_> = ledger
            .to_payload()
            .iter()
            .map(|r| r.question_id.clone())
            .collect();
        assert_eq!(ids, vec!["q1", "q2"]);
        assert_eq!(ledger.get("q1").map(|r| r.user_answer.as_str()), Some("second"));
    }

    #[test]
    fn upsert_preserves_first_seen_order() {
        let mut ledger = AnswerLedger::new();
        for id in ["q1", "q2", "q3"] {
            ledger.upsert(AnswerRecord::for_question(&question(id), id.into()));
        }
        ledger.upsert(AnswerRecord::for_question(&question("q2"), "redone".into()));

        let ids: Vec<_> = ledger
            .to_payload()
            .iter()
            .map(|r| r.question_id.clone())
            .collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn follow_up_appends_to_the_same_record() {
        let mut ledger = AnswerLedger::new();
        ledger.upsert(AnswerRecord::for_question(&question("q1"), "base".into()));
        ledger.append_follow_up("q1", "more detail");
        assert_eq!(
            ledger.get("q1").map(|r| r.user_answer.as_str()),
            Some("base\nmore detail")
        );
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn follow_up_fills_an_empty_answer() {
        let mut ledger = AnswerLedger::new();
        ledger.upsert(AnswerRecord::for_question(&question("q1"), String::new()));
        ledger.append_follow_up("q1", "actual content");
        assert_eq!(
            ledger.get("q1").map(|r| r.user_answer.as_str()),
            Some("actual content")
        );
    }
}
