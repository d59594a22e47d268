//! Locally synthesized fallback report.
//!
//! When the scoring backend is unreachable at session end, the user still
//! gets a report: a clearly labeled approximation computed from answer
//! coverage and length, never a silent failure.

use crate::types::{AnswerRecord, QuestionScore, Report, SessionMeta};

const APPROXIMATE_SUMMARY: &str =
    "Approximate report generated locally; the scoring service was unreachable.";

/// Score one answer on coverage alone: empty answers score zero, longer
/// answers approach 100. This is intentionally crude; the real scoring
/// model is backend-side.
fn approximate_score(answer: &str) -> f32 {
    let words = answer.split_whitespace().count();
    (words as f32 * 4.0).min(100.0)
}

pub fn local_report(meta: &SessionMeta, records: &[AnswerRecord]) -> Report {
    let per_question: Vec<QuestionScore> = records
        .iter()
        .map(|r| QuestionScore {
            question_id: r.question_id.clone(),
            prompt: r.prompt.clone(),
            user_answer: r.user_answer.clone(),
            score: approximate_score(&r.user_answer),
            notes: if r.user_answer.is_empty() {
                Some("No usable answer was captured.".to_string())
            } else {
                None
            },
        })
        .collect();

    let overall_score = if per_question.is_empty() {
        0.0
    } else {
        per_question.iter().map(|q| q.score).sum::<f32>() / per_question.len() as f32
    };

    Report {
        session_id: meta.session_id.clone(),
        overall_score,
        summary: APPROXIMATE_SUMMARY.to_string(),
        approximate: true,
        per_question,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QuestionKind;
    use chrono::Utc;

    fn record(id: &str, answer: &str) -> AnswerRecord {
        AnswerRecord {
            question_id: id.to_string(),
            prompt: "p".to_string(),
            interviewer: String::new(),
            kind: QuestionKind::Standard,
            user_answer: answer.to_string(),
            ideal_answer: None,
            answered_at: Utc::now(),
        }
    }

    fn meta() -> SessionMeta {
        SessionMeta {
            role: "backend engineer".to_string(),
            difficulty: "medium".to_string(),
            question_count: 2,
            session_id: None,
        }
    }

    #[test]
    fn fallback_report_is_labeled_approximate() {
        let report = local_report(&meta(), &[record("q1", "a reasonable answer here")]);
        assert!(report.approximate);
        assert_eq!(report.per_question.len(), 1);
        assert!(report.overall_score > 0.0);
    }

    #[test]
    fn empty_answers_score_zero() {
        let report = local_report(&meta(), &[record("q1", "")]);
        assert_eq!(report.overall_score, 0.0);
        assert!(report.per_question[0].notes.is_some());
    }

    #[test]
    fn no_records_means_zero_overall() {
        let report = local_report(&meta(), &[]);
        assert_eq!(report.overall_score, 0.0);
        assert!(report.per_question.is_empty());
    }
}
