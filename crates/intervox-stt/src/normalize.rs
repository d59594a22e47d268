//! Transcript normalization.
//!
//! A filler-only utterance ("I don't know", a bare "um") is stored as the
//! empty string: a deliberate non-answer is informative and must not be
//! confused with a transcription failure. Anything with real content is
//! preserved verbatim.

/// Utterances that carry no content when they are the entire transcript.
/// Compared after lowercasing, whitespace collapsing, and stripping of
/// trailing punctuation.
const FILLER_DENYLIST: &[&str] = &[
    "i don't know",
    "i dont know",
    "i don't know why",
    "i dont know why",
    "i'm not sure",
    "im not sure",
    "no idea",
    "no answer",
    "nothing",
    "um",
    "uh",
    "uhm",
    "hmm",
    "hm",
    "er",
    "pass",
    "skip",
];

/// Canonical form used only for the denylist comparison; the returned
/// transcript is never rewritten.
fn canonical(raw: &str) -> String {
    let lowered = raw.to_lowercase();
    let stripped = lowered.trim_matches(|c: char| c.is_whitespace() || ".,!?…".contains(c));
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a raw transcript for ledger storage.
pub fn normalize_transcript(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if FILLER_DENYLIST.contains(&canonical(trimmed).as_str()) {
        return String::new();
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filler_only_collapses_to_empty() {
        assert_eq!(normalize_transcript("I don't know why"), "");
        assert_eq!(normalize_transcript("  Um.  "), "");
        assert_eq!(normalize_transcript("I'M NOT SURE!"), "");
        assert_eq!(normalize_transcript("i  don't   know"), "");
    }

    #[test]
    fn content_is_preserved_verbatim() {
        let answer = "I don't know why, but I'd start by profiling the hot path.";
        assert_eq!(normalize_transcript(answer), answer);
    }

    #[test]
    fn surrounding_whitespace_is_trimmed() {
        assert_eq!(normalize_transcript("  real answer  "), "real answer");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_transcript(""), "");
        assert_eq!(normalize_transcript("   "), "");
    }
}
