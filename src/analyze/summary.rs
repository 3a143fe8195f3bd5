// src/analyze/summary.rs
//! Deterministic display summaries (no model calls).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const MIN_SUMMARY_CHARS: usize = 50;
const MAX_SUMMARY_CHARS: usize = 200;
const MAX_SENTENCES: usize = 2;

static RE_SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?。！？]+").expect("sentence regex"));

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMode {
    /// First two sentences, title when the summary is too short.
    #[default]
    Sentences,
    /// Hard character cut with an ellipsis.
    Truncate,
    /// No summary line at all.
    Off,
}

pub fn display_summary(title: &str, raw_summary: &str, mode: SummaryMode) -> String {
    match mode {
        SummaryMode::Sentences => sentence_summary(title, raw_summary),
        SummaryMode::Truncate => truncate_chars(raw_summary, MAX_SUMMARY_CHARS),
        SummaryMode::Off => String::new(),
    }
}

/// Title if the summary is shorter than 50 chars, else its first two sentences.
pub fn sentence_summary(title: &str, raw_summary: &str) -> String {
    if raw_summary.trim().chars().count() < MIN_SUMMARY_CHARS {
        return title.to_string();
    }

    let sentences: Vec<&str> = RE_SENTENCE_END
        .split(raw_summary)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_SENTENCES)
        .collect();
    if !sentences.is_empty() {
        return format!("{}.", sentences.join(". "));
    }

    truncate_chars(raw_summary, MAX_SUMMARY_CHARS)
}

/// Cut to `max` characters, appending "..." only when something was cut.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let cut: String = s.chars().take(max).collect();
        format!("{cut}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_summary_uses_title() {
        let out = sentence_summary("Kuraray launches ceramic", "Short blurb.");
        assert_eq!(out, "Kuraray launches ceramic");
    }

    #[test]
    fn takes_first_two_sentences() {
        let raw = "A major breakthrough in intraoral scanning was announced today. \
                   The new scanner offers unprecedented accuracy! Shipping starts in May.";
        let out = sentence_summary("t", raw);
        assert_eq!(
            out,
            "A major breakthrough in intraoral scanning was announced today. \
             The new scanner offers unprecedented accuracy."
        );
    }

    #[test]
    fn leading_punctuation_does_not_eat_a_sentence() {
        let raw = "... Hello world this sentence is long enough to exceed fifty characters. \
                   Second sentence here. Third.";
        let out = sentence_summary("t", raw);
        assert_eq!(
            out,
            "Hello world this sentence is long enough to exceed fifty characters. \
             Second sentence here."
        );
    }

    #[test]
    fn cjk_sentence_terminators() {
        let raw = "两家牙科设备巨头扩大合作，涉及数字化工作流程整合，将为诊所提供更完整的数字解决方案。新的陶瓷材料系统适用于CAD/CAM数字化制作。第三句。";
        let out = sentence_summary("t", raw);
        assert!(out.starts_with("两家牙科设备巨头扩大合作"));
        assert!(!out.contains("第三句"));
        assert!(out.ends_with('.'));
    }

    #[test]
    fn only_punctuation_falls_back_to_truncation() {
        let raw = "!".repeat(60);
        let out = sentence_summary("t", &raw);
        assert_eq!(out, raw);
    }

    #[test]
    fn truncate_mode_counts_chars_not_bytes() {
        let raw = "é".repeat(250);
        let out = display_summary("t", &raw, SummaryMode::Truncate);
        assert_eq!(out.chars().count(), 203);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn truncate_leaves_short_text_alone() {
        assert_eq!(truncate_chars("abc", 200), "abc");
    }

    #[test]
    fn off_mode_is_empty() {
        assert_eq!(display_summary("t", "anything at all", SummaryMode::Off), "");
    }
}
