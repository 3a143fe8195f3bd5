// src/ingest/keywords.rs
//! Case-insensitive substring keyword filter.
//!
//! Matching is plain containment on lowercased text: no tokenization, no word
//! boundaries. "art" matches "smart".

/// Returns true iff `text` contains at least one of `keywords` (case-insensitive).
/// Empty text or an empty keyword set never matches.
pub fn matches<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    if text.is_empty() {
        return false;
    }
    let haystack = text.to_lowercase();
    keywords.iter().any(|k| {
        let k = k.as_ref();
        !k.is_empty() && haystack.contains(&k.to_lowercase())
    })
}

/// Keyword set lowercased once per run.
#[derive(Debug, Clone, Default)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl KeywordFilter {
    /// Empty entries are dropped; order and surrounding spaces are kept.
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let keywords = keywords
            .iter()
            .map(|k| k.as_ref().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn matches(&self, text: &str) -> bool {
        self.first_match(text).is_some()
    }

    /// First configured keyword contained in `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        if text.is_empty() {
            return None;
        }
        let haystack = text.to_lowercase();
        self.keywords
            .iter()
            .find(|k| haystack.contains(k.as_str()))
            .map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phrase_must_appear_contiguously() {
        let kw = ["digital dental"];
        assert!(!matches("Digital Workflow Update", &kw));
        assert!(matches("New digital dental scanner", &kw));
    }

    #[test]
    fn case_insensitive_both_ways() {
        assert!(matches("intraoral SCANNER review", &["Intraoral Scanner"]));
    }

    #[test]
    fn plain_substring_not_word_boundary() {
        assert!(matches("A smart move", &["art"]));
    }

    #[test]
    fn empty_inputs_never_match() {
        let none: [&str; 0] = [];
        assert!(!matches("anything", &none));
        assert!(!matches("", &["x"]));
        assert!(!KeywordFilter::new(&none).matches("anything"));
        assert!(!KeywordFilter::new(&["cad"]).matches(""));
    }

    #[test]
    fn filter_drops_empty_keywords_and_reports_first_hit() {
        let f = KeywordFilter::new(&["", "CAD/CAM", "implant"]);
        assert_eq!(f.len(), 2);
        assert_eq!(f.first_match("Implant planning with cad/cam"), Some("cad/cam"));
        assert!(!f.matches("orthodontic aligners"));
    }

    #[test]
    fn padded_keyword_is_matched_as_written() {
        let f = KeywordFilter::new(&[" AI "]);
        assert!(!f.matches("she said hello"));
        assert!(f.matches("new AI tools for labs"));
        assert_eq!(f.matches("she said hello"), matches("she said hello", &[" AI "]));
    }

    #[test]
    fn unicode_keywords() {
        assert!(matches("全新口内扫描仪发布", &["口内扫描"]));
    }
}
