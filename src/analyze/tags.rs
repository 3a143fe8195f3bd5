// src/analyze/tags.rs
const MAX_TAGS: usize = 3;

pub fn default_terms() -> Vec<String> {
    [
        "CAD/CAM",
        "intraoral scanner",
        "3D printing",
        "digital workflow",
        "AI",
        "artificial intelligence",
        "machine learning",
        "cloud",
        "implant",
        "orthodontics",
        "prosthodontics",
        "restoration",
        "数字化",
        "口内扫描",
        "3D打印",
        "人工智能",
        "种植体",
        "正畸",
        "修复",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Labels an item with the technical terms it mentions.
#[derive(Debug, Clone)]
pub struct TechnicalTagger {
    terms: Vec<String>,
    lowered: Vec<String>,
}

impl Default for TechnicalTagger {
    fn default() -> Self {
        Self::new(default_terms())
    }
}

impl TechnicalTagger {
    pub fn new(terms: Vec<String>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let terms: Vec<String> = terms
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty() && seen.insert(t.to_lowercase()))
            .collect();
        let lowered = terms.iter().map(|t| t.to_lowercase()).collect();
        Self { terms, lowered }
    }

    /// Up to three matching terms, in configured order. Note that short terms
    /// like "AI" are plain substrings too ("maintain" contains "ai").
    pub fn tags(&self, title: &str, summary: &str) -> Vec<String> {
        let haystack = format!("{title} {summary}").to_lowercase();
        self.terms
            .iter()
            .zip(&self.lowered)
            .filter(|(_, low)| haystack.contains(low.as_str()))
            .map(|(term, _)| term.clone())
            .take(MAX_TAGS)
            .collect()
    }
}
