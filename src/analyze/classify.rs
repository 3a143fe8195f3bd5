// src/analyze/classify.rs
//! Importance classification.
//!
//! Ordered rule chain, first hit wins:
//! 1. source name is authoritative        -> High (3)
//! 2. text contains a high-importance term -> High (3)
//! 3. text contains a medium term          -> Medium (2)
//! 4. otherwise                            -> Low (1)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    High,
    Medium,
    Low,
}

impl Tier {
    /// Render order in the digest.
    pub const ORDER: [Tier; 3] = [Tier::High, Tier::Medium, Tier::Low];

    pub fn rank(self) -> u8 {
        match self {
            Tier::High => 3,
            Tier::Medium => 2,
            Tier::Low => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::High => "High Priority",
            Tier::Medium => "Medium Priority",
            Tier::Low => "Low Priority",
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Tier::High => "🔴",
            Tier::Medium => "🟡",
            Tier::Low => "🟢",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Importance {
    pub tier: Tier,
    pub rank: u8,
}

impl From<Tier> for Importance {
    fn from(tier: Tier) -> Self {
        Self {
            tier,
            rank: tier.rank(),
        }
    }
}

/// Tier membership rules, as found in the `[classifier]` config section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierRules {
    pub authoritative_sources: Vec<String>,
    pub high_keywords: Vec<String>,
    pub medium_keywords: Vec<String>,
}

impl Default for ClassifierRules {
    fn default() -> Self {
        Self {
            authoritative_sources: to_strings(&[
                "ADA News",
                "Align Technology News",
                "exocad Blog",
            ]),
            high_keywords: to_strings(&[
                "launch",
                "release",
                "new product",
                "breakthrough",
                "revolutionary",
                "first",
                "world premiere",
                "major update",
                "industry standard",
                "clinical trial",
                "research study",
                "scientific paper",
                "innovation",
                "发布",
                "推出",
                "首发",
                "突破",
                "革命性",
                "临床试验",
                "研究论文",
            ]),
            medium_keywords: to_strings(&[
                "update",
                "upgrade",
                "improvement",
                "enhancement",
                "feature",
                "conference",
                "exhibition",
                "trade show",
                "event",
                "webinar",
                "case study",
                "clinical case",
                "workflow",
                "integration",
                "更新",
                "升级",
                "改进",
                "展会",
                "会议",
                "案例研究",
                "工作流程",
            ]),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn lowered(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Compiled rule chain. Pure and total.
#[derive(Debug, Clone)]
pub struct Classifier {
    authoritative: HashSet<String>,
    high: Vec<String>,
    medium: Vec<String>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(&ClassifierRules::default())
    }
}

impl Classifier {
    pub fn new(rules: &ClassifierRules) -> Self {
        Self {
            authoritative: rules.authoritative_sources.iter().cloned().collect(),
            high: lowered(&rules.high_keywords),
            medium: lowered(&rules.medium_keywords),
        }
    }

    /// `combined_text` is title + summary + content; when blank, the title alone is used.
    pub fn classify(&self, title: &str, combined_text: &str, source_name: &str) -> Importance {
        if self.authoritative.contains(source_name) {
            return Tier::High.into();
        }

        let haystack = if combined_text.trim().is_empty() {
            title.to_lowercase()
        } else {
            combined_text.to_lowercase()
        };

        if self.high.iter().any(|k| haystack.contains(k.as_str())) {
            return Tier::High.into();
        }
        if self.medium.iter().any(|k| haystack.contains(k.as_str())) {
            return Tier::Medium.into();
        }
        Tier::Low.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clf() -> Classifier {
        Classifier::default()
    }

    #[test]
    fn authoritative_source_wins_over_keywords() {
        let imp = clf().classify("ADA announces update", "ADA announces update ...", "ADA News");
        assert_eq!(imp, Importance { tier: Tier::High, rank: 3 });
    }

    #[test]
    fn same_text_from_other_source_is_medium() {
        let imp = clf().classify(
            "ADA announces update",
            "ADA announces update ...",
            "Dental Economics",
        );
        assert_eq!(imp.tier, Tier::Medium);
        assert_eq!(imp.rank, 2);
    }

    #[test]
    fn high_keyword_beats_medium_keyword() {
        let imp = clf().classify(
            "",
            "Clinical trial results presented at the conference",
            "Dentistry Today",
        );
        assert_eq!(imp.tier, Tier::High);
    }

    #[test]
    fn nothing_matches_is_low() {
        let imp = clf().classify("Practice tips", "Practice tips for hygienists", "Blog");
        assert_eq!(imp, Importance { tier: Tier::Low, rank: 1 });
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let imp = clf().classify("", "3Shape LAUNCHES new scanner", "3Shape Blog");
        assert_eq!(imp.tier, Tier::High);
    }

    #[test]
    fn blank_combined_text_falls_back_to_title() {
        let imp = clf().classify("Webinar on aligners", "  ", "Blog");
        assert_eq!(imp.tier, Tier::Medium);
    }

    #[test]
    fn authoritative_match_is_exact() {
        let imp = clf().classify("", "Practice tips", "ada news");
        assert_eq!(imp.tier, Tier::Low);
    }

    #[test]
    fn custom_rules() {
        let rules = ClassifierRules {
            authoritative_sources: vec!["Lab Weekly".into()],
            high_keywords: vec!["Recall".into()],
            medium_keywords: vec![],
        };
        let c = Classifier::new(&rules);
        assert_eq!(c.classify("", "x", "Lab Weekly").tier, Tier::High);
        assert_eq!(c.classify("", "product recall issued", "Other").tier, Tier::High);
        assert_eq!(c.classify("", "conference update", "Other").tier, Tier::Low);
    }

    #[test]
    fn padded_keyword_keeps_its_spaces() {
        let rules = ClassifierRules {
            authoritative_sources: vec![],
            high_keywords: vec![" AI ".into()],
            medium_keywords: vec![],
        };
        let c = Classifier::new(&rules);
        assert_eq!(c.classify("", "she said hello", "Blog").tier, Tier::Low);
        assert_eq!(c.classify("", "new AI tools", "Blog").tier, Tier::High);
    }

    #[test]
    fn tier_order_and_ranks() {
        let ranks: Vec<u8> = Tier::ORDER.iter().map(|t| t.rank()).collect();
        assert_eq!(ranks, vec![3, 2, 1]);
    }
}
