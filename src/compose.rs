// src/compose.rs
//! Digest message rendering (Telegram HTML parse mode).
//!
//! Layout: header, then one block per non-empty tier (High, Medium, Low), each
//! holding at most `caps` items in pipeline order. When the run produced more
//! items than all caps together, a single overflow line counts the rest.

use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

use crate::analyze::Tier;
use crate::ingest::types::QualifyingItem;

pub const DEFAULT_TITLE: &str = "🦷 <b>Digital Dentistry Updates</b>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderCaps {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl Default for RenderCaps {
    fn default() -> Self {
        Self {
            high: 5,
            medium: 5,
            low: 3,
        }
    }
}

impl RenderCaps {
    pub fn for_tier(&self, tier: Tier) -> usize {
        match tier {
            Tier::High => self.high,
            Tier::Medium => self.medium,
            Tier::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

#[derive(Debug, Clone)]
pub struct MessageComposer {
    title: String,
    caps: RenderCaps,
}

impl Default for MessageComposer {
    fn default() -> Self {
        Self::new(DEFAULT_TITLE, RenderCaps::default())
    }
}

impl MessageComposer {
    /// `title` is inserted as-is and may carry markup.
    pub fn new(title: impl Into<String>, caps: RenderCaps) -> Self {
        Self {
            title: title.into(),
            caps,
        }
    }

    /// `None` when there is nothing to send.
    pub fn compose(&self, items: &[QualifyingItem]) -> Option<String> {
        if items.is_empty() {
            return None;
        }

        let mut msg = String::new();
        let _ = write!(msg, "{}\n\n", self.title);

        let mut rendered = 0usize;
        for tier in Tier::ORDER {
            let group: Vec<&QualifyingItem> = items
                .iter()
                .filter(|it| it.importance.tier == tier)
                .collect();
            if group.is_empty() {
                continue;
            }

            let _ = writeln!(msg, "{} <b>{}</b>", tier.marker(), tier.label());
            for item in group.iter().take(self.caps.for_tier(tier)) {
                render_item(&mut msg, item);
                rendered += 1;
            }
        }

        if items.len() > self.caps.total() {
            let _ = write!(msg, "📎 {} more articles", items.len() - rendered);
        }

        Some(msg.trim().to_string())
    }
}

fn render_item(msg: &mut String, item: &QualifyingItem) {
    let _ = writeln!(msg, "📰 {}", html_escape::encode_text(&item.source));

    let title = html_escape::encode_text(&item.title);
    if item.link.is_empty() {
        let _ = writeln!(msg, "🔗 {title}");
    } else {
        let href = html_escape::encode_single_quoted_attribute(&item.link);
        let _ = writeln!(msg, "🔗 <a href='{href}'>{title}</a>");
    }

    if !item.summary.is_empty() {
        let _ = writeln!(msg, "📝 {}", html_escape::encode_text(&item.summary));
    }
    if !item.tags.is_empty() {
        let _ = writeln!(msg, "🏷️ {}", html_escape::encode_text(&item.tags.join(", ")));
    }
    if !item.published.is_empty() {
        let _ = writeln!(msg, "⏰ {}", html_escape::encode_text(&item.published));
    }
    msg.push('\n');
}
