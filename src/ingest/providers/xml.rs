// src/ingest/providers/xml.rs
use metrics::histogram;
use quick_xml::de::from_str;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{FetchError, RawItem};

// ---- RSS 2.0 / RSS 1.0 (RDF) ----

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

/// RSS 1.0 puts items next to `<channel>`, not inside it.
#[derive(Debug, Deserialize)]
struct Rdf {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
    #[serde(rename = "encoded", alias = "content:encoded")]
    encoded: Option<String>,
    #[serde(rename = "date", alias = "dc:date")]
    dc_date: Option<String>,
}

// ---- Atom ----

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entry: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    #[serde(default)]
    link: Vec<AtomLink>,
    published: Option<String>,
    updated: Option<String>,
    summary: Option<TextNode>,
    content: Option<TextNode>,
}

/// Element whose text we want regardless of its `type=` attribute.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href", default)]
    href: String,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

/// Identify the feed dialect from the local name of the root element.
pub fn sniff_kind(xml: &str) -> Result<FeedKind, FetchError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let local = e.local_name();
                return match local.as_ref() {
                    b"rss" => Ok(FeedKind::Rss),
                    b"RDF" => Ok(FeedKind::Rdf),
                    b"feed" => Ok(FeedKind::Atom),
                    other => Err(FetchError::Parse(format!(
                        "unsupported root element <{}>",
                        String::from_utf8_lossy(other)
                    ))),
                };
            }
            Ok(Event::Eof) => return Err(FetchError::Parse("document has no root element".into())),
            Ok(_) => continue,
            Err(e) => return Err(FetchError::Parse(e.to_string())),
        }
    }
}

/// Parse an RSS 2.0, RSS 1.0 or Atom document into items in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<RawItem>, FetchError> {
    let t0 = std::time::Instant::now();
    let xml_clean = scrub_html_entities_for_xml(xml);
    let kind = sniff_kind(&xml_clean)?;

    let items = match kind {
        FeedKind::Rss => {
            let rss: Rss = from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
            rss.channel.item.into_iter().map(rss_item).collect()
        }
        FeedKind::Rdf => {
            let rdf: Rdf = from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
            rdf.item.into_iter().map(rss_item).collect()
        }
        FeedKind::Atom => {
            let feed: AtomFeed =
                from_str(&xml_clean).map_err(|e| FetchError::Parse(e.to_string()))?;
            feed.entry.into_iter().map(atom_entry).collect()
        }
    };

    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(items)
}

fn clean(s: Option<String>) -> String {
    s.as_deref().map(normalize_text).unwrap_or_default()
}

fn raw(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn rss_item(it: RssItem) -> RawItem {
    let published = raw(it.pub_date).or(raw(it.dc_date)).unwrap_or_default();
    RawItem {
        title: clean(it.title),
        link: it.link.map(|l| l.trim().to_string()).unwrap_or_default(),
        published,
        summary: clean(it.description),
        content: it.encoded.as_deref().map(normalize_text).filter(|c| !c.is_empty()),
    }
}

fn atom_entry(e: AtomEntry) -> RawItem {
    let link = e
        .link
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or_else(|| e.link.first())
        .map(|l| l.href.trim().to_string())
        .unwrap_or_default();
    let published = raw(e.published).or(raw(e.updated)).unwrap_or_default();
    RawItem {
        title: clean(e.title.map(|t| t.value)),
        link,
        published,
        summary: clean(e.summary.map(|t| t.value)),
        content: e
            .content
            .map(|t| normalize_text(&t.value))
            .filter(|c| !c.is_empty()),
    }
}

/// Replace HTML-only entities that are not defined in XML.
pub fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
        .replace("&copy;", "(c)")
        .replace("&reg;", "(R)")
        .replace("&trade;", "(TM)")
}
