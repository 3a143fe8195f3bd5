// tests/providers_xml.rs
use chrono::{TimeZone, Utc};
use dental_feed_monitor::ingest::providers::{parse_feed, FixtureFeedSource};
use dental_feed_monitor::ingest::timestamp;
use dental_feed_monitor::{FeedSource, FetchError};

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{name}")).expect("fixture")
}

#[test]
fn rss2_fixture_parses_all_items_in_order() {
    let items = parse_feed(&fixture("dental_rss2.xml")).unwrap();
    assert_eq!(items.len(), 4);

    let first = &items[0];
    assert_eq!(first.title, "3Shape launches TRIOS 6 intraoral scanner");
    assert_eq!(first.link, "https://dental-tribune.example/news/trios-6");
    assert_eq!(first.published, "Fri, 20 Feb 2026 08:30:00 +0000");
    assert_eq!(
        first.summary,
        "The new intraoral scanner brings AI-assisted margin detection to the digital workflow. \
         Shipping starts in March. Pricing is unchanged."
    );
    assert_eq!(
        first.content.as_deref(),
        Some("Full article body about CAD/CAM integration.")
    );

    assert_eq!(
        items[1].summary,
        "Five ways to reduce no-shows & keep the schedule full."
    );
    // dc:date is used when pubDate is absent
    assert_eq!(items[2].published, "2026-02-18T12:00:00Z");
    assert_eq!(items[3].published, "");
}

#[test]
fn rss2_raw_timestamps_stay_parseable() {
    let items = parse_feed(&fixture("dental_rss2.xml")).unwrap();
    assert_eq!(
        timestamp::parse(&items[0].published),
        Some(Utc.with_ymd_and_hms(2026, 2, 20, 8, 30, 0).unwrap())
    );
    assert_eq!(
        timestamp::parse(&items[1].published),
        Some(Utc.with_ymd_and_hms(2026, 2, 19, 9, 0, 0).unwrap())
    );
    assert!(timestamp::parse(&items[3].published).is_none());
}

#[test]
fn atom_fixture_prefers_published_and_alternate_link() {
    let items = parse_feed(&fixture("dental_atom.xml")).unwrap();
    assert_eq!(items.len(), 2);

    assert_eq!(items[0].title, "exocad DentalCAD 3.3 & Model Creator released");
    assert_eq!(items[0].link, "https://exocad.example/blog/dentalcad-3-3");
    assert_eq!(items[0].published, "2026-02-20T09:00:00+01:00");
    assert_eq!(
        items[0].summary,
        "The new release improves the digital workflow for CAD/CAM labs."
    );
    assert_eq!(items[0].content.as_deref(), Some("Details about implant planning."));

    assert_eq!(items[1].link, "https://exocad.example/blog/full-arch");
    assert_eq!(items[1].published, "2026-02-15T08:00:00Z");
    assert_eq!(items[1].content, None);
}

#[test]
fn rdf_fixture_reads_items_outside_channel() {
    let items = parse_feed(&fixture("dental_rdf.xml")).unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].title, "Zirconia 3D printing enters the lab");
    assert_eq!(items[0].published, "2026-02-19T07:15:00Z");
    assert_eq!(
        timestamp::parse(&items[1].published),
        Some(Utc.with_ymd_and_hms(2026, 2, 17, 16, 0, 0).unwrap())
    );
}

#[test]
fn non_feed_documents_are_parse_errors() {
    assert!(matches!(
        parse_feed("<html><body>Not a feed</body></html>"),
        Err(FetchError::Parse(_))
    ));
    assert!(matches!(parse_feed("plain text"), Err(FetchError::Parse(_))));
}

#[tokio::test]
async fn fixture_source_serves_by_url() {
    let src = FixtureFeedSource::new().with_doc("mem://rdf", fixture("dental_rdf.xml"));
    assert_eq!(src.fetch("mem://rdf").await.unwrap().len(), 2);
    assert!(matches!(
        src.fetch("mem://missing").await,
        Err(FetchError::Status { status: 404, .. })
    ));
}
