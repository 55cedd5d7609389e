// tests/ingest_pipeline.rs
//
// End-to-end ingestion cycles over mocked transports and a throwaway store.

mod common;

use std::time::Duration;

use common::{fixture, harness, MapTransport, Reply, TagTranslator, API_KEY};
use news_pulse::error::FetchError;
use news_pulse::ingest::scheduler::{self, SchedulerCfg};
use news_pulse::ingest::types::SourceDescriptor;
use news_pulse::{PipelineConfig, PoliticalBias, Published, Sentiment};

const HU_FEED: &str = "https://index.hu/24ora/rss/";
const AT_API: &str = "https://newsapi.org/v2/top-headlines?country=at";

fn sources() -> Vec<SourceDescriptor> {
    vec![
        SourceDescriptor::feed("Hungary", HU_FEED),
        SourceDescriptor::api("Austria", AT_API, "NEWS_API_KEY"),
    ]
}

fn good_transport() -> std::sync::Arc<MapTransport> {
    let t = MapTransport::new();
    t.on(HU_FEED, vec![Reply::Body(fixture("index_hu.xml"))]);
    t.on(AT_API, vec![Reply::Body(fixture("newsapi_at.json"))]);
    t
}

#[tokio::test]
async fn cycle_stores_feed_and_api_items() {
    let transport = good_transport();
    let h = harness(
        sources(),
        transport.clone(),
        TagTranslator::ok(),
        PipelineConfig::default(),
    )
    .await;

    let report = h.pipeline.run_cycle().await;
    assert_eq!(report.sources_total, 2);
    assert_eq!(report.sources_ok, 2);
    assert_eq!(report.inserted, 5);
    assert_eq!(report.dropped, 1, "blank title must be dropped");

    let hu = h.store.query(Some("Hungary"), None).await.unwrap();
    let links: Vec<&str> = hu.iter().map(|i| i.canonical_link.as_str()).collect();
    assert_eq!(
        links,
        vec![
            "https://index.hu/belfold/2024/03/05/koltsegvetes/",
            "https://index.hu/belfold/2024/03/05/baleset/",
            "https://index.hu/kultur/2024/03/05/datum/",
        ],
        "newest first, tracking params and fragments stripped, undated last"
    );
    assert_eq!(hu[0].original_title, "Megállapodás született a költségvetésről");
    assert_eq!(
        hu[0].translated_title,
        "[hu] Megállapodás született a költségvetésről"
    );
    assert_eq!(hu[0].political_bias, PoliticalBias::Centrist);
    assert_eq!(hu[2].published_at, Published::Unknown);
    assert!(hu.iter().all(|i| i.sentiment != Sentiment::Unknown));

    let at = h.store.query(Some("Austria"), None).await.unwrap();
    assert_eq!(at.len(), 2);
    assert_eq!(at[0].political_bias, PoliticalBias::Public);
    assert_eq!(at[1].published_at, Published::Unknown);

    let keys = transport.keys_seen.lock().unwrap().clone();
    assert!(keys.contains(&Some(API_KEY.to_string())));
    assert!(keys.contains(&None), "feeds are fetched without a key");
}

#[tokio::test]
async fn repeated_cycles_are_idempotent() {
    let h = harness(
        sources(),
        good_transport(),
        TagTranslator::ok(),
        PipelineConfig::default(),
    )
    .await;

    let first = h.pipeline.run_cycle().await;
    let second = h.pipeline.run_cycle().await;
    assert_eq!(first.inserted, 5);
    assert_eq!(second.inserted, 0);
    assert_eq!(second.duplicates, 5);
    assert_eq!(h.store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn overlapping_cycles_never_duplicate_rows() {
    let h = harness(
        sources(),
        good_transport(),
        TagTranslator::ok(),
        PipelineConfig::default(),
    )
    .await;

    let (a, b) = tokio::join!(h.pipeline.run_cycle(), h.pipeline.run_cycle());
    assert_eq!(a.inserted + b.inserted, 5);
    assert_eq!(a.duplicates + b.duplicates, 5);
    assert_eq!(h.store.count().await.unwrap(), 5);
}

#[tokio::test]
async fn failing_sources_are_isolated() {
    let garbage = "https://broken.example/rss";
    let down = "https://down.example/rss";
    let t = good_transport();
    t.on(garbage, vec![Reply::Body("<html><body>not a feed".into())]);
    t.on(
        down,
        vec![Reply::Fail(FetchError::Http {
            status: Some(503),
            message: "Service Unavailable".into(),
        })],
    );

    let srcs = vec![
        SourceDescriptor::feed("Serbia", garbage),
        SourceDescriptor::feed("Slovakia", down),
        SourceDescriptor::feed("Hungary", HU_FEED),
    ];

    let h = harness(srcs, t.clone(), TagTranslator::ok(), PipelineConfig::default()).await;
    let report = h.pipeline.run_cycle().await;

    assert_eq!(report.sources_ok, 1);
    assert_eq!(report.sources_failed, 2);
    assert_eq!(report.inserted, 3);
    assert_eq!(h.store.query(Some("Hungary"), None).await.unwrap().len(), 3);
    // garbage: 1 (not retried), down: 1 + 2 retries, hungary: 1
    assert_eq!(t.calls(), 5);
}

#[tokio::test]
async fn translation_failure_keeps_original_title() {
    let h = harness(
        vec![SourceDescriptor::feed("Hungary", HU_FEED)],
        good_transport(),
        TagTranslator::failing(),
        PipelineConfig::default(),
    )
    .await;

    let report = h.pipeline.run_cycle().await;
    assert_eq!(report.inserted, 3);
    for item in h.store.query(None, None).await.unwrap() {
        assert_eq!(item.translated_title, item.original_title);
    }
}

#[tokio::test]
async fn entries_of_one_source_are_written_in_order() {
    let feed = "https://rtvslo.si/rss";
    let xml = r#"<rss version="2.0"><channel>
<item><title>Prva</title><link>https://rtvslo.si/1</link></item>
<item><title>Druga</title><link>https://rtvslo.si/2</link></item>
<item><title>Tretja</title><link>https://rtvslo.si/3</link></item>
</channel></rss>"#;
    let t = MapTransport::new();
    t.on(feed, vec![Reply::Body(xml.into())]);

    let h = harness(
        vec![SourceDescriptor::feed("Slovenia", feed)],
        t,
        TagTranslator::ok(),
        PipelineConfig::default(),
    )
    .await;
    h.pipeline.run_cycle().await;

    // All undated: ties fall back to insertion id, newest first.
    let titles: Vec<String> = h
        .store
        .query(Some("Slovenia"), None)
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.original_title)
        .collect();
    assert_eq!(titles, vec!["Tretja", "Druga", "Prva"]);
}

#[tokio::test]
async fn cycle_budget_abandons_unfinished_sources() {
    let stuck = "https://stuck.example/rss";
    let t = good_transport();
    t.on(stuck, vec![Reply::Hang]);

    let h = harness(
        vec![
            SourceDescriptor::feed("Hungary", HU_FEED),
            SourceDescriptor::feed("Romania", stuck),
        ],
        t,
        TagTranslator::ok(),
        PipelineConfig {
            concurrency: 1,
            cycle_budget: Duration::from_millis(700),
            ..PipelineConfig::default()
        },
    )
    .await;

    let report = h.pipeline.run_cycle().await;
    assert_eq!(report.sources_abandoned, 1);
    assert_eq!(report.sources_ok, 1);
    assert_eq!(report.inserted, 3);
    assert_eq!(h.store.count().await.unwrap(), 3, "stored items are kept");
}

#[tokio::test]
async fn slow_translation_is_shared_across_sources() {
    // Two sources carrying the same headline translate it once.
    let a = "https://a.example/rss";
    let b = "https://b.example/rss";
    let xml = |link: &str| {
        format!(
            r#"<rss version="2.0"><channel><item><title>Same headline</title><link>{link}</link></item></channel></rss>"#
        )
    };
    let t = MapTransport::new();
    t.on(a, vec![Reply::Body(xml("https://a.example/1"))]);
    t.on(b, vec![Reply::Body(xml("https://b.example/1"))]);

    let translator = TagTranslator::slow(Duration::from_millis(100));
    let h = harness(
        vec![
            SourceDescriptor::feed("Serbia", a),
            SourceDescriptor::feed("Serbia", b),
        ],
        t,
        translator.clone(),
        PipelineConfig::default(),
    )
    .await;

    let report = h.pipeline.run_cycle().await;
    assert_eq!(report.inserted, 2);
    assert_eq!(translator.calls(), 1);
}

#[tokio::test]
async fn scheduler_drives_the_real_pipeline() {
    let h = harness(
        sources(),
        good_transport(),
        TagTranslator::ok(),
        PipelineConfig::default(),
    )
    .await;

    let sched = scheduler::start(
        h.pipeline.clone(),
        SchedulerCfg {
            interval: Duration::from_secs(3600),
        },
    );
    for _ in 0..200 {
        if sched.cycles_completed() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sched.cycles_completed(), 1, "startup cycle");
    assert_eq!(h.store.count().await.unwrap(), 5);

    sched.trigger();
    for _ in 0..200 {
        if sched.cycles_completed() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sched.cycles_completed(), 2);
    assert_eq!(h.store.count().await.unwrap(), 5, "second cycle adds nothing");
    sched.stop().await;
}
