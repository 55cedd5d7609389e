// tests/api_http.rs
//
// HTTP-level tests for the read surface without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot.
//
// Covered:
// - GET /health
// - GET /news (all, per country, unknown country, limit)
// - GET /countries
// - POST /admin/refresh
// - 429 once the per-minute quota is spent

mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value as Json;
use tempfile::TempDir;
use tower::ServiceExt as _; // for `oneshot`

use common::{open_store, registry};
use news_pulse::ingest::scheduler::{self, CycleRunner, SchedulerCfg, SchedulerHandle};
use news_pulse::ingest::types::SourceDescriptor;
use news_pulse::query::QueryService;
use news_pulse::{create_router, AppState, CycleReport, NewsItem, PoliticalBias, Published, Sentiment};

const BODY_LIMIT: usize = 1024 * 1024;

struct Noop;

#[async_trait]
impl CycleRunner for Noop {
    async fn run_cycle(&self) -> CycleReport {
        CycleReport::default()
    }
}

fn item(country: &str, link: &str, hour: Option<u32>) -> NewsItem {
    NewsItem {
        country: country.into(),
        original_title: format!("orig {link}"),
        translated_title: format!("hu {link}"),
        canonical_link: link.into(),
        published_at: hour
            .map(|h| Published::At(Utc.with_ymd_and_hms(2024, 3, 5, h, 0, 0).unwrap()))
            .unwrap_or(Published::Unknown),
        sentiment: Sentiment::Neutral,
        political_bias: PoliticalBias::Unknown,
        ingested_at: Utc::now(),
    }
}

async fn test_router(rate_per_minute: u32) -> (TempDir, Router, SchedulerHandle) {
    let (dir, store) = open_store().await;
    for it in [
        item("Hungary", "https://index.hu/1", Some(6)),
        item("Hungary", "https://index.hu/2", Some(9)),
        item("Hungary", "https://index.hu/3", None),
        item("Austria", "https://orf.at/1", Some(7)),
    ] {
        store.insert_if_absent(&it).await.unwrap();
    }

    let reg = registry(vec![
        SourceDescriptor::feed("Hungary", "https://index.hu/24ora/rss/"),
        SourceDescriptor::feed("Austria", "https://orf.at/rss"),
    ]);
    let sched = scheduler::start(
        Arc::new(Noop),
        SchedulerCfg {
            interval: Duration::from_secs(3600),
        },
    );
    let router = create_router(AppState::new(
        QueryService::new(store),
        reg,
        sched.clone(),
        rate_per_minute,
    ));
    (dir, router, sched)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    let json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, json)
}

#[tokio::test]
async fn health_returns_ok() {
    let (_dir, app, _s) = test_router(10).await;
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT).await.unwrap();
    assert_eq!(&bytes[..], b"ok");
}

#[tokio::test]
async fn news_filters_by_country_newest_first() {
    let (_dir, app, _s) = test_router(10).await;

    let (status, body) = get(&app, "/news?country=hungary").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["country"], "Hungary");
    assert_eq!(body["count"], 3);
    let links: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["canonical_link"].as_str().unwrap())
        .collect();
    assert_eq!(
        links,
        vec!["https://index.hu/2", "https://index.hu/1", "https://index.hu/3"]
    );
    assert_eq!(body["items"][2]["published_at"], "unknown");

    let (_, all) = get(&app, "/news").await;
    assert_eq!(all["count"], 4);

    let (_, limited) = get(&app, "/news?limit=1").await;
    assert_eq!(limited["count"], 1);
}

#[tokio::test]
async fn unknown_country_is_empty_not_error() {
    let (_dir, app, _s) = test_router(10).await;
    let (status, body) = get(&app, "/news?country=Atlantis").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert!(body["items"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn countries_lists_configured_names() {
    let (_dir, app, _s) = test_router(10).await;
    let (status, body) = get(&app, "/countries").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!(["Hungary", "Austria"]));
}

#[tokio::test]
async fn news_is_rate_limited() {
    let (_dir, app, _s) = test_router(3).await;
    for _ in 0..3 {
        let (status, _) = get(&app, "/news").await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = get(&app, "/news").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"], "rate limit exceeded");

    // Other routes are not throttled.
    let (status, _) = get(&app, "/countries").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_refresh_triggers_a_cycle() {
    let (_dir, app, sched) = test_router(10).await;
    // Startup cycle first.
    for _ in 0..100 {
        if sched.cycles_completed() >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let req = Request::builder()
        .method("POST")
        .uri("/admin/refresh")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    for _ in 0..100 {
        if sched.cycles_completed() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sched.cycles_completed(), 2);

    sched.stop().await;
    let req = Request::builder()
        .method("POST")
        .uri("/admin/refresh")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
