// tests/common/mod.rs
// Shared mocks for the integration tests. Not every test file uses every helper.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use news_pulse::bias::BiasTable;
use news_pulse::enrich::Enricher;
use news_pulse::error::{FetchError, TranslationError};
use news_pulse::ingest::config::SourcesConfig;
use news_pulse::ingest::fetch::{FetchWorker, RetryPolicy, Transport};
use news_pulse::ingest::registry::SourceRegistry;
use news_pulse::ingest::types::SourceDescriptor;
use news_pulse::sentiment::LexiconClassifier;
use news_pulse::store::NewsStore;
use news_pulse::translate::{TranslationCache, Translator};
use news_pulse::{IngestPipeline, PipelineConfig};

pub const API_KEY: &str = "test-key-123";

pub fn fixture(name: &str) -> String {
    let p = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name);
    std::fs::read_to_string(&p).unwrap_or_else(|e| panic!("fixture {}: {e}", p.display()))
}

#[derive(Clone)]
pub enum Reply {
    Body(String),
    Fail(FetchError),
    /// Never answers within any sane timeout.
    Hang,
    /// Answers after a delay.
    Slow(Duration, String),
}

/// URL → canned reply. Counts calls and remembers the API keys it saw.
#[derive(Default)]
pub struct MapTransport {
    replies: Mutex<HashMap<String, Vec<Reply>>>,
    pub calls: AtomicUsize,
    pub keys_seen: Mutex<Vec<Option<String>>>,
}

impl MapTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replies are consumed in order; the last one repeats forever.
    pub fn on(&self, url: &str, replies: Vec<Reply>) {
        self.replies
            .lock()
            .unwrap()
            .insert(url.to_string(), replies);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MapTransport {
    async fn get(&self, url: &str, api_key: Option<&str>) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.keys_seen
            .lock()
            .unwrap()
            .push(api_key.map(str::to_string));

        let reply = {
            let mut map = self.replies.lock().unwrap();
            match map.get_mut(url) {
                Some(list) if list.len() > 1 => list.remove(0),
                Some(list) if !list.is_empty() => list[0].clone(),
                _ => Reply::Fail(FetchError::Http {
                    status: Some(404),
                    message: "no route".into(),
                }),
            }
        };
        match reply {
            Reply::Body(b) => Ok(b),
            Reply::Fail(e) => Err(e),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Timeout { secs: 3600 })
            }
            Reply::Slow(d, b) => {
                tokio::time::sleep(d).await;
                Ok(b)
            }
        }
    }
}

/// Prefixes the target language; optionally fails or stalls.
pub struct TagTranslator {
    pub calls: AtomicUsize,
    pub fail: bool,
    pub delay: Duration,
}

impl TagTranslator {
    pub fn ok() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay: Duration::ZERO,
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: true,
            delay: Duration::ZERO,
        })
    }

    pub fn slow(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            fail: false,
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for TagTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(TranslationError::Backend("quota exceeded".into()));
        }
        Ok(format!("[{target_lang}] {text}"))
    }

    fn name(&self) -> &'static str {
        "tag"
    }
}

pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_millis(500),
        max_retries: 2,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(20),
    }
}

pub struct Harness {
    pub _dir: TempDir,
    pub store: Arc<NewsStore>,
    pub pipeline: Arc<IngestPipeline>,
}

pub async fn open_store() -> (TempDir, Arc<NewsStore>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = NewsStore::open(&dir.path().join("news.db"))
        .await
        .expect("open store");
    (dir, Arc::new(store))
}

pub fn registry(sources: Vec<SourceDescriptor>) -> Arc<SourceRegistry> {
    let mut countries: Vec<(String, Vec<SourceDescriptor>)> = Vec::new();
    for s in sources {
        match countries.iter_mut().find(|(c, _)| *c == s.country) {
            Some((_, list)) => list.push(s),
            None => countries.push((s.country.clone(), vec![s])),
        }
    }
    let reg = SourceRegistry::with_env_lookup(SourcesConfig { countries }, |_| {
        Some(API_KEY.to_string())
    })
    .expect("registry");
    Arc::new(reg)
}

pub async fn harness(
    sources: Vec<SourceDescriptor>,
    transport: Arc<MapTransport>,
    translator: Arc<TagTranslator>,
    cfg: PipelineConfig,
) -> Harness {
    let (dir, store) = open_store().await;
    let pipeline = Arc::new(IngestPipeline::new(
        registry(sources),
        FetchWorker::new(transport, fast_policy()),
        Arc::new(TranslationCache::new(translator, Duration::from_secs(2))),
        Enricher::new(
            Arc::new(LexiconClassifier::new()),
            Arc::new(BiasTable::default_seed()),
            Duration::from_secs(1),
        ),
        store.clone(),
        cfg,
    ));
    Harness {
        _dir: dir,
        store,
        pipeline,
    }
}
