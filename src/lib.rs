// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod bias;
pub mod enrich;
pub mod error;
pub mod ingest;
pub mod metrics;
pub mod model;
pub mod query;
pub mod sentiment;
pub mod settings;
pub mod store;
pub mod translate;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::ingest::scheduler::{SchedulerCfg, SchedulerHandle};
pub use crate::ingest::{CycleReport, IngestPipeline, PipelineConfig};
pub use crate::model::{NewsItem, PoliticalBias, Published, Sentiment};
pub use crate::settings::Settings;

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use crate::bias::BiasTable;
use crate::enrich::Enricher;
use crate::ingest::fetch::{FetchWorker, HttpTransport, RetryPolicy};
use crate::ingest::registry::SourceRegistry;
use crate::query::QueryService;
use crate::sentiment::{ClassifierKind, LexiconClassifier, ModelClassifier, SentimentClassifier};
use crate::store::NewsStore;
use crate::translate::{GoogleTranslator, TranslationCache};

/// Everything the binary needs, wired from [`Settings`].
pub struct App {
    pub settings: Settings,
    pub registry: Arc<SourceRegistry>,
    pub store: Arc<NewsStore>,
    pub pipeline: Arc<IngestPipeline>,
}

/// Build the pipeline. Any error here is a startup configuration error and
/// should stop the process.
pub async fn build_app(settings: Settings) -> anyhow::Result<App> {
    let sources = ingest::config::load_sources_default().context("loading news sources")?;
    let registry = Arc::new(
        SourceRegistry::from_config_for(sources, settings.countries.as_deref())
            .context("resolving sources")?,
    );

    let bias = Arc::new(BiasTable::load_default().context("loading bias table")?);

    let transport =
        Arc::new(HttpTransport::new(settings.fetch_timeout).context("building http client")?);
    let fetcher = FetchWorker::new(
        transport,
        RetryPolicy {
            timeout: settings.fetch_timeout,
            max_retries: settings.fetch_max_retries,
            ..RetryPolicy::default()
        },
    );

    let call_timeout = settings.fetch_timeout;
    let translator =
        Arc::new(GoogleTranslator::new(call_timeout).context("building translate client")?);
    let translations = Arc::new(TranslationCache::new(translator, call_timeout));

    let classifier: Arc<dyn SentimentClassifier> = match settings.classifier {
        ClassifierKind::Lexicon => Arc::new(LexiconClassifier::new()),
        ClassifierKind::Model => {
            let token = settings
                .hf_api_token
                .clone()
                .context("HF_API_TOKEN is required for the model classifier")?;
            Arc::new(ModelClassifier::new(token, call_timeout).context("building model client")?)
        }
    };
    let enricher = Enricher::new(classifier, bias.clone(), call_timeout);

    let store = Arc::new(
        NewsStore::open(&settings.db_path)
            .await
            .with_context(|| format!("opening store at {}", settings.db_path.display()))?,
    );

    let pipeline = Arc::new(IngestPipeline::new(
        registry.clone(),
        fetcher,
        translations,
        enricher,
        store.clone(),
        PipelineConfig {
            target_lang: settings.target_lang.clone(),
            concurrency: settings.fetch_concurrency,
            cycle_budget: settings.cycle_budget,
        },
    ));

    info!(
        countries = registry.countries().len(),
        sources = registry.len(),
        bias_domains = bias.len(),
        classifier = ?settings.classifier,
        db = %settings.db_path.display(),
        "pipeline ready"
    );

    Ok(App {
        settings,
        registry,
        store,
        pipeline,
    })
}

impl App {
    /// Start the periodic scheduler; the first cycle runs right away.
    pub fn start_scheduler(&self) -> SchedulerHandle {
        ingest::scheduler::start(
            self.pipeline.clone(),
            SchedulerCfg {
                interval: self.settings.interval,
            },
        )
    }

    pub fn router(&self, scheduler: SchedulerHandle) -> axum::Router {
        create_router(AppState::new(
            QueryService::new(self.store.clone()),
            self.registry.clone(),
            scheduler,
            self.settings.query_rate_per_minute,
        ))
    }
}
