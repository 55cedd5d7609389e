// src/ingest/mod.rs
//! One ingestion cycle: fan out over every configured source with bounded
//! parallelism, then fetch → normalize → translate → enrich → insert per entry.
//!
//! Failures stay inside their scope: a bad source is skipped, a bad entry is
//! dropped, and the cycle itself always completes (or hits its wall-clock
//! budget, keeping everything already stored).

pub mod config;
pub mod fetch;
pub mod normalize;
pub mod providers;
pub mod registry;
pub mod scheduler;
pub mod types;

use futures::stream::{self, StreamExt};
use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram,
};
use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::enrich::Enricher;
use crate::ingest::fetch::FetchWorker;
use crate::ingest::registry::SourceRegistry;
use crate::ingest::types::SourceDescriptor;
use crate::store::{InsertOutcome, NewsStore};
use crate::translate::TranslationCache;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("ingest_cycles_total", "Completed ingestion cycles.");
        describe_histogram!("ingest_cycle_ms", "Cycle wall-clock time in milliseconds.");
        describe_counter!("ingest_fetch_errors_total", "Sources skipped after fetch errors.");
        describe_counter!("ingest_fetch_retries_total", "Fetch retries after transient errors.");
        describe_counter!(
            "ingest_entries_dropped_total",
            "Entries dropped by normalization (no title/link)."
        );
        describe_counter!("ingest_inserted_total", "New rows stored.");
        describe_counter!("ingest_duplicates_total", "Entries whose link was already stored.");
        describe_counter!("ingest_persist_errors_total", "Items dropped on storage errors.");
        describe_counter!("translation_cache_hits_total", "Translation cache hits.");
        describe_counter!("translation_cache_misses_total", "Translation backend calls started.");
        describe_counter!("translation_errors_total", "Translations degraded to original text.");
        describe_counter!("classification_errors_total", "Sentiment labels degraded to unknown.");
        describe_gauge!("ingest_last_cycle_ts", "Unix ts when the last cycle finished.");
    });
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub target_lang: String,
    /// Max sources fetched at once within a cycle.
    pub concurrency: usize,
    /// Overall wall-clock budget for one cycle.
    pub cycle_budget: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_lang: "hu".to_string(),
            concurrency: 4,
            cycle_budget: Duration::from_secs(300),
        }
    }
}

/// Outcome of one source within a cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    pub fetched: usize,
    pub dropped: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub persist_errors: usize,
    /// `Some(kind)` when the fetch itself failed and the source was skipped.
    pub fetch_error: Option<&'static str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sources_total: usize,
    pub sources_ok: usize,
    pub sources_failed: usize,
    /// Sources never started because the cycle budget ran out.
    pub sources_abandoned: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub dropped: usize,
    pub persist_errors: usize,
}

impl CycleReport {
    fn absorb(&mut self, r: &SourceReport) {
        if r.fetch_error.is_some() {
            self.sources_failed += 1;
        } else {
            self.sources_ok += 1;
        }
        self.inserted += r.inserted;
        self.duplicates += r.duplicates;
        self.dropped += r.dropped;
        self.persist_errors += r.persist_errors;
    }
}

pub struct IngestPipeline {
    registry: Arc<SourceRegistry>,
    fetcher: FetchWorker,
    translations: Arc<TranslationCache>,
    enricher: Enricher,
    store: Arc<NewsStore>,
    cfg: PipelineConfig,
}

impl IngestPipeline {
    pub fn new(
        registry: Arc<SourceRegistry>,
        fetcher: FetchWorker,
        translations: Arc<TranslationCache>,
        enricher: Enricher,
        store: Arc<NewsStore>,
        cfg: PipelineConfig,
    ) -> Self {
        ensure_metrics_described();
        Self {
            registry,
            fetcher,
            translations,
            enricher,
            store,
            cfg,
        }
    }

    pub fn store(&self) -> &Arc<NewsStore> {
        &self.store
    }

    /// Run one cycle over every configured source.
    pub async fn run_cycle(&self) -> CycleReport {
        let t0 = Instant::now();
        let sources = self.registry.all();
        let report = self.run_sources(&sources).await;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_cycle_ms").record(ms);
        counter!("ingest_cycles_total").increment(1);
        gauge!("ingest_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);

        if report.sources_total > 0 && report.sources_ok == 0 {
            warn!(
                target: "ingest",
                failed = report.sources_failed,
                abandoned = report.sources_abandoned,
                "cycle reached no source; will retry next tick"
            );
        }
        info!(
            target: "ingest",
            sources = report.sources_total,
            ok = report.sources_ok,
            failed = report.sources_failed,
            abandoned = report.sources_abandoned,
            inserted = report.inserted,
            duplicates = report.duplicates,
            dropped = report.dropped,
            elapsed_ms = ms as u64,
            "ingest cycle finished"
        );
        report
    }

    /// Fan out over `sources`. Sources not yet finished when the budget expires
    /// are abandoned; whatever they already stored stays stored.
    pub async fn run_sources(&self, sources: &[SourceDescriptor]) -> CycleReport {
        let mut report = CycleReport {
            sources_total: sources.len(),
            ..CycleReport::default()
        };
        let deadline = tokio::time::Instant::now() + self.cfg.cycle_budget;

        // Owned descriptors: a borrowing closure here is not general enough
        // for the `Send` future the scheduler needs.
        let mut in_flight = stream::iter(sources.to_vec())
            .map(|src| async move { self.process_source(&src).await })
            .buffer_unordered(self.cfg.concurrency.max(1));

        let mut finished = 0usize;
        loop {
            match tokio::time::timeout_at(deadline, in_flight.next()).await {
                Ok(Some(r)) => {
                    finished += 1;
                    report.absorb(&r);
                }
                Ok(None) => break,
                Err(_) => {
                    report.sources_abandoned = sources.len() - finished;
                    warn!(
                        target: "ingest",
                        abandoned = report.sources_abandoned,
                        budget_secs = self.cfg.cycle_budget.as_secs(),
                        "cycle budget exhausted, abandoning remaining sources"
                    );
                    break;
                }
            }
        }
        report
    }

    /// Entries of one source are handled in input order.
    pub async fn process_source(&self, src: &SourceDescriptor) -> SourceReport {
        let mut report = SourceReport::default();
        let api_key = self.registry.credential_for(src);

        let entries = match self.fetcher.fetch(src, api_key).await {
            Ok(v) => v,
            Err(e) => {
                counter!("ingest_fetch_errors_total", "kind" => e.kind()).increment(1);
                warn!(
                    target: "ingest",
                    country = %src.country,
                    source = %src.endpoint,
                    error = %e,
                    "source skipped for this cycle"
                );
                report.fetch_error = Some(e.kind());
                return report;
            }
        };
        report.fetched = entries.len();
        if entries.is_empty() {
            warn!(target: "ingest", source = %src.endpoint, "no entries in source");
        }

        for raw in &entries {
            let draft = match normalize::normalize(raw, &src.country) {
                Ok(d) => d,
                Err(reason) => {
                    report.dropped += 1;
                    counter!("ingest_entries_dropped_total", "reason" => reason.as_str())
                        .increment(1);
                    warn!(
                        target: "ingest",
                        source = %src.endpoint,
                        reason = reason.as_str(),
                        link = raw.link.as_deref().unwrap_or_default(),
                        "entry dropped"
                    );
                    continue;
                }
            };

            let translated = self
                .translations
                .translate(&draft.title, &self.cfg.target_lang)
                .await;
            let item = self.enricher.enrich(draft, translated).await;

            match self.store.insert_if_absent(&item).await {
                Ok(InsertOutcome::Inserted) => {
                    report.inserted += 1;
                    counter!("ingest_inserted_total").increment(1);
                }
                Ok(InsertOutcome::AlreadyPresent) => {
                    report.duplicates += 1;
                    counter!("ingest_duplicates_total").increment(1);
                }
                Err(e) => {
                    report.persist_errors += 1;
                    counter!("ingest_persist_errors_total").increment(1);
                    warn!(
                        target: "store",
                        link = %item.canonical_link,
                        error = %e,
                        "item dropped on storage error"
                    );
                }
            }
        }
        report
    }
}
