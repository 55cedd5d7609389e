//! Per-item enrichment: sentiment on the translated title, bias from the link.

use chrono::Utc;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::bias::BiasTable;
use crate::error::ClassificationError;
use crate::ingest::types::NewsItemDraft;
use crate::model::{NewsItem, PoliticalBias, Sentiment};
use crate::sentiment::SentimentClassifier;

#[derive(Clone)]
pub struct Enricher {
    classifier: Arc<dyn SentimentClassifier>,
    bias: Arc<BiasTable>,
    classify_timeout: Duration,
}

impl Enricher {
    pub fn new(
        classifier: Arc<dyn SentimentClassifier>,
        bias: Arc<BiasTable>,
        classify_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            bias,
            classify_timeout,
        }
    }

    /// Never fails: a classifier error degrades to `Sentiment::Unknown`.
    pub async fn enrich(&self, draft: NewsItemDraft, translated_title: String) -> NewsItem {
        let (sentiment, political_bias) = tokio::join!(
            self.sentiment(&translated_title, &draft.canonical_link),
            async { self.bias_for(&draft.canonical_link) }
        );

        NewsItem {
            country: draft.country,
            original_title: draft.title,
            translated_title,
            canonical_link: draft.canonical_link,
            published_at: draft.published_at,
            sentiment,
            political_bias,
            ingested_at: Utc::now(),
        }
    }

    pub fn bias_for(&self, link: &str) -> PoliticalBias {
        self.bias.lookup(link)
    }

    async fn sentiment(&self, text: &str, link: &str) -> Sentiment {
        let res = match tokio::time::timeout(self.classify_timeout, self.classifier.classify(text))
            .await
        {
            Ok(r) => r,
            Err(_) => Err(ClassificationError::Timeout),
        };
        match res {
            Ok(s) => s,
            Err(e) => {
                counter!("classification_errors_total").increment(1);
                warn!(
                    target: "ingest",
                    classifier = self.classifier.name(),
                    link,
                    error = %e,
                    "sentiment classification failed, labelling unknown"
                );
                Sentiment::Unknown
            }
        }
    }
}
