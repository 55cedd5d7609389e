// src/query.rs
//! Read-only access to stored items, independent of ingestion.

use std::sync::Arc;

use crate::error::PersistenceError;
use crate::model::NewsItem;
use crate::store::NewsStore;

#[derive(Clone)]
pub struct QueryService {
    store: Arc<NewsStore>,
}

impl QueryService {
    pub fn new(store: Arc<NewsStore>) -> Self {
        Self { store }
    }

    /// Newest first; undated items come last. `None` means every country.
    pub async fn latest(
        &self,
        country: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<NewsItem>, PersistenceError> {
        let country = country.map(str::trim).filter(|c| !c.is_empty());
        self.store.query(country, limit).await
    }

    pub async fn total(&self) -> Result<u64, PersistenceError> {
        self.store.count().await
    }
}
