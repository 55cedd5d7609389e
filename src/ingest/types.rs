// src/ingest/types.rs
use serde::{Deserialize, Serialize};

use crate::model::Published;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Feed,
    Api,
}

/// One configured source. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub country: String,
    pub kind: SourceKind,
    pub endpoint: String,
    /// Env var holding the credential; required for `kind = api`.
    pub credential_ref: Option<String>,
}

impl SourceDescriptor {
    pub fn feed(country: &str, endpoint: &str) -> Self {
        Self {
            country: country.to_string(),
            kind: SourceKind::Feed,
            endpoint: endpoint.to_string(),
            credential_ref: None,
        }
    }

    pub fn api(country: &str, endpoint: &str, credential_ref: &str) -> Self {
        Self {
            country: country.to_string(),
            kind: SourceKind::Api,
            endpoint: endpoint.to_string(),
            credential_ref: Some(credential_ref.to_string()),
        }
    }
}

/// Provider-agnostic entry as extracted from a feed item or API article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    pub title: Option<String>,
    pub link: Option<String>,
    pub published: Option<String>,
}

/// Normalized entry, ready for translation and enrichment.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItemDraft {
    pub country: String,
    pub title: String,
    pub canonical_link: String,
    pub published_at: Published,
}
