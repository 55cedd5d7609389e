// src/ingest/providers/mod.rs
//! Payload decoders, one per adapter kind. Pure: bytes in, entries out.

pub mod feed;
pub mod news_api;

use crate::error::FetchError;
use crate::ingest::types::{RawEntry, SourceKind};

/// Decode a fetched body according to the adapter kind.
pub fn parse_body(kind: SourceKind, body: &str) -> Result<Vec<RawEntry>, FetchError> {
    match kind {
        SourceKind::Feed => feed::parse_feed(body),
        SourceKind::Api => news_api::parse_articles(body),
    }
}
