// src/ingest/normalize.rs
//! Raw provider entry → canonical draft. Pure and deterministic, no I/O.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::ingest::types::{NewsItemDraft, RawEntry};
use crate::model::Published;

const TITLE_MAX_CHARS: usize = 500;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Why an entry never became a draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingTitle,
    MissingLink,
    InvalidLink,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::MissingTitle => "missing_title",
            DropReason::MissingLink => "missing_link",
            DropReason::InvalidLink => "invalid_link",
        }
    }
}

pub fn normalize(raw: &RawEntry, country: &str) -> Result<NewsItemDraft, DropReason> {
    let title = raw
        .title
        .as_deref()
        .map(normalize_title)
        .filter(|t| !t.is_empty())
        .ok_or(DropReason::MissingTitle)?;

    let link = raw
        .link
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .ok_or(DropReason::MissingLink)?;
    let canonical_link = canonical_link(link).ok_or(DropReason::InvalidLink)?;

    let published_at = raw
        .published
        .as_deref()
        .and_then(parse_published)
        .map(Published::At)
        .unwrap_or(Published::Unknown);

    Ok(NewsItemDraft {
        country: country.to_string(),
        title,
        canonical_link,
        published_at,
    })
}

/// Decode entities, strip tags, fold whitespace, cap length. Punctuation is kept.
pub fn normalize_title(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let stripped = RE_TAGS.replace_all(&decoded, "");
    let folded = RE_WS.replace_all(&stripped, " ");
    let out = folded.trim();
    if out.chars().count() > TITLE_MAX_CHARS {
        out.chars().take(TITLE_MAX_CHARS).collect()
    } else {
        out.to_string()
    }
}

/// Dedup key: http(s) only, fragment dropped, `utm_*` tracking params removed.
pub fn canonical_link(link: &str) -> Option<String> {
    let mut url = url::Url::parse(link.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }
    url.set_fragment(None);

    if url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !k.to_ascii_lowercase().starts_with("utm_"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    }
    Some(url.to_string())
}

/// RFC 2822 (RSS) or RFC 3339 (APIs). `None` when neither parses.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let unix = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .map(|dt| dt.unix_timestamp())
        .ok()
        // chrono also accepts obsolete zone names such as "GMT"/"EST".
        .or_else(|| DateTime::parse_from_rfc2822(s).ok().map(|dt| dt.timestamp()))?;
    DateTime::from_timestamp(unix, 0)
}
