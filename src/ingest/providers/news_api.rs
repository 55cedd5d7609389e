// src/ingest/providers/news_api.rs
//! NewsAPI `top-headlines` payloads.

use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::types::RawEntry;

#[derive(Debug, Deserialize)]
struct Resp {
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    articles: Vec<Article>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Article {
    title: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
}

pub fn parse_articles(body: &str) -> Result<Vec<RawEntry>, FetchError> {
    let resp: Resp =
        serde_json::from_str(body).map_err(|e| FetchError::Parse(format!("newsapi json: {e}")))?;
    if resp.status != "ok" {
        return Err(FetchError::Parse(format!(
            "newsapi status '{}': {}",
            resp.status,
            resp.message.unwrap_or_default()
        )));
    }
    Ok(resp
        .articles
        .into_iter()
        .map(|a| RawEntry {
            title: a.title,
            link: a.url,
            published: a.published_at,
        })
        .collect())
}
