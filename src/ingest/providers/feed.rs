// src/ingest/providers/feed.rs
use once_cell::sync::Lazy;
use quick_xml::de::from_str;
use regex::{Captures, Regex};
use serde::Deserialize;

use crate::error::FetchError;
use crate::ingest::types::RawEntry;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

/// Parse an RSS 2.0 document. An empty channel is fine; broken XML is a `Parse` error.
pub fn parse_feed(xml: &str) -> Result<Vec<RawEntry>, FetchError> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let rss: Rss =
        from_str(&xml_clean).map_err(|e| FetchError::Parse(format!("rss xml: {e}")))?;

    Ok(rss
        .channel
        .item
        .into_iter()
        .map(|it| RawEntry {
            title: it.title,
            link: it.link,
            published: it.pub_date,
        })
        .collect())
}

// Feeds routinely leak HTML entities that are undefined in XML. Named ones
// outside XML's predefined five are decoded; unknown names get their `&`
// escaped so the rest of the document still parses.
static NAMED_ENTITY: Lazy<Regex> = Lazy::new(|| Regex::new(r"&([A-Za-z][A-Za-z0-9]*);").unwrap());

fn scrub_html_entities_for_xml(s: &str) -> String {
    NAMED_ENTITY
        .replace_all(s, |caps: &Captures| {
            let name = &caps[1];
            match name {
                "amp" | "lt" | "gt" | "quot" | "apos" => caps[0].to_string(),
                "nbsp" => " ".to_string(),
                // Re-escape so `&LT;` and unknown names stay well-formed.
                _ => {
                    let decoded = html_escape::decode_html_entities(&caps[0]);
                    html_escape::encode_text(&decoded).into_owned()
                }
            }
        })
        .into_owned()
}
