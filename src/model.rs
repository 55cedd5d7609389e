// src/model.rs
//! Stored news item and its enumerated labels.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Literal stored in place of a missing or unparseable publication date.
pub const UNKNOWN: &str = "unknown";

/// Five-point sentiment scale plus an explicit failure member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
    Unknown,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::VeryNegative => "very_negative",
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
            Sentiment::VeryPositive => "very_positive",
            Sentiment::Unknown => UNKNOWN,
        }
    }

    /// Map a 1..=5 star rating onto the scale. Anything else is `Unknown`.
    pub fn from_stars(stars: u8) -> Self {
        match stars {
            1 => Sentiment::VeryNegative,
            2 => Sentiment::Negative,
            3 => Sentiment::Neutral,
            4 => Sentiment::Positive,
            5 => Sentiment::VeryPositive,
            _ => Sentiment::Unknown,
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sentiment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "very_negative" => Sentiment::VeryNegative,
            "negative" => Sentiment::Negative,
            "neutral" => Sentiment::Neutral,
            "positive" => Sentiment::Positive,
            "very_positive" => Sentiment::VeryPositive,
            "unknown" => Sentiment::Unknown,
            other => return Err(format!("unknown sentiment label '{other}'")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoliticalBias {
    Left,
    Centrist,
    Right,
    State,
    Public,
    Business,
    Tabloid,
    Unknown,
}

impl PoliticalBias {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoliticalBias::Left => "left",
            PoliticalBias::Centrist => "centrist",
            PoliticalBias::Right => "right",
            PoliticalBias::State => "state",
            PoliticalBias::Public => "public",
            PoliticalBias::Business => "business",
            PoliticalBias::Tabloid => "tabloid",
            PoliticalBias::Unknown => UNKNOWN,
        }
    }
}

impl fmt::Display for PoliticalBias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PoliticalBias {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "left" => PoliticalBias::Left,
            "centrist" => PoliticalBias::Centrist,
            "right" => PoliticalBias::Right,
            "state" => PoliticalBias::State,
            "public" => PoliticalBias::Public,
            "business" => PoliticalBias::Business,
            "tabloid" => PoliticalBias::Tabloid,
            "unknown" => PoliticalBias::Unknown,
            other => return Err(format!("unknown bias category '{other}'")),
        })
    }
}

/// Publication time: parsed from the source, or the `"unknown"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    At(DateTime<Utc>),
    Unknown,
}

impl Published {
    /// Storage form: RFC 3339 in UTC with whole seconds (sorts lexically), or `"unknown"`.
    pub fn to_db_string(&self) -> String {
        match self {
            Published::At(ts) => ts.to_rfc3339_opts(SecondsFormat::Secs, true),
            Published::Unknown => UNKNOWN.to_string(),
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Published::At(dt.with_timezone(&Utc)))
            .unwrap_or(Published::Unknown)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Published::Unknown)
    }
}

impl Serialize for Published {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_db_string())
    }
}

impl<'de> Deserialize<'de> for Published {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Published::from_db_str(&s))
    }
}

/// A fully enriched item as persisted. There is no update path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub country: String,
    pub original_title: String,
    pub translated_title: String,
    pub canonical_link: String,
    pub published_at: Published,
    pub sentiment: Sentiment,
    pub political_bias: PoliticalBias,
    pub ingested_at: DateTime<Utc>,
}
