//! Sentiment classifiers: embedded lexicon (default) or hosted multilingual model.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::ClassificationError;
use crate::model::Sentiment;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let raw = include_str!("../sentiment_lexicon.json");
    serde_json::from_str::<HashMap<String, i32>>(raw).expect("valid sentiment lexicon")
});

#[async_trait]
pub trait SentimentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassificationError>;
    fn name(&self) -> &'static str;
}

/// Which classifier the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierKind {
    Lexicon,
    Model,
}

impl std::str::FromStr for ClassifierKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lexicon" => Ok(ClassifierKind::Lexicon),
            "model" => Ok(ClassifierKind::Model),
            other => Err(format!("unknown classifier '{other}' (expected lexicon|model)")),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LexiconClassifier;

impl LexiconClassifier {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    /// Returns (score, token count).
    /// A negator within the previous three tokens flips the sign of a word's score.
    pub fn score_text(&self, text: &str) -> (i32, usize) {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;

        for i in 0..tokens.len() {
            let base = self.word_score(tokens[i].as_str());
            if base == 0 {
                continue;
            }
            let negated = (1..=3).any(|k| i >= k && is_negator(tokens[i - k].as_str()));
            score += if negated { -base } else { base };
        }

        (score, tokens.len())
    }
}

/// Bucket a lexicon sum onto the five-point scale.
pub fn label_for_score(score: i32) -> Sentiment {
    match score {
        i32::MIN..=-3 => Sentiment::VeryNegative,
        -2..=-1 => Sentiment::Negative,
        0 => Sentiment::Neutral,
        1..=2 => Sentiment::Positive,
        _ => Sentiment::VeryPositive,
    }
}

#[async_trait]
impl SentimentClassifier for LexiconClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassificationError> {
        let (score, tokens) = self.score_text(text);
        if tokens == 0 {
            return Err(ClassificationError::EmptyInput);
        }
        Ok(label_for_score(score))
    }

    fn name(&self) -> &'static str {
        "lexicon"
    }
}

/// Alphanumeric tokens, lower-cased (Unicode aware, so accented words match).
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not" | "no" | "never" | "without" | "cannot" | "nem" | "sem" | "nincs" | "soha" | "nélkül"
    )
}

/// Hosted `nlptown/bert-base-multilingual-uncased-sentiment` (labels "1 star".."5 stars").
pub struct ModelClassifier {
    http: reqwest::Client,
    endpoint: String,
    api_token: String,
}

impl ModelClassifier {
    pub const DEFAULT_ENDPOINT: &'static str =
        "https://api-inference.huggingface.co/models/nlptown/bert-base-multilingual-uncased-sentiment";

    pub fn new(api_token: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("news-pulse/0.1")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
            api_token,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ModelResp {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// Highest-scoring label → star count → sentiment.
fn pick_label(resp: ModelResp) -> Result<Sentiment, ClassificationError> {
    let labels = match resp {
        ModelResp::Nested(mut v) if !v.is_empty() => v.swap_remove(0),
        ModelResp::Nested(_) => Vec::new(),
        ModelResp::Flat(v) => v,
    };
    let best = labels
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .ok_or_else(|| ClassificationError::BadResponse("no labels".into()))?;
    let stars = best
        .label
        .split_whitespace()
        .next()
        .and_then(|n| n.parse::<u8>().ok())
        .ok_or_else(|| ClassificationError::BadResponse(format!("label '{}'", best.label)))?;
    match Sentiment::from_stars(stars) {
        Sentiment::Unknown => Err(ClassificationError::BadResponse(format!(
            "star count {stars} out of range"
        ))),
        s => Ok(s),
    }
}

#[async_trait]
impl SentimentClassifier for ModelClassifier {
    async fn classify(&self, text: &str) -> Result<Sentiment, ClassificationError> {
        if text.trim().is_empty() {
            return Err(ClassificationError::EmptyInput);
        }
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_token)
            .json(&serde_json::json!({ "inputs": text }))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClassificationError::Timeout
                } else {
                    ClassificationError::Backend(e.to_string())
                }
            })?;
        if !resp.status().is_success() {
            return Err(ClassificationError::Backend(format!(
                "status {}",
                resp.status()
            )));
        }
        let body: ModelResp = resp
            .json()
            .await
            .map_err(|e| ClassificationError::BadResponse(e.to_string()))?;
        pick_label(body)
    }

    fn name(&self) -> &'static str {
        "model"
    }
}
