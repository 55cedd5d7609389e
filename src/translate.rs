//! Translation backend + content-addressed cache with singleflight misses.
//!
//! Cache key is `sha256(text \0 target_language)`. Concurrent misses on the
//! same key share one in-flight backend call; every waiter gets its result.
//! Failures are logged, never cached, and degrade to the original text.

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use metrics::counter;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::TranslationError;

/// External translation capability.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError>;
    fn name(&self) -> &'static str;
}

/// Public Google translate endpoint, source language auto-detected.
pub struct GoogleTranslator {
    http: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub const DEFAULT_ENDPOINT: &'static str = "https://translate.googleapis.com/translate_a/single";

    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent("news-pulse/0.1")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: Self::DEFAULT_ENDPOINT.to_string(),
        })
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_lang: &str) -> Result<String, TranslationError> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", "auto"),
                ("tl", target_lang),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TranslationError::Timeout
                } else {
                    TranslationError::Backend(e.to_string())
                }
            })?;
        if !resp.status().is_success() {
            return Err(TranslationError::Backend(format!("status {}", resp.status())));
        }
        let body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| TranslationError::BadResponse(e.to_string()))?;
        extract_google_text(&body)
    }

    fn name(&self) -> &'static str {
        "google"
    }
}

/// Response shape: `[[["translated chunk","source chunk",...],...],...]`.
fn extract_google_text(body: &serde_json::Value) -> Result<String, TranslationError> {
    let chunks = body
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranslationError::BadResponse("missing sentence array".into()))?;
    let out: String = chunks
        .iter()
        .filter_map(|c| c.get(0).and_then(|s| s.as_str()))
        .collect();
    if out.trim().is_empty() {
        return Err(TranslationError::BadResponse("empty translation".into()));
    }
    Ok(out)
}

pub type CacheKey = [u8; 32];

pub fn cache_key(text: &str, target_lang: &str) -> CacheKey {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hasher.update([0u8]);
    hasher.update(target_lang.as_bytes());
    hasher.finalize().into()
}

type Flight = Shared<BoxFuture<'static, Result<String, TranslationError>>>;

#[derive(Default)]
struct CacheState {
    entries: HashMap<CacheKey, String>,
    in_flight: HashMap<CacheKey, Flight>,
}

/// Shared by every worker; entries live for the process lifetime.
pub struct TranslationCache {
    backend: Arc<dyn Translator>,
    state: Arc<Mutex<CacheState>>,
    call_timeout: Duration,
}

impl TranslationCache {
    pub fn new(backend: Arc<dyn Translator>, call_timeout: Duration) -> Self {
        Self {
            backend,
            state: Arc::new(Mutex::new(CacheState::default())),
            call_timeout,
        }
    }

    /// Translated text, or `text` itself if the backend failed.
    pub async fn translate(&self, text: &str, target_lang: &str) -> String {
        match self.try_translate(text, target_lang).await {
            Ok(t) => t,
            Err(e) => {
                counter!("translation_errors_total").increment(1);
                warn!(
                    target: "translate",
                    backend = self.backend.name(),
                    target_lang,
                    error = %e,
                    "translation failed, keeping original text"
                );
                text.to_string()
            }
        }
    }

    /// Cache-aware lookup that surfaces the backend error instead of degrading.
    pub async fn try_translate(
        &self,
        text: &str,
        target_lang: &str,
    ) -> Result<String, TranslationError> {
        let key = cache_key(text, target_lang);

        let flight = {
            let mut st = self.state.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(hit) = st.entries.get(&key) {
                counter!("translation_cache_hits_total").increment(1);
                return Ok(hit.clone());
            }
            if let Some(f) = st.in_flight.get(&key) {
                debug!(target: "translate", "joining in-flight translation");
                f.clone()
            } else {
                counter!("translation_cache_misses_total").increment(1);
                let f = self.start_flight(key, text, target_lang);
                st.in_flight.insert(key, f.clone());
                f
            }
        };

        flight.await
    }

    /// The flight itself settles the cache state, so it happens exactly once
    /// no matter how many callers await it.
    fn start_flight(&self, key: CacheKey, text: &str, target_lang: &str) -> Flight {
        let backend = Arc::clone(&self.backend);
        let state = Arc::clone(&self.state);
        let timeout = self.call_timeout;
        let text = text.to_string();
        let target_lang = target_lang.to_string();

        async move {
            let res = match tokio::time::timeout(timeout, backend.translate(&text, &target_lang))
                .await
            {
                Ok(r) => r,
                Err(_) => Err(TranslationError::Timeout),
            };
            let mut st = state.lock().unwrap_or_else(|p| p.into_inner());
            st.in_flight.remove(&key);
            if let Ok(translated) = &res {
                st.entries.insert(key, translated.clone());
            }
            res
        }
        .boxed()
        .shared()
    }

    pub fn len(&self) -> usize {
        self.state
            .lock()
            .map(|st| st.entries.len())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_depends_on_text_and_language() {
        assert_eq!(cache_key("alma", "hu"), cache_key("alma", "hu"));
        assert_ne!(cache_key("alma", "hu"), cache_key("alma", "en"));
        // The separator keeps ("ab","c") and ("a","bc") apart.
        assert_ne!(cache_key("ab", "c"), cache_key("a", "bc"));
    }

    #[test]
    fn google_payload_chunks_are_joined() {
        let body = json!([[["Első mondat. ", "First sentence. ", null], ["Második.", "Second.", null]], null, "en"]);
        assert_eq!(extract_google_text(&body).unwrap(), "Első mondat. Második.");
        assert!(extract_google_text(&json!({"error": 1})).is_err());
        assert!(extract_google_text(&json!([[]])).is_err());
    }
}
