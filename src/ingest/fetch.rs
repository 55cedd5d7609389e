// src/ingest/fetch.rs
//! Fetch one source: bounded timeout, capped exponential backoff on transient errors.

use async_trait::async_trait;
use metrics::counter;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::error::FetchError;
use crate::ingest::providers::parse_body;
use crate::ingest::types::{RawEntry, SourceDescriptor};

/// Raw GET. `api_key` goes into the `X-Api-Key` header, never the URL.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, api_key: Option<&str>) -> Result<String, FetchError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("news-pulse/0.1")
            .connect_timeout(Duration::from_secs(4).min(timeout))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, api_key: Option<&str>) -> Result<String, FetchError> {
        let mut req = self.client.get(url);
        if let Some(key) = api_key {
            req = req.header("X-Api-Key", key);
        }
        let resp = req.send().await.map_err(map_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: Some(status.as_u16()),
                message: status.canonical_reason().unwrap_or("").to_string(),
            });
        }
        resp.text().await.map_err(map_reqwest)
    }
}

fn map_reqwest(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout { secs: 0 }
    } else {
        FetchError::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// `base * 2^attempt`, capped at `max_delay`, plus up to 10% jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay);
        let jitter_cap = (exp.as_millis() / 10) as u64;
        let jitter = if jitter_cap > 0 {
            rand::rng().random_range(0..=jitter_cap)
        } else {
            0
        };
        exp + Duration::from_millis(jitter)
    }
}

/// Runs the feed or API strategy for a descriptor over a shared transport.
#[derive(Clone)]
pub struct FetchWorker {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl FetchWorker {
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub async fn fetch(
        &self,
        descriptor: &SourceDescriptor,
        api_key: Option<&str>,
    ) -> Result<Vec<RawEntry>, FetchError> {
        let body = self.get_with_retry(descriptor, api_key).await?;
        parse_body(descriptor.kind, &body)
    }

    async fn get_with_retry(
        &self,
        descriptor: &SourceDescriptor,
        api_key: Option<&str>,
    ) -> Result<String, FetchError> {
        let mut attempt = 0u32;
        loop {
            let res = match tokio::time::timeout(
                self.policy.timeout,
                self.transport.get(&descriptor.endpoint, api_key),
            )
            .await
            {
                Ok(r) => r,
                Err(_) => Err(FetchError::Timeout {
                    secs: self.policy.timeout.as_secs(),
                }),
            };

            match res {
                Ok(body) => return Ok(body),
                Err(e) if e.is_retryable() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    attempt += 1;
                    counter!("ingest_fetch_retries_total").increment(1);
                    warn!(
                        target: "ingest",
                        source = %descriptor.endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient fetch error, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
