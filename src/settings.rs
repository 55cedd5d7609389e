// src/settings.rs
//! Process settings from the environment (`.env` is loaded by the binary).

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;
use crate::sentiment::ClassifierKind;

pub const ENV_DB_PATH: &str = "NEWS_DB_PATH";
pub const ENV_TARGET_LANG: &str = "TRANSLATE_TARGET_LANG";
pub const ENV_INTERVAL_SECS: &str = "FETCH_INTERVAL_SECS";
pub const ENV_CYCLE_BUDGET_SECS: &str = "CYCLE_BUDGET_SECS";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_FETCH_MAX_RETRIES: &str = "FETCH_MAX_RETRIES";
pub const ENV_FETCH_CONCURRENCY: &str = "FETCH_CONCURRENCY";
pub const ENV_CLASSIFIER: &str = "SENTIMENT_CLASSIFIER";
pub const ENV_HF_TOKEN: &str = "HF_API_TOKEN";
pub const ENV_QUERY_RATE: &str = "QUERY_RATE_PER_MINUTE";
pub const ENV_COUNTRIES: &str = "NEWS_COUNTRIES";

pub const DEFAULT_DB_PATH: &str = "data/news.db";
pub const DEFAULT_TARGET_LANG: &str = "hu";
pub const DEFAULT_INTERVAL_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct Settings {
    pub db_path: PathBuf,
    pub target_lang: String,
    pub interval: Duration,
    pub cycle_budget: Duration,
    pub fetch_timeout: Duration,
    pub fetch_max_retries: u32,
    pub fetch_concurrency: usize,
    pub classifier: ClassifierKind,
    pub hf_api_token: Option<String>,
    pub query_rate_per_minute: u32,
    /// Ingest only these countries; `None` means every configured one.
    pub countries: Option<Vec<String>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            target_lang: DEFAULT_TARGET_LANG.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            cycle_budget: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(10),
            fetch_max_retries: 3,
            fetch_concurrency: 4,
            classifier: ClassifierKind::Lexicon,
            hf_api_token: None,
            query_rate_per_minute: 10,
            countries: None,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Unset or blank values fall back to defaults; malformed numbers are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |k: &str| lookup(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let num = |k: &str| -> Result<Option<u64>, ConfigError> {
            get(k)
                .map(|v| {
                    v.parse::<u64>()
                        .map_err(|_| ConfigError::invalid(format!("{k}='{v}' is not a number")))
                })
                .transpose()
        };

        let d = Settings::default();

        let classifier = match get(ENV_CLASSIFIER) {
            Some(v) => v.parse::<ClassifierKind>().map_err(ConfigError::Invalid)?,
            None => d.classifier,
        };
        let hf_api_token = get(ENV_HF_TOKEN);
        if classifier == ClassifierKind::Model && hf_api_token.is_none() {
            return Err(ConfigError::MissingCredential {
                var: ENV_HF_TOKEN.to_string(),
                endpoint: crate::sentiment::ModelClassifier::DEFAULT_ENDPOINT.to_string(),
            });
        }

        Ok(Self {
            db_path: get(ENV_DB_PATH).map(PathBuf::from).unwrap_or(d.db_path),
            target_lang: get(ENV_TARGET_LANG)
                .map(|l| l.to_ascii_lowercase())
                .unwrap_or(d.target_lang),
            interval: num(ENV_INTERVAL_SECS)?
                .map(|s| Duration::from_secs(s.clamp(60, 86_400)))
                .unwrap_or(d.interval),
            cycle_budget: num(ENV_CYCLE_BUDGET_SECS)?
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or(d.cycle_budget),
            fetch_timeout: num(ENV_FETCH_TIMEOUT_SECS)?
                .map(|s| Duration::from_secs(s.max(1)))
                .unwrap_or(d.fetch_timeout),
            fetch_max_retries: num(ENV_FETCH_MAX_RETRIES)?
                .map(|n| n.min(10) as u32)
                .unwrap_or(d.fetch_max_retries),
            fetch_concurrency: num(ENV_FETCH_CONCURRENCY)?
                .map(|n| n.clamp(1, 64) as usize)
                .unwrap_or(d.fetch_concurrency),
            classifier,
            hf_api_token,
            query_rate_per_minute: num(ENV_QUERY_RATE)?
                .map(|n| n.clamp(1, 10_000) as u32)
                .unwrap_or(d.query_rate_per_minute),
            countries: get(ENV_COUNTRIES).map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|list| !list.is_empty()),
        })
    }
}
