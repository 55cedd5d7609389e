// src/ingest/config.rs
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::ingest::types::{SourceDescriptor, SourceKind};

pub const ENV_SOURCES_PATH: &str = "NEWS_SOURCES_PATH";
const DEFAULT_TOML: &str = "config/sources.toml";
const DEFAULT_JSON: &str = "config/sources.json";

/// Credential env var used by the seeded NewsAPI sources.
pub const NEWS_API_KEY_VAR: &str = "NEWS_API_KEY";

/// Country → ordered sources, in file order. Countries may have no sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourcesConfig {
    pub countries: Vec<(String, Vec<SourceDescriptor>)>,
}

#[derive(Debug, Deserialize)]
struct SourcesFile {
    #[serde(default)]
    countries: Vec<CountryEntry>,
}

#[derive(Debug, Deserialize)]
struct CountryEntry {
    name: String,
    #[serde(default)]
    sources: Vec<SourceEntry>,
}

#[derive(Debug, Deserialize)]
struct SourceEntry {
    kind: SourceKind,
    endpoint: String,
    #[serde(default)]
    credential_ref: Option<String>,
}

/// Load sources from an explicit path. TOML or JSON, chosen by extension.
pub fn load_sources_from(path: &Path) -> Result<SourcesConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load sources using env var + fallbacks:
/// 1) $NEWS_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in seed
pub fn load_sources_default() -> Result<SourcesConfig, ConfigError> {
    if let Ok(p) = std::env::var(ENV_SOURCES_PATH) {
        let pb = PathBuf::from(p);
        if !pb.exists() {
            return Err(ConfigError::invalid(format!(
                "{ENV_SOURCES_PATH} points to non-existent path {}",
                pb.display()
            )));
        }
        return load_sources_from(&pb);
    }
    for p in [DEFAULT_TOML, DEFAULT_JSON] {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        }
    }
    tracing::info!(target: "ingest", "no sources file found, using built-in seed");
    Ok(default_seed())
}

pub(crate) fn parse_sources(s: &str, hint_ext: &str) -> Result<SourcesConfig, ConfigError> {
    let file: SourcesFile = if hint_ext == "json" {
        serde_json::from_str(s).map_err(|e| ConfigError::invalid(format!("sources json: {e}")))?
    } else {
        toml::from_str(s).map_err(|e| ConfigError::invalid(format!("sources toml: {e}")))?
    };
    build(file)
}

fn build(file: SourcesFile) -> Result<SourcesConfig, ConfigError> {
    let mut seen = HashSet::new();
    let mut countries = Vec::with_capacity(file.countries.len());

    for entry in file.countries {
        let name = entry.name.trim().to_string();
        if name.is_empty() {
            return Err(ConfigError::invalid("country with empty name"));
        }
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ConfigError::invalid(format!("country '{name}' listed twice")));
        }

        let mut sources = Vec::with_capacity(entry.sources.len());
        for src in entry.sources {
            let endpoint = src.endpoint.trim().to_string();
            url::Url::parse(&endpoint).map_err(|e| {
                ConfigError::invalid(format!("bad endpoint '{endpoint}' for {name}: {e}"))
            })?;
            let credential_ref = src
                .credential_ref
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
            if src.kind == SourceKind::Api && credential_ref.is_none() {
                return Err(ConfigError::invalid(format!(
                    "api source '{endpoint}' for {name} has no credential_ref"
                )));
            }
            sources.push(SourceDescriptor {
                country: name.clone(),
                kind: src.kind,
                endpoint,
                credential_ref,
            });
        }
        countries.push((name, sources));
    }

    Ok(SourcesConfig { countries })
}

/// Built-in layout: feeds for five countries, NewsAPI top headlines for three.
pub fn default_seed() -> SourcesConfig {
    let feeds: [(&str, &[&str]); 5] = [
        (
            "Hungary",
            &["https://index.hu/24ora/rss", "https://hvg.hu/rss/rss.html"],
        ),
        ("Serbia", &["https://www.rts.rs/page/stories/sr/rss.html"]),
        ("Slovenia", &["https://www.rtvslo.si/rss"]),
        ("Slovakia", &["https://www.aktuality.sk/rss"]),
        ("Romania", &["https://www.digi24.ro/rss"]),
    ];
    let apis = [("Czech Republic", "cz"), ("Poland", "pl"), ("Austria", "at")];

    let mut countries = Vec::new();
    for (country, urls) in feeds {
        let sources = urls
            .iter()
            .map(|u| SourceDescriptor::feed(country, u))
            .collect();
        countries.push((country.to_string(), sources));
    }
    for (country, code) in apis {
        let endpoint = format!("https://newsapi.org/v2/top-headlines?country={code}");
        countries.push((
            country.to_string(),
            vec![SourceDescriptor::api(country, &endpoint, NEWS_API_KEY_VAR)],
        ));
    }
    SourcesConfig { countries }
}
