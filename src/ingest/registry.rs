// src/ingest/registry.rs
//! Country → ordered source adapters, validated once at startup.

use std::collections::HashMap;

use crate::error::ConfigError;
use crate::ingest::config::SourcesConfig;
use crate::ingest::types::{SourceDescriptor, SourceKind};

/// Credentials resolved from the environment at startup, keyed by env var name.
#[derive(Debug, Clone, Default)]
pub struct Credentials(HashMap<String, String>);

impl Credentials {
    pub fn get(&self, var: &str) -> Option<&str> {
        self.0.get(var).map(String::as_str)
    }

    pub fn insert(&mut self, var: impl Into<String>, value: impl Into<String>) {
        self.0.insert(var.into(), value.into());
    }
}

#[derive(Debug, Clone)]
pub struct SourceRegistry {
    countries: Vec<(String, Vec<SourceDescriptor>)>,
    credentials: Credentials,
}

impl SourceRegistry {
    /// Startup entry point: optional country selection, credentials from the
    /// process env.
    pub fn from_config_for<S: AsRef<str>>(
        cfg: SourcesConfig,
        countries: Option<&[S]>,
    ) -> Result<Self, ConfigError> {
        Self::select(cfg, countries, |var| std::env::var(var).ok())
    }

    /// Every configured country, credentials from `lookup`.
    /// Fails if any API source names a credential that is missing or blank.
    pub fn with_env_lookup<F>(cfg: SourcesConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::select(cfg, None::<&[String]>, lookup)
    }

    /// Narrow to `countries` (when given) first, then resolve credentials for
    /// the sources that remain. An API key used only by countries left out is
    /// never required.
    pub fn select<S, F>(
        cfg: SourcesConfig,
        countries: Option<&[S]>,
        lookup: F,
    ) -> Result<Self, ConfigError>
    where
        S: AsRef<str>,
        F: Fn(&str) -> Option<String>,
    {
        let mut reg = Self {
            countries: cfg.countries,
            credentials: Credentials::default(),
        };
        if let Some(names) = countries {
            reg = reg.restrict_to(names)?;
        }
        reg.load_credentials(lookup)?;
        Ok(reg)
    }

    fn load_credentials<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        for (_, sources) in &self.countries {
            for src in sources.iter().filter(|s| s.kind == SourceKind::Api) {
                let var = src.credential_ref.as_deref().unwrap_or_default();
                if self.credentials.get(var).is_some() {
                    continue;
                }
                match lookup(var).map(|v| v.trim().to_string()) {
                    Some(v) if !v.is_empty() => self.credentials.insert(var, v),
                    _ => {
                        return Err(ConfigError::MissingCredential {
                            var: var.to_string(),
                            endpoint: src.endpoint.clone(),
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Sources for one country, in configured order. Matching is case-insensitive.
    /// A country that is unknown or configured with zero sources is a `ConfigError`.
    pub fn resolve(&self, country: &str) -> Result<&[SourceDescriptor], ConfigError> {
        let wanted = country.trim();
        self.countries
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
            .map(|(_, sources)| sources.as_slice())
            .filter(|sources| !sources.is_empty())
            .ok_or_else(|| ConfigError::UnknownCountry(wanted.to_string()))
    }

    /// Keep only the named countries, in the order given. Every name must
    /// resolve to at least one source.
    pub fn restrict_to<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, ConfigError> {
        let mut countries: Vec<(String, Vec<SourceDescriptor>)> = Vec::with_capacity(names.len());
        for name in names {
            let wanted = name.as_ref().trim();
            let sources = self.resolve(wanted)?;
            let canonical = self
                .countries
                .iter()
                .map(|(c, _)| c)
                .find(|c| c.eq_ignore_ascii_case(wanted))
                .cloned()
                .unwrap_or_else(|| wanted.to_string());
            if !countries.iter().any(|(c, _)| *c == canonical) {
                countries.push((canonical, sources.to_vec()));
            }
        }
        Ok(Self {
            countries,
            credentials: self.credentials.clone(),
        })
    }

    /// Every configured source, country by country, in file order.
    pub fn all(&self) -> Vec<SourceDescriptor> {
        self.countries
            .iter()
            .flat_map(|(_, sources)| sources.iter().cloned())
            .collect()
    }

    pub fn countries(&self) -> Vec<String> {
        self.countries.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn credential_for(&self, descriptor: &SourceDescriptor) -> Option<&str> {
        descriptor
            .credential_ref
            .as_deref()
            .and_then(|var| self.credentials.get(var))
    }

    pub fn len(&self) -> usize {
        self.countries.iter().map(|(_, s)| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
