//! # Bias table
//!
//! Static domain-substring → political category lookup used to tag every
//! stored item.
//!
//! - Loads from TOML or JSON (`[domains]` table), or the built-in seed.
//! - Matching is case-insensitive against the link's host; the whole link is
//!   used when it does not parse as a URL.
//! - The longest matching domain wins; equal lengths resolve to the
//!   lexicographically smaller domain. No match yields `unknown`.
//! - Read-only after construction, so it is shared without locking.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::{fs, path::Path};
use tracing::warn;

use crate::error::ConfigError;
use crate::model::PoliticalBias;

pub const ENV_BIAS_PATH: &str = "NEWS_BIAS_PATH";

#[derive(Debug, Clone)]
pub struct BiasTable {
    /// Sorted by (length desc, domain asc): first hit is the answer.
    entries: Vec<(String, PoliticalBias)>,
}

#[derive(Debug, Deserialize)]
struct BiasFile {
    #[serde(default)]
    domains: BTreeMap<String, String>,
}

impl BiasTable {
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, PoliticalBias)>,
        S: AsRef<str>,
    {
        let mut entries: Vec<(String, PoliticalBias)> = pairs
            .into_iter()
            .map(|(d, b)| (normalize_domain(d.as_ref()), b))
            .filter(|(d, _)| !d.is_empty())
            .collect();
        entries.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        entries.dedup_by(|(a, _), (b, _)| a == b);
        Self { entries }
    }

    /// Load from a TOML/JSON file. Unknown category names are a config error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let file: BiasFile = if is_json {
            serde_json::from_str(&s).map_err(|e| ConfigError::invalid(format!("bias json: {e}")))?
        } else {
            toml::from_str(&s).map_err(|e| ConfigError::invalid(format!("bias toml: {e}")))?
        };

        let mut pairs = Vec::with_capacity(file.domains.len());
        for (domain, cat) in file.domains {
            let bias = cat
                .parse::<PoliticalBias>()
                .map_err(|e| ConfigError::invalid(format!("bias for '{domain}': {e}")))?;
            pairs.push((domain, bias));
        }
        Ok(Self::new(pairs))
    }

    /// `$NEWS_BIAS_PATH` if set, otherwise the built-in seed.
    pub fn load_default() -> Result<Self, ConfigError> {
        match std::env::var(ENV_BIAS_PATH) {
            Ok(p) if !p.trim().is_empty() => Self::load_from_file(p.trim()),
            _ => Ok(Self::default_seed()),
        }
    }

    pub fn lookup(&self, link: &str) -> PoliticalBias {
        let haystack = match url::Url::parse(link.trim()) {
            Ok(u) => match u.host_str() {
                Some(h) => h.to_ascii_lowercase(),
                None => link.to_ascii_lowercase(),
            },
            Err(_) => {
                warn!(target: "ingest", link, "bias lookup on unparseable link");
                link.to_ascii_lowercase()
            }
        };

        self.entries
            .iter()
            .find(|(domain, _)| haystack.contains(domain.as_str()))
            .map(|(_, bias)| *bias)
            .unwrap_or(PoliticalBias::Unknown)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Built-in seed covering the configured countries' common outlets.
    pub fn default_seed() -> Self {
        use PoliticalBias::*;
        Self::new([
            // Austria
            ("orf.at", Public),
            ("derstandard.at", Left),
            ("diepresse.com", Centrist),
            ("krone.at", Tabloid),
            ("heute.at", Tabloid),
            ("kurier.at", Centrist),
            // Hungary
            ("hirado.hu", State),
            ("mtva.hu", State),
            ("magyarnemzet.hu", Right),
            ("origo.hu", Right),
            ("hvg.hu", Left),
            ("nepszava.hu", Left),
            ("index.hu", Centrist),
            ("telex.hu", Centrist),
            ("portfolio.hu", Business),
            ("blikk.hu", Tabloid),
            // Serbia, Slovenia, Slovakia, Romania
            ("rts.rs", Public),
            ("informer.rs", Tabloid),
            ("rtvslo.si", Public),
            ("aktuality.sk", Centrist),
            ("rtvs.sk", Public),
            ("digi24.ro", Business),
            ("tvr.ro", Public),
            // Czech Republic, Poland
            ("ceskatelevize.cz", Public),
            ("irozhlas.cz", Public),
            ("blesk.cz", Tabloid),
            ("tvp.pl", State),
            ("tvn24.pl", Centrist),
            ("fakt.pl", Tabloid),
            ("bankier.pl", Business),
        ])
    }
}

fn normalize_domain(s: &str) -> String {
    s.trim()
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .trim_end_matches('/')
        .to_ascii_lowercase()
}
