//! Data source URL policy and de-duplication.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Value};

/// Where a fragment's tile archive is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlPolicy {
    /// Every fragment reads the single combined archive `tiles.pmtiles`.
    Single { base_url: String },
    /// Each fragment reads `<fragment>.pmtiles`.
    PerFragment { base_url: String },
    /// Every fragment reads a caller-supplied, externally hosted archive.
    External { url: String },
}

impl UrlPolicy {
    /// Resolved source URL for a fragment.
    pub fn url_for(&self, fragment: &str) -> String {
        match self {
            Self::Single { base_url } => {
                format!("pmtiles://{}/tiles.pmtiles", base_url.trim_end_matches('/'))
            }
            Self::PerFragment { base_url } => {
                format!("pmtiles://{}/{}.pmtiles", base_url.trim_end_matches('/'), fragment)
            }
            Self::External { url } => format!("pmtiles://{url}"),
        }
    }
}

/// Assigns synthetic source keys (`tiles1`, `tiles2`, ...) and collapses
/// sources that resolve to the same URL onto one key.
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    by_url: HashMap<String, String>,
    taken: BTreeSet<String>,
    next: u32,
}

impl SourceRegistry {
    /// Registry seeded with the root document's sources.
    ///
    /// Their keys are never reused and their URLs take part in
    /// de-duplication.
    pub fn seeded(sources: &Map<String, Value>) -> Self {
        let mut registry = Self {
            next: 1,
            ..Default::default()
        };
        for (key, definition) in sources {
            registry.taken.insert(key.clone());
            if let Some(url) = source_url(definition) {
                registry.by_url.entry(url.to_string()).or_insert_with(|| key.clone());
            }
        }
        registry
    }

    /// Register a source definition, inserting it into `sources` unless an
    /// identical URL is already registered. Returns the key to reference.
    pub fn register(&mut self, definition: Value, sources: &mut Map<String, Value>) -> String {
        let url = source_url(&definition).map(str::to_string);
        if let Some(existing) = url.as_ref().and_then(|u| self.by_url.get(u)) {
            return existing.clone();
        }

        let key = self.fresh_key();
        if let Some(url) = url {
            self.by_url.insert(url, key.clone());
        }
        sources.insert(key.clone(), definition);
        key
    }

    /// Number of distinct URLs registered.
    pub fn distinct_urls(&self) -> usize {
        self.by_url.len()
    }

    fn fresh_key(&mut self) -> String {
        loop {
            let key = format!("tiles{}", self.next);
            self.next += 1;
            if self.taken.insert(key.clone()) {
                return key;
            }
        }
    }
}

fn source_url(definition: &Value) -> Option<&str> {
    definition.get("url").and_then(Value::as_str)
}
