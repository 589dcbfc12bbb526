//! Slice configuration merger
//!
//! Folds N slice configuration documents into the single configuration the
//! tile engine runs with when every slice is built into one archive.
//!
//! Combination policy:
//! - `layers`: merged entry by entry; a repeated layer name is a warning and
//!   the later definition wins
//! - `settings.minzoom`: minimum across documents
//! - `settings.maxzoom`, `settings.basezoom`: maximum across documents
//! - all other recognised settings: last writer wins
//! - unrecognised settings and top-level keys: warned about, ignored
//!
//! A key the accumulator does not have yet is adopted verbatim. The first
//! non-empty `settings` object therefore passes through whole, extension
//! keys included, and so does any top-level key seen for the first time.

use std::collections::HashMap;
use std::fmt;

use mapt_schema::{Settings, SliceConfig};
use serde::Serialize;
use tracing::warn;

/// A non-fatal event raised while merging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MergeWarning {
    /// The same layer name is defined by two slices
    DuplicateLayer {
        layer: String,
        first: String,
        second: String,
    },
    /// A settings key without a combination policy
    UnknownSetting { slice: String, key: String },
    /// A top-level key other than `settings` and `layers`
    UnexpectedKey { slice: String, key: String },
}

impl fmt::Display for MergeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateLayer { layer, first, second } => write!(
                f,
                "layer '{}' is defined by both '{}' and '{}'; using '{}'",
                layer, first, second, second
            ),
            Self::UnknownSetting { slice, key } => {
                write!(f, "slice '{}': unrecognised setting '{}' ignored", slice, key)
            }
            Self::UnexpectedKey { slice, key } => {
                write!(f, "slice '{}': unexpected top-level key '{}' ignored", slice, key)
            }
        }
    }
}

/// Merge behaviour switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOptions {
    /// Fail on any warning instead of logging it
    pub strict: bool,
}

/// Merge errors
#[derive(Debug, thiserror::Error)]
pub enum MergeError {
    #[error("strict merge rejected {} warning(s): {}", .0.len(), join_warnings(.0))]
    Strict(Vec<MergeWarning>),
}

fn join_warnings(warnings: &[MergeWarning]) -> String {
    warnings
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// The merged configuration and what happened while producing it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedConfig {
    pub config: SliceConfig,

    /// Slice names in fold order
    pub sources: Vec<String>,

    pub warnings: Vec<MergeWarning>,
}

impl MergedConfig {
    /// Serialize the merged configuration for the tile engine
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.config)
    }
}

/// Merge slice configurations in order.
pub fn merge<'a, I>(documents: I, options: MergeOptions) -> Result<MergedConfig, MergeError>
where
    I: IntoIterator<Item = (&'a str, &'a SliceConfig)>,
{
    let mut merger = Merger::default();
    for (name, config) in documents {
        merger.absorb(name, config);
    }

    let merged = merger.finish();
    if options.strict && !merged.warnings.is_empty() {
        return Err(MergeError::Strict(merged.warnings));
    }
    Ok(merged)
}

/// Clone `config` with outputs disabled (`minzoom = maxzoom = 0`), for
/// validating a config/script pairing without producing real tiles.
pub fn strip_outputs(config: &SliceConfig) -> SliceConfig {
    let mut stripped = config.clone();
    stripped.settings.minzoom = Some(0);
    stripped.settings.maxzoom = Some(0);
    stripped
}

#[derive(Debug, Default)]
struct Merger {
    merged: MergedConfig,
    layer_origin: HashMap<String, String>,
    has_settings: bool,
}

impl Merger {
    fn absorb(&mut self, slice: &str, config: &SliceConfig) {
        self.merged.sources.push(slice.to_string());

        self.merge_settings(slice, &config.settings);

        for (layer, definition) in &config.layers {
            if let Some(first) = self.layer_origin.insert(layer.clone(), slice.to_string()) {
                self.warn(MergeWarning::DuplicateLayer {
                    layer: layer.clone(),
                    first,
                    second: slice.to_string(),
                });
            }
            self.merged.config.layers.insert(layer.clone(), definition.clone());
        }

        for (key, value) in &config.extra {
            if self.merged.config.extra.contains_key(key) {
                self.warn(MergeWarning::UnexpectedKey {
                    slice: slice.to_string(),
                    key: key.clone(),
                });
            } else {
                self.merged.config.extra.insert(key.clone(), value.clone());
            }
        }
    }

    fn merge_settings(&mut self, slice: &str, incoming: &Settings) {
        if !self.has_settings {
            if *incoming != Settings::default() {
                self.merged.config.settings = incoming.clone();
                self.has_settings = true;
            }
            return;
        }

        let acc = &mut self.merged.config.settings;

        acc.minzoom = combine(acc.minzoom, incoming.minzoom, std::cmp::min);
        acc.maxzoom = combine(acc.maxzoom, incoming.maxzoom, std::cmp::max);
        acc.basezoom = combine(acc.basezoom, incoming.basezoom, std::cmp::max);

        last_wins(&mut acc.include_ids, &incoming.include_ids);
        last_wins(&mut acc.compress, &incoming.compress);
        last_wins(&mut acc.metadata, &incoming.metadata);
        last_wins(&mut acc.filemetadata, &incoming.filemetadata);
        last_wins(&mut acc.combine_below, &incoming.combine_below);
        last_wins(&mut acc.name, &incoming.name);
        last_wins(&mut acc.version, &incoming.version);
        last_wins(&mut acc.description, &incoming.description);

        for key in incoming.extra.keys() {
            self.warn(MergeWarning::UnknownSetting {
                slice: slice.to_string(),
                key: key.clone(),
            });
        }
    }

    fn warn(&mut self, warning: MergeWarning) {
        warn!("{}", warning);
        self.merged.warnings.push(warning);
    }

    fn finish(self) -> MergedConfig {
        self.merged
    }
}

fn combine<T>(acc: Option<T>, incoming: Option<T>, pick: fn(T, T) -> T) -> Option<T> {
    match (acc, incoming) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => b.or(a),
    }
}

fn last_wins<T: Clone>(acc: &mut Option<T>, incoming: &Option<T>) {
    if let Some(value) = incoming {
        *acc = Some(value.clone());
    }
}
