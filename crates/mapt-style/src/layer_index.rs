//! Layer z-order index.
//!
//! Built from two sources:
//! 1. base style layer ids ending in `-<digits>` (synthetic layers such as
//!    background or hillshade that no slice produces)
//! 2. `zindex` fields on slice layer definitions
//!
//! The same scan records which tile layers each slice declares, which the
//! stitcher uses to validate `source-layer` references.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use mapt_schema::{SliceConfig, StyleDocument};
use regex_lite::Regex;
use tracing::warn;

use crate::DEFAULT_ZINDEX;

fn suffix_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"-([0-9]+)$").expect("static pattern"))
}

/// Layer name to z-order mapping plus per-slice declared layers.
///
/// Z-orders are any JSON number, so `2.5` sorts between `2` and `3`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerIndex {
    zindex: BTreeMap<String, f64>,
    layers_in_file: BTreeMap<String, BTreeSet<String>>,
}

impl LayerIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from the base style and every slice configuration.
    pub fn build<'a, I>(base: &StyleDocument, slices: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a SliceConfig)>,
    {
        let mut index = Self::new();

        for layer in &base.layers {
            if let Some(captures) = suffix_pattern().captures(&layer.id) {
                if let Ok(z) = captures[1].parse::<f64>() {
                    index.set_zindex(&layer.id, z);
                }
            }
        }

        // Slice entries are written second and win on collision.
        for (slice, config) in slices {
            let mut declared = Vec::new();
            for (name, definition) in config.layer_definitions() {
                declared.push(name.to_string());
                match (definition.zindex(), definition.raw_zindex()) {
                    (Some(z), _) => index.set_zindex(name, z),
                    (None, Some(raw)) if !raw.is_null() => {
                        warn!(slice, layer = name, zindex = %raw, "non-numeric zindex ignored");
                    }
                    _ => {}
                }
            }
            index.declare_layers(slice, declared);
        }

        index
    }

    /// Record an explicit z-index.
    pub fn set_zindex(&mut self, layer: &str, zindex: f64) {
        self.zindex.insert(layer.to_string(), zindex);
    }

    /// Record the tile layers a slice defines.
    pub fn declare_layers<S: Into<String>>(&mut self, slice: &str, layers: impl IntoIterator<Item = S>) {
        self.layers_in_file
            .entry(slice.to_string())
            .or_default()
            .extend(layers.into_iter().map(Into::into));
    }

    /// Explicit z-index for a layer, if any.
    pub fn zindex(&self, layer: &str) -> Option<f64> {
        self.zindex.get(layer).copied()
    }

    /// Z-index for a layer, falling back to [`DEFAULT_ZINDEX`].
    pub fn resolve(&self, layer: &str) -> f64 {
        self.zindex(layer).unwrap_or(DEFAULT_ZINDEX)
    }

    /// Tile layers declared by a slice, if the slice is known.
    pub fn layers_in(&self, slice: &str) -> Option<&BTreeSet<String>> {
        self.layers_in_file.get(slice)
    }

    /// Whether `slice` declares tile layer `layer`.
    pub fn declares(&self, slice: &str, layer: &str) -> bool {
        self.layers_in(slice).is_some_and(|set| set.contains(layer))
    }

    /// Number of layers with an explicit z-index.
    pub fn len(&self) -> usize {
        self.zindex.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zindex.is_empty()
    }
}
