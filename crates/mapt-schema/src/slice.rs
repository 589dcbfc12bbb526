//! Slice configuration documents.
//!
//! A slice configuration has two sections: `settings` (scalar build
//! parameters for the tile engine) and `layers` (tile layer definitions keyed
//! by layer name). Anything else lands in an extension bag so that callers
//! can flag it instead of silently dropping it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::SchemaError;

/// Settings keys with a defined combination policy.
pub const KNOWN_SETTINGS: &[&str] = &[
    "minzoom",
    "maxzoom",
    "basezoom",
    "name",
    "version",
    "description",
    "include_ids",
    "compress",
    "metadata",
    "filemetadata",
    "combine_below",
];

/// One slice configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliceConfig {
    /// Scalar build parameters
    #[serde(default)]
    pub settings: Settings,

    /// Tile layer definitions, in document order
    #[serde(default)]
    pub layers: Map<String, Value>,

    /// Unrecognised top-level keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SliceConfig {
    /// Load a slice configuration from a permissive JSON file.
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        crate::relaxed::load(path)
    }

    /// Iterate layer definitions in document order.
    pub fn layer_definitions(&self) -> impl Iterator<Item = (&str, LayerDefinition<'_>)> {
        self.layers
            .iter()
            .map(|(name, value)| (name.as_str(), LayerDefinition(value)))
    }
}

/// Build settings of a slice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minzoom: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maxzoom: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basezoom: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_ids: Option<bool>,

    /// Tile compression: "gzip", "deflate" or "none"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filemetadata: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub combine_below: Option<u32>,

    /// Settings keys without a combination policy
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Borrowed view of a tile layer definition.
///
/// The definition is opaque except for `zindex`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerDefinition<'a>(pub &'a Value);

impl<'a> LayerDefinition<'a> {
    /// The raw `zindex` value, if present.
    pub fn raw_zindex(&self) -> Option<&'a Value> {
        self.0.get("zindex")
    }

    /// The explicit z-index, if present and numeric. Fractional values are
    /// valid z-orders.
    pub fn zindex(&self) -> Option<f64> {
        self.raw_zindex().and_then(Value::as_f64)
    }
}
