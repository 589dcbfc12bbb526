//! Style documents.
//!
//! The root style document and every style fragment share one shape: a map
//! of data sources and an ordered list of rendering layers. All other
//! top-level keys (`version`, `glyphs`, `sprite`, ...) are carried through
//! untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

use crate::error::SchemaError;

/// A style document or style fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDocument {
    /// Data sources keyed by source name
    #[serde(default)]
    pub sources: Map<String, Value>,

    /// Rendering layers in paint order
    #[serde(default)]
    pub layers: Vec<StyleLayer>,

    /// Other top-level style keys
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StyleDocument {
    /// Load a style document from a permissive JSON file.
    pub fn from_path(path: &Path) -> Result<Self, SchemaError> {
        crate::relaxed::load(path)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// One rendering layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleLayer {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Tile layer this style layer draws from
    #[serde(
        rename = "source-layer",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_layer: Option<String>,

    /// Rendering properties (`type`, `paint`, `layout`, `filter`, ...)
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl StyleLayer {
    /// The source layer, ignoring empty strings.
    pub fn source_layer(&self) -> Option<&str> {
        self.source_layer.as_deref().filter(|s| !s.is_empty())
    }
}
