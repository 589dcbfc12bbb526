//! Built-in project defaults (layer 1)

use serde::{Deserialize, Serialize};

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Directory holding slice configs and scripts (default: "slices")
    pub slices_dir: String,

    /// Directory holding style fragments (default: "styles")
    pub styles_dir: String,

    /// Base name of the root style document (default: "style")
    pub base_style: String,

    /// Where built archives are written (default: ".")
    pub output_dir: String,

    /// Base URL tile archives are served from
    pub tiles_base_url: String,

    /// Tile engine executable (default: "tilemaker")
    pub engine_program: String,

    /// Keep generated build files (default: false)
    pub keep_files: bool,

    /// Treat merge warnings as errors (default: false)
    pub strict: bool,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            slices_dir: "slices".to_string(),
            styles_dir: "styles".to_string(),
            base_style: "style".to_string(),
            output_dir: ".".to_string(),
            tiles_base_url: "http://localhost:8081".to_string(),
            engine_program: "tilemaker".to_string(),
            keep_files: false,
            strict: false,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "slices_dir": self.slices_dir,
            "styles_dir": self.styles_dir,
            "base_style": self.base_style,
            "output_dir": self.output_dir,
            "tiles_base_url": self.tiles_base_url,
            "engine": {
                "program": self.engine_program,
                "args": []
            },
            "keep_files": self.keep_files,
            "strict": self.strict,
            "colors": {}
        })
    }
}
