//! Build summary (build_summary.json)

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use super::BuildMode;
use crate::inputs::SliceInput;
use crate::merge::MergeWarning;

/// Schema version for build_summary.json
pub const BUILD_SUMMARY_SCHEMA_VERSION: u32 = 1;

/// Content digests of one slice's inputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SliceDigest {
    pub slice: String,
    pub config_sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_sha256: Option<String>,
}

impl SliceDigest {
    pub fn of(input: &SliceInput) -> io::Result<Self> {
        Ok(Self {
            slice: input.name.clone(),
            config_sha256: file_sha256(&input.config_path)?,
            script_sha256: input.script_path.as_deref().map(file_sha256).transpose()?,
        })
    }
}

/// What a build did
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub mode: BuildMode,
    pub dry_run: bool,

    /// Source extracts fed to the engine
    pub inputs: Vec<PathBuf>,

    pub slices: Vec<SliceDigest>,

    /// Archives written, in build order
    pub outputs: Vec<PathBuf>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<MergeWarning>,

    pub duration_ms: u64,

    /// Scratch directory, when build files are kept
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_dir: Option<PathBuf>,
}

impl BuildSummary {
    pub fn new(mode: BuildMode, dry_run: bool, inputs: Vec<PathBuf>) -> Self {
        Self {
            schema_version: BUILD_SUMMARY_SCHEMA_VERSION,
            created_at: Utc::now(),
            mode,
            dry_run,
            inputs,
            slices: Vec::new(),
            outputs: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
            work_dir: None,
        }
    }

    /// One-line description for the terminal
    pub fn human_summary(&self) -> String {
        let verb = if self.dry_run { "checked" } else { "built" };
        let mut line = format!(
            "{} {} slice(s) into {} archive(s) in {:.1}s",
            verb,
            self.slices.len(),
            self.outputs.len(),
            self.duration_ms as f64 / 1000.0
        );
        if !self.warnings.is_empty() {
            line.push_str(&format!(", {} merge warning(s)", self.warnings.len()));
        }
        line
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write as pretty JSON
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        fs::write(path, json)
    }
}

fn file_sha256(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
