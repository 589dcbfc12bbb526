//! Discovery of slice and style inputs on disk.
//!
//! Slices live in one directory as `<name>.json` (configuration) with a
//! sibling `<name>.lua` (processing module). Style fragments live in another
//! directory as `<name>.json`, one of which is the base document. Listings
//! are non-recursive and sorted by file name.

use std::path::{Path, PathBuf};

use mapt_schema::{SchemaError, SliceConfig, StyleDocument};
use mapt_style::Fragment;
use tracing::debug;
use walkdir::WalkDir;

use crate::script::ScriptModule;

/// Input discovery errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("directory not found: {}", .0.display())]
    MissingDir(PathBuf),

    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("unknown slice '{name}' (available: {})", available.join(", "))]
    UnknownSlice { name: String, available: Vec<String> },

    #[error("slice '{slice}' has no script module at {}", path.display())]
    MissingScript { slice: String, path: PathBuf },

    #[error("base style not found at {}", .0.display())]
    MissingBaseStyle(PathBuf),

    #[error("no slices found in {}", .0.display())]
    NoSlices(PathBuf),
}

/// One slice as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceInput {
    pub name: String,
    pub config_path: PathBuf,

    /// Sibling `.lua` module, if present
    pub script_path: Option<PathBuf>,
}

impl SliceInput {
    fn from_config_path(path: &Path) -> Option<Self> {
        let name = json_stem(path)?;
        let script = path.with_extension("lua");
        Some(Self {
            name,
            config_path: path.to_path_buf(),
            script_path: script.is_file().then_some(script),
        })
    }

    /// The slice's processing module; required for builds.
    pub fn script_module(&self) -> Result<ScriptModule, InputError> {
        match &self.script_path {
            Some(path) => Ok(ScriptModule::new(&self.name, path)),
            None => Err(InputError::MissingScript {
                slice: self.name.clone(),
                path: self.config_path.with_extension("lua"),
            }),
        }
    }

    pub fn load_config(&self) -> Result<SliceConfig, InputError> {
        Ok(SliceConfig::from_path(&self.config_path)?)
    }
}

/// Ordered slices of a project
#[derive(Debug, Clone, Default)]
pub struct SliceSet {
    slices: Vec<SliceInput>,
}

impl SliceSet {
    /// List every slice in `dir`.
    pub fn discover(dir: &Path) -> Result<Self, InputError> {
        let slices: Vec<SliceInput> = json_files(dir)?
            .iter()
            .filter_map(|path| SliceInput::from_config_path(path))
            .collect();
        debug!(dir = %dir.display(), count = slices.len(), "discovered slices");
        Ok(Self { slices })
    }

    /// Restrict to `names`, in the order given. An empty list keeps
    /// everything.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, InputError> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        let slices = names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                self.get(name).cloned().ok_or_else(|| InputError::UnknownSlice {
                    name: name.to_string(),
                    available: self.names().map(str::to_string).collect(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { slices })
    }

    pub fn get(&self, name: &str) -> Option<&SliceInput> {
        self.slices.iter().find(|s| s.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.slices.iter().map(|s| s.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SliceInput> {
        self.slices.iter()
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    /// Parse every slice configuration, keeping order.
    pub fn load_configs(&self) -> Result<Vec<(String, SliceConfig)>, InputError> {
        self.slices
            .iter()
            .map(|s| Ok((s.name.clone(), s.load_config()?)))
            .collect()
    }

    /// Script modules of every slice, in order.
    pub fn script_modules(&self) -> Result<Vec<ScriptModule>, InputError> {
        self.slices.iter().map(SliceInput::script_module).collect()
    }
}

/// The base style document plus fragments, in file-name order
#[derive(Debug, Clone)]
pub struct StyleInputs {
    pub base: StyleDocument,
    pub fragments: Vec<Fragment>,
}

/// Load the style documents in `dir`; `base_name` selects the base.
pub fn discover_styles(dir: &Path, base_name: &str) -> Result<StyleInputs, InputError> {
    let mut base = None;
    let mut fragments = Vec::new();

    for path in json_files(dir)? {
        let Some(name) = json_stem(&path) else {
            continue;
        };
        let document = StyleDocument::from_path(&path)?;
        if name == base_name {
            base = Some(document);
        } else {
            fragments.push(Fragment::new(name, document));
        }
    }

    let base = base.ok_or_else(|| InputError::MissingBaseStyle(dir.join(format!("{}.json", base_name))))?;
    debug!(dir = %dir.display(), fragments = fragments.len(), "discovered style fragments");
    Ok(StyleInputs { base, fragments })
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>, InputError> {
    if !dir.is_dir() {
        return Err(InputError::MissingDir(dir.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by(|a, b| a.file_name().cmp(b.file_name()))
    {
        let entry = entry?;
        if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "json") {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn json_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
