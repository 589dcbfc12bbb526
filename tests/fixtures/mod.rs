//! Shared fixtures for integration tests
//!
//! `project/` is a small mapt project: two slices (water, roads), a base
//! style with synthetic layers, and one style fragment per slice.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Path to the fixture project
pub fn project_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/project")
}

/// Copy the fixture project into a fresh temp directory
pub fn copy_project() -> tempfile::TempDir {
    let dest = tempfile::tempdir().unwrap();
    let src = project_path();
    for entry in WalkDir::new(&src).min_depth(1) {
        let entry = entry.unwrap();
        let target = dest.path().join(entry.path().strip_prefix(&src).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
    dest
}

/// Write a file relative to `root`, creating parent directories
pub fn write(root: &Path, relative: &str, contents: &str) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// Lua source registering stand-ins for the tile engine's globals.
///
/// `tags` holds the current object's tags; `Layer` and `Attribute` calls are
/// appended to `emitted` as strings.
pub const ENGINE_STUBS: &str = r#"
tags = {}
emitted = {}
function Find(key) return tags[key] or "" end
function Layer(name, area) table.insert(emitted, "layer:" .. name) end
function Attribute(key, value) table.insert(emitted, "attr:" .. key .. "=" .. value) end
"#;
