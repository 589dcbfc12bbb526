//! mapt - compose map tile builds and styles from independent slices
//!
//! A project holds many *slices* (a tile-layer configuration plus a Lua
//! processing module) and many *style fragments*. This crate merges slice
//! configurations, composes their processing modules into one entry script,
//! drives the external tile engine, and stitches style fragments into one
//! servable style document.

pub mod build;
pub mod config;
pub mod error;
pub mod inputs;
pub mod logging;
pub mod merge;
pub mod script;
pub mod signal;
pub mod style;

pub use build::{BuildError, BuildMode, BuildRequest, BuildSummary, Builder, ProcessEngine, TileEngine};
pub use config::{Project, ProjectConfig};
pub use error::{MaptError, MaptResult};
pub use inputs::{discover_styles, SliceSet, StyleInputs};
pub use merge::{merge, strip_outputs, MergeOptions, MergeWarning, MergedConfig};
pub use script::{compose, ComposedScript, CompositeScript, ScriptHooks, ScriptModule};
pub use style::{ArchiveLayout, StyleService};

pub use mapt_schema::{SliceConfig, StyleDocument};
pub use mapt_style::{LayerIndex, UrlPolicy};
