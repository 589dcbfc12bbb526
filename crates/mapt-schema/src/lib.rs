//! Mapt document types
//!
//! Typed views of the two document families mapt composes: slice
//! configurations (tile layer definitions plus build settings) and style
//! fragments (sources plus rendering layers). Both are authored as
//! permissive JSON and read through [`relaxed`].

pub mod error;
pub mod relaxed;
pub mod slice;
pub mod style;

pub use error::SchemaError;
pub use relaxed::{load, parse_relaxed};
pub use slice::{LayerDefinition, Settings, SliceConfig, KNOWN_SETTINGS};
pub use style::{StyleDocument, StyleLayer};
