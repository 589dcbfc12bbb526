//! Style stitching for mapt.
//!
//! Merges independently authored style fragments into one servable style
//! document:
//! - [`LayerIndex`] resolves an explicit z-order for every tile layer
//! - [`stitch`] de-duplicates sources, namespaces layer ids, validates
//!   `source-layer` references and sorts layers into paint order
//! - [`StyleTransform`] post-processes the assembled document

mod error;
mod layer_index;
mod source;
mod stitch;
mod transform;

pub use error::StitchError;
pub use layer_index::LayerIndex;
pub use source::{SourceRegistry, UrlPolicy};
pub use stitch::{stitch, Fragment};
pub use transform::{ColorRewrite, Identity, StyleTransform};

/// Z-index of layers with no explicit ordering; they paint last.
pub const DEFAULT_ZINDEX: f64 = 99999.0;
