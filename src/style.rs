//! Merged style document for a project.

use mapt_schema::StyleDocument;
use mapt_style::{stitch, ColorRewrite, Identity, LayerIndex, StitchError, StyleTransform, UrlPolicy};

use crate::config::Project;
use crate::inputs::{discover_styles, InputError, SliceSet};

/// Style errors
#[derive(Debug, thiserror::Error)]
pub enum StyleError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where stitched sources should point
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ArchiveLayout {
    /// One archive per slice (`mapt build --many`)
    #[default]
    PerSlice,
    /// One combined archive (`mapt build`)
    Single,
    /// An externally hosted archive
    External(String),
}

/// Produces the merged style document from a project's current inputs
#[derive(Debug, Clone, Copy)]
pub struct StyleService<'a> {
    project: &'a Project,
}

impl<'a> StyleService<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// URL policy for `layout`, against the project's tile base URL
    pub fn url_policy(&self, layout: &ArchiveLayout) -> UrlPolicy {
        let base_url = self.project.config.tiles_base_url.clone();
        match layout {
            ArchiveLayout::PerSlice => UrlPolicy::PerFragment { base_url },
            ArchiveLayout::Single => UrlPolicy::Single { base_url },
            ArchiveLayout::External(url) => UrlPolicy::External { url: url.clone() },
        }
    }

    /// Re-read every slice and style fragment and stitch them.
    pub fn merged_style(&self, layout: &ArchiveLayout) -> Result<StyleDocument, StyleError> {
        let config = &self.project.config;
        let styles = discover_styles(&self.project.styles_dir(), &config.base_style)?;
        let slices = SliceSet::discover(&self.project.slices_dir())?.load_configs()?;

        let index = LayerIndex::build(
            &styles.base,
            slices.iter().map(|(name, slice)| (name.as_str(), slice)),
        );

        let colors = ColorRewrite::new(config.colors.iter());
        let transform: &dyn StyleTransform = if colors.is_empty() { &Identity } else { &colors };

        Ok(stitch(
            &styles.base,
            &styles.fragments,
            &index,
            &self.url_policy(layout),
            transform,
        )?)
    }

    /// The merged style as a JSON value, for embedding in a response
    pub fn merged_style_value(&self, layout: &ArchiveLayout) -> Result<serde_json::Value, StyleError> {
        Ok(serde_json::to_value(self.merged_style(layout)?)?)
    }
}
