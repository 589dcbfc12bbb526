/// Errors that abort a stitch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StitchError {
    #[error("style fragment '{fragment}' references unknown tile layer '{layer}'")]
    UnknownSourceLayer { fragment: String, layer: String },

    #[error("style fragment '{fragment}': layer '{layer}' uses undefined source '{source_key}'")]
    UnknownSource {
        fragment: String,
        layer: String,
        source_key: String,
    },

    #[error("style fragment '{fragment}' produces duplicate layer id '{id}'")]
    DuplicateLayerId { fragment: String, id: String },
}
