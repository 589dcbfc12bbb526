//! Style fragment stitching.

use std::collections::{HashMap, HashSet};

use mapt_schema::{StyleDocument, StyleLayer};
use serde_json::Value;
use tracing::debug;

use crate::error::StitchError;
use crate::layer_index::LayerIndex;
use crate::source::{SourceRegistry, UrlPolicy};
use crate::transform::StyleTransform;

/// A named style fragment. The name matches the slice whose tiles it draws.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub name: String,
    pub document: StyleDocument,
}

impl Fragment {
    pub fn new(name: impl Into<String>, document: StyleDocument) -> Self {
        Self {
            name: name.into(),
            document,
        }
    }
}

/// Paint-order sort key: (z-index, document ordinal, position in document).
///
/// The root document is ordinal 0; fragments count up from 1 in input order.
type OrderKey = (f64, usize, usize);

/// Merge `fragments` into a copy of `base`.
///
/// Fragment sources are rewritten by `policy` and de-duplicated by URL,
/// fragment layer ids become `<fragment>-<id>`, and every `source-layer`
/// must be declared by the fragment's slice. Layers are then ordered by
/// z-index, and `transform` runs over the finished document.
pub fn stitch(
    base: &StyleDocument,
    fragments: &[Fragment],
    index: &LayerIndex,
    policy: &UrlPolicy,
    transform: &dyn StyleTransform,
) -> Result<StyleDocument, StitchError> {
    let mut merged = base.clone();
    let mut registry = SourceRegistry::seeded(&merged.sources);
    let mut seen_ids: HashSet<String> = merged.layers.iter().map(|l| l.id.clone()).collect();

    let mut keyed: Vec<(OrderKey, StyleLayer)> = std::mem::take(&mut merged.layers)
        .into_iter()
        .enumerate()
        .map(|(position, layer)| ((sort_zindex(index, &layer), 0, position), layer))
        .collect();

    for (ordinal, fragment) in fragments.iter().enumerate() {
        let url = policy.url_for(&fragment.name);

        let mut key_map: HashMap<&str, String> = HashMap::new();
        for (key, definition) in &fragment.document.sources {
            let mut definition = definition.clone();
            if let Some(object) = definition.as_object_mut() {
                if object.contains_key("url") {
                    object.insert("url".to_string(), Value::String(url.clone()));
                }
            }
            let assigned = registry.register(definition, &mut merged.sources);
            debug!(fragment = %fragment.name, source = %key, assigned = %assigned, "registered source");
            key_map.insert(key.as_str(), assigned);
        }

        for (position, layer) in fragment.document.layers.iter().enumerate() {
            if let Some(source_layer) = layer.source_layer() {
                if !index.declares(&fragment.name, source_layer) {
                    return Err(StitchError::UnknownSourceLayer {
                        fragment: fragment.name.clone(),
                        layer: source_layer.to_string(),
                    });
                }
            }

            let mut layer = layer.clone();
            let original_id = std::mem::take(&mut layer.id);
            layer.id = format!("{}-{}", fragment.name, original_id);

            if let Some(source) = layer.source.take() {
                let Some(assigned) = key_map.get(source.as_str()) else {
                    return Err(StitchError::UnknownSource {
                        fragment: fragment.name.clone(),
                        layer: original_id,
                        source_key: source,
                    });
                };
                layer.source = Some(assigned.clone());
            }

            if !seen_ids.insert(layer.id.clone()) {
                return Err(StitchError::DuplicateLayerId {
                    fragment: fragment.name.clone(),
                    id: layer.id,
                });
            }

            keyed.push(((sort_zindex(index, &layer), ordinal + 1, position), layer));
        }
    }

    keyed.sort_by(|(a, _), (b, _)| {
        a.0.total_cmp(&b.0)
            .then(a.1.cmp(&b.1))
            .then(a.2.cmp(&b.2))
    });
    merged.layers = keyed.into_iter().map(|(_, layer)| layer).collect();

    transform.apply(&mut merged);
    Ok(merged)
}

fn sort_zindex(index: &LayerIndex, layer: &StyleLayer) -> f64 {
    index.resolve(layer.source_layer().unwrap_or(&layer.id))
}
