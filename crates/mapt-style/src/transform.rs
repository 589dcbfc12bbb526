//! Post-processing transforms applied to a fully stitched style.

use std::collections::BTreeMap;

use mapt_schema::StyleDocument;
use serde_json::Value;

/// A transform over the assembled style document.
pub trait StyleTransform {
    fn apply(&self, style: &mut StyleDocument);
}

/// Leaves the document untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl StyleTransform for Identity {
    fn apply(&self, _style: &mut StyleDocument) {}
}

/// Replaces colour values inside every layer's `paint` object.
///
/// Matching is exact after ASCII lowercasing, and reaches into expressions
/// (arrays and nested objects) as well as plain property values.
#[derive(Debug, Clone, Default)]
pub struct ColorRewrite {
    table: BTreeMap<String, String>,
}

impl ColorRewrite {
    pub fn new<K, V>(table: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            table: table
                .into_iter()
                .map(|(from, to)| (from.as_ref().to_ascii_lowercase(), to.into()))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn rewrite(&self, value: &mut Value) {
        match value {
            Value::String(s) => {
                if let Some(to) = self.table.get(&s.to_ascii_lowercase()) {
                    *s = to.clone();
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|v| self.rewrite(v)),
            Value::Object(map) => map.values_mut().for_each(|v| self.rewrite(v)),
            _ => {}
        }
    }
}

impl StyleTransform for ColorRewrite {
    fn apply(&self, style: &mut StyleDocument) {
        if self.table.is_empty() {
            return;
        }
        for layer in &mut style.layers {
            if let Some(paint) = layer.properties.get_mut("paint") {
                self.rewrite(paint);
            }
        }
    }
}
