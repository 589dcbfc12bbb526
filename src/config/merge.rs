//! Configuration layer merging
//!
//! Objects merge key by key, arrays are replaced wholesale and scalars are
//! overridden by the later layer.

use serde_json::Value;

/// Lay `top` over `base`.
pub fn overlay(base: Value, top: Value) -> Value {
    match (base, top) {
        (Value::Object(mut merged), Value::Object(top)) => {
            for (key, value) in top {
                let value = match merged.remove(&key) {
                    Some(existing) => overlay(existing, value),
                    None => value,
                };
                merged.insert(key, value);
            }
            Value::Object(merged)
        }
        // Arrays, scalars and nulls all replace
        (_, top) => top,
    }
}

/// Stack layers in precedence order (first is lowest).
pub fn stack_layers(layers: Vec<Value>) -> Value {
    layers.into_iter().fold(Value::Null, overlay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_override() {
        let merged = overlay(json!({"keep_files": false}), json!({"keep_files": true}));
        assert_eq!(merged["keep_files"], true);
    }

    #[test]
    fn test_nested_tables_merge() {
        let merged = overlay(
            json!({"engine": {"program": "tilemaker", "args": []}}),
            json!({"engine": {"program": "/opt/tilemaker/bin/tilemaker"}}),
        );
        assert_eq!(merged["engine"]["program"], "/opt/tilemaker/bin/tilemaker");
        assert_eq!(merged["engine"]["args"], json!([]));
    }

    #[test]
    fn test_arrays_replace() {
        let merged = overlay(
            json!({"engine": {"args": ["--fast", "--verbose"]}}),
            json!({"engine": {"args": ["--store", "/tmp/store"]}}),
        );
        assert_eq!(merged["engine"]["args"], json!(["--store", "/tmp/store"]));
    }

    #[test]
    fn test_null_overrides() {
        let merged = overlay(json!({"output_dir": "out"}), json!({"output_dir": null}));
        assert!(merged["output_dir"].is_null());
    }

    #[test]
    fn test_stack_precedence() {
        let merged = stack_layers(vec![
            json!({"slices_dir": "slices", "colors": {"#fff": "#eee"}}),
            json!({"slices_dir": "layers"}),
            json!({"colors": {"#000": "#111"}}),
        ]);
        assert_eq!(merged["slices_dir"], "layers");
        assert_eq!(merged["colors"]["#fff"], "#eee");
        assert_eq!(merged["colors"]["#000"], "#111");
    }
}
