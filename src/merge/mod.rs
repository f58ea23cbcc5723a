//! Deep merging of JSON patch objects.
//!
//! Each pending delta contributes a small patch object for its target model.
//! Before a model is pushed to the cloud these patches are folded into one
//! payload with [`merge_json`]:
//!
//! | Source value | Target value | Result |
//! |--------------|--------------|--------|
//! | object | object | merged key by key, recursively |
//! | anything | anything else | source replaces target |
//!
//! # Examples
//!
//! ```
//! use iotile_cloud::merge::merge_json;
//! use serde_json::json;
//!
//! let mut patch = json!({"label": "Pump", "extra": {"a": 1}});
//! merge_json(&mut patch, &json!({"lat": 1.5, "extra": {"b": 2}}));
//!
//! assert_eq!(patch, json!({"label": "Pump", "lat": 1.5, "extra": {"a": 1, "b": 2}}));
//! ```

use serde_json::{Map, Value};

/// Merge `source` into `target`, later keys winning on collision.
pub fn merge_json(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => merge_maps(target, source),
        (target, source) => *target = source.clone(),
    }
}

/// Merge the entries of `source` into `target`.
pub fn merge_maps(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        let nested = value.is_object() && target.get(key).is_some_and(Value::is_object);
        if nested {
            if let Some(existing) = target.get_mut(key) {
                merge_json(existing, value);
            }
        } else {
            target.insert(key.clone(), value.clone());
        }
    }
}
