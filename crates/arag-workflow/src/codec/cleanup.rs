//! Empty-string normalization.

use serde_json::Value;

use crate::node::Config;

/// Replaces every empty-string leaf with `null`, through nested objects and arrays.
///
/// Forms submit `""` for unset fields while the backend expects `null`.
pub fn cleanup(mut config: Config) -> Config {
    for value in config.values_mut() {
        normalize(value);
    }
    config
}

fn normalize(value: &mut Value) {
    match value {
        Value::String(text) if text.is_empty() => *value = Value::Null,
        Value::Object(object) => object.values_mut().for_each(normalize),
        Value::Array(items) => items.iter_mut().for_each(normalize),
        _ => {}
    }
}
