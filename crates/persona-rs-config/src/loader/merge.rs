//! Layer merging for JSON config documents.

use serde_json::Value;

/// Fold `layer` into `base`. Objects merge key by key; any other value in
/// `layer` replaces what `base` held.
pub(super) fn merge_layer(base: &mut Value, layer: Value) {
    let Value::Object(entries) = layer else {
        *base = layer;
        return;
    };
    if !base.is_object() {
        *base = Value::Object(serde_json::Map::new());
    }
    if let Value::Object(target) = base {
        for (key, value) in entries {
            match target.get_mut(&key) {
                Some(slot) => merge_layer(slot, value),
                None => {
                    target.insert(key, value);
                }
            }
        }
    }
}
