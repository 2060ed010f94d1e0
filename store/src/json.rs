use serde_json::Value;

/// Coerces a JSON value for persistence (§4.1 JSON safety): numeric leaves
/// stay language-native numbers, nested arrays/maps are preserved
/// structurally, and any value tagged as a timestamp elsewhere in the
/// workspace has already been rendered to an RFC3339 string by the caller
/// before it reaches here — this pass only normalises number representation
/// so values round-trip identically through `serde_json::to_string`.
pub fn sanitize(value: &Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.iter().map(sanitize).collect()),
        Value::Object(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), sanitize(v))).collect())
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null)
            } else {
                value.clone()
            }
        }
        other => other.clone(),
    }
}
