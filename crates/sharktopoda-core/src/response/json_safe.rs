use crate::response::PayloadValue;

use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};
use tracing::debug;

/// Render payload entries as JSON, replacing anything that cannot be
/// represented with `null` instead of failing the whole response.
pub(crate) fn make_json_safe(entries: &BTreeMap<String, PayloadValue>) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.clone(), json_safe_value(key, value)))
        .collect()
}

fn json_safe_value(key: &str, value: &PayloadValue) -> Value {
    match value {
        PayloadValue::Json(json) => json.clone(),
        PayloadValue::Uuid(uuid) => Value::String(uuid.hyphenated().to_string()),
        PayloadValue::Url(url) => Value::String(url.to_string()),
        PayloadValue::Float(float) => match Number::from_f64(*float) {
            Some(number) => Value::Number(number),
            None => {
                debug!(key, value = float, "Non-finite number replaced with null");
                Value::Null
            }
        },
        PayloadValue::List(items) => Value::Array(
            items
                .iter()
                .map(|item| json_safe_value(key, item))
                .collect(),
        ),
        PayloadValue::Map(entries) => Value::Object(make_json_safe(entries)),
    }
}
