//! Inbound payload decoding.
//!
//! Payloads must be UTF-8 JSON objects. Anything else is rejected; callers
//! drop rejected payloads and log them.

use plantmon_core::MetricMap;
use serde_json::Value;

use crate::error::{MqttError, MqttResult};

pub fn decode_payload(topic: &str, raw: &[u8]) -> MqttResult<MetricMap> {
    let decode_error = |reason: String| MqttError::Decode {
        topic: topic.to_string(),
        reason,
    };

    let text = std::str::from_utf8(raw).map_err(|e| decode_error(e.to_string()))?;
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(decode_error(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
        Err(e) => Err(decode_error(e.to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
