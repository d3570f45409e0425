use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Map, Number, Value as Json};

use super::registry::{
    is_builtin, TypeRegistry, BYTES_TAG, CLASS_KEY, HISTORY_TAG, MAP_TAG, UUID_TAG, VALUE_KEY,
};
use super::CodecError;
use crate::message::Value;

pub(crate) fn encode_value(value: &Value) -> Result<Json, CodecError> {
    Ok(match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(n) => Json::Number((*n).into()),
        Value::Float(f) => Json::Number(Number::from_f64(*f).ok_or(CodecError::NonFiniteFloat)?),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => tagged(BYTES_TAG, Json::String(STANDARD.encode(bytes))),
        Value::Uuid(id) => tagged(UUID_TAG, Json::String(id.to_string())),
        Value::List(items) => Json::Array(items.iter().map(encode_value).collect::<Result<_, _>>()?),
        Value::Map(entries) => {
            let mut out = Map::new();
            for (key, value) in entries {
                out.insert(key.clone(), encode_value(value)?);
            }
            tagged(MAP_TAG, Json::Object(out))
        }
        Value::History(entries) => json!({
            CLASS_KEY: HISTORY_TAG,
            "components": entries,
        }),
        Value::Object(obj) => {
            if is_builtin(&obj.type_tag) {
                return Err(CodecError::ReservedTag(obj.type_tag.clone()));
            }
            tagged(&obj.type_tag, obj.fields.clone())
        }
    })
}

pub(crate) fn decode_value(registry: &TypeRegistry, json: &Json) -> Result<Value, CodecError> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().ok_or(CodecError::NonFiniteFloat)?),
        },
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::List(
            items
                .iter()
                .map(|item| decode_value(registry, item))
                .collect::<Result<_, _>>()?,
        ),
        Json::Object(object) => {
            let tag = object
                .get(CLASS_KEY)
                .and_then(Json::as_str)
                .ok_or_else(|| CodecError::Malformed("object value without a type tag".into()))?;
            registry.decode_tagged(tag, object)?
        }
    })
}

fn tagged(tag: &str, body: Json) -> Json {
    let mut out = Map::new();
    out.insert(CLASS_KEY.to_string(), Json::String(tag.to_string()));
    out.insert(VALUE_KEY.to_string(), body);
    Json::Object(out)
}
