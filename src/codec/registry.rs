//! TypeRegistry - maps stored type tags to value decoders.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use super::value::decode_value;
use super::CodecError;
use crate::message::{HistoryEntry, TypedObject, Value};

/// Key holding the type tag of a tagged object.
pub const CLASS_KEY: &str = "_class";
/// Key holding the body of a tagged object.
pub const VALUE_KEY: &str = "_value";

pub const UUID_TAG: &str = "uuid";
pub const BYTES_TAG: &str = "bytes";
pub const MAP_TAG: &str = "map";
pub const HISTORY_TAG: &str = "message_history";

const BUILTIN_TAGS: [&str; 4] = [UUID_TAG, BYTES_TAG, MAP_TAG, HISTORY_TAG];

/// Decoder for one type tag. Receives the registry (for nested values) and
/// the whole tagged object.
pub type TypeDecoder =
    Arc<dyn Fn(&TypeRegistry, &Map<String, Json>) -> Result<Value, CodecError> + Send + Sync>;

/// Registry of type tag -> decoder, populated once at startup.
///
/// A fresh registry already knows the built-in tags (`uuid`, `bytes`, `map`,
/// `message_history`). Application payload types are added with
/// [`TypeRegistry::register`].
#[derive(Clone)]
pub struct TypeRegistry {
    decoders: HashMap<String, TypeDecoder>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        f.debug_struct("TypeRegistry").field("tags", &tags).finish()
    }
}

impl TypeRegistry {
    /// Create a registry holding only the built-in tags.
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };
        registry.insert(UUID_TAG, Arc::new(decode_uuid));
        registry.insert(BYTES_TAG, Arc::new(decode_bytes));
        registry.insert(MAP_TAG, Arc::new(decode_map));
        registry.insert(HISTORY_TAG, Arc::new(decode_history));
        registry
    }

    /// Register an application type. Stored values under `tag` are accepted
    /// only if their fields deserialize as `T`.
    pub fn register<T: DeserializeOwned + 'static>(
        &mut self,
        tag: impl Into<String>,
    ) -> Result<&mut Self, CodecError> {
        let tag = tag.into();
        let owned = tag.clone();
        self.register_decoder(
            tag,
            Arc::new(move |_: &TypeRegistry, object: &Map<String, Json>| -> Result<Value, CodecError> {
                let fields = object.get(VALUE_KEY).cloned().unwrap_or(Json::Null);
                serde_json::from_value::<T>(fields.clone()).map_err(|e| {
                    CodecError::InvalidValue {
                        tag: owned.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Ok(Value::Object(TypedObject {
                    type_tag: owned.clone(),
                    fields,
                }))
            }),
        )
    }

    /// Register a custom decoder. Built-in tags cannot be replaced.
    pub fn register_decoder(
        &mut self,
        tag: impl Into<String>,
        decoder: TypeDecoder,
    ) -> Result<&mut Self, CodecError> {
        let tag = tag.into();
        if is_builtin(&tag) {
            return Err(CodecError::ReservedTag(tag));
        }
        self.insert(&tag, decoder);
        Ok(self)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    pub(crate) fn decode_tagged(
        &self,
        tag: &str,
        object: &Map<String, Json>,
    ) -> Result<Value, CodecError> {
        let decoder = self
            .decoders
            .get(tag)
            .ok_or_else(|| CodecError::UnknownType(tag.to_string()))?;
        decoder(self, object)
    }

    fn insert(&mut self, tag: &str, decoder: TypeDecoder) {
        self.decoders.insert(tag.to_string(), decoder);
    }
}

pub(crate) fn is_builtin(tag: &str) -> bool {
    BUILTIN_TAGS.contains(&tag)
}

fn body<'a>(tag: &str, object: &'a Map<String, Json>) -> Result<&'a Json, CodecError> {
    object.get(VALUE_KEY).ok_or_else(|| CodecError::InvalidValue {
        tag: tag.to_string(),
        reason: format!("missing '{}'", VALUE_KEY),
    })
}

fn decode_uuid(_: &TypeRegistry, object: &Map<String, Json>) -> Result<Value, CodecError> {
    let raw = body(UUID_TAG, object)?
        .as_str()
        .ok_or_else(|| CodecError::InvalidValue {
            tag: UUID_TAG.into(),
            reason: "expected a string".into(),
        })?;
    Uuid::parse_str(raw)
        .map(Value::Uuid)
        .map_err(|e| CodecError::InvalidValue {
            tag: UUID_TAG.into(),
            reason: e.to_string(),
        })
}

fn decode_bytes(_: &TypeRegistry, object: &Map<String, Json>) -> Result<Value, CodecError> {
    let raw = body(BYTES_TAG, object)?
        .as_str()
        .ok_or_else(|| CodecError::InvalidValue {
            tag: BYTES_TAG.into(),
            reason: "expected a base64 string".into(),
        })?;
    STANDARD
        .decode(raw)
        .map(Value::Bytes)
        .map_err(|e| CodecError::InvalidValue {
            tag: BYTES_TAG.into(),
            reason: e.to_string(),
        })
}

fn decode_map(registry: &TypeRegistry, object: &Map<String, Json>) -> Result<Value, CodecError> {
    let entries = body(MAP_TAG, object)?
        .as_object()
        .ok_or_else(|| CodecError::InvalidValue {
            tag: MAP_TAG.into(),
            reason: "expected an object".into(),
        })?;
    let mut map = BTreeMap::new();
    for (key, value) in entries {
        map.insert(key.clone(), decode_value(registry, value)?);
    }
    Ok(Value::Map(map))
}

fn decode_history(_: &TypeRegistry, object: &Map<String, Json>) -> Result<Value, CodecError> {
    let components = object
        .get("components")
        .cloned()
        .unwrap_or_else(|| Json::Array(Vec::new()));
    serde_json::from_value::<Vec<HistoryEntry>>(components)
        .map(Value::History)
        .map_err(|e| CodecError::InvalidValue {
            tag: HISTORY_TAG.into(),
            reason: e.to_string(),
        })
}
