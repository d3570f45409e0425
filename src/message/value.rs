use std::collections::BTreeMap;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Opaque payload or header value.
///
/// Scalars, lists and string-keyed maps are stored natively. Anything else
/// travels as a [`TypedObject`] whose type tag must be registered with the
/// codec's `TypeRegistry` to be read back.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
    Uuid(Uuid),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    History(Vec<HistoryEntry>),
    Object(TypedObject),
}

impl Value {
    /// Wrap any serializable application type under the given type tag.
    pub fn object<T: Serialize>(
        type_tag: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Value::Object(TypedObject::new(type_tag, value)?))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&TypedObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Uuid(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(v: BTreeMap<String, Value>) -> Self {
        Value::Map(v)
    }
}

/// An application value carried with its type tag.
///
/// The fields are kept in their serialized JSON form so the store never needs
/// the concrete Rust type; callers get it back with [`TypedObject::decode`].
#[derive(Clone, Debug, PartialEq)]
pub struct TypedObject {
    pub type_tag: String,
    pub fields: serde_json::Value,
}

impl TypedObject {
    pub fn new<T: Serialize>(
        type_tag: impl Into<String>,
        value: &T,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            type_tag: type_tag.into(),
            fields: serde_json::to_value(value)?,
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.fields.clone())
    }
}

/// One hop recorded in a message-history header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub timestamp: u64,
}

impl HistoryEntry {
    pub fn new(name: impl Into<String>, component_type: impl Into<String>, timestamp: u64) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
            timestamp,
        }
    }
}
