//! Codec - maps messages (plus optional group metadata) to backend records.
//!
//! Writing stamps the record-creation time and tags every non-scalar value
//! with its type. Reading dispatches on the stored `_messageType` and rebuilds
//! values through the [`TypeRegistry`]. A header that cannot be rebuilt is
//! logged and dropped; a payload that cannot be rebuilt fails the read.

mod document;
mod registry;
mod value;

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{Map, Value as Json};
use thiserror::Error;
use tracing::warn;

use crate::message::{
    now_millis, ErrorPayload, Message, MessageBody, MessageHeaders, MessageKind, Value,
};

pub use document::{EncodedMessage, GroupFields, MessageDocument};
pub use registry::{TypeDecoder, TypeRegistry, CLASS_KEY, VALUE_KEY};

/// Error type for encoding and decoding records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("no decoder registered for type tag '{0}'")]
    UnknownType(String),
    #[error("invalid '{tag}' value: {reason}")]
    InvalidValue { tag: String, reason: String },
    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),
    #[error("record is missing '{0}'")]
    MissingField(&'static str),
    #[error("malformed record: {0}")]
    Malformed(String),
    #[error("throwable blob error: {0}")]
    Blob(String),
    #[error("non-finite floats cannot be stored")]
    NonFiniteFloat,
    #[error("type tag '{0}' is reserved")]
    ReservedTag(String),
}

/// A decoded record: the message plus the group metadata stored with it.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedMessage {
    pub message: Message,
    pub group: Option<GroupFields>,
    pub created_date: u64,
}

#[derive(Clone, Debug, Default)]
pub struct MessageCodec {
    registry: TypeRegistry,
}

impl MessageCodec {
    /// Create a codec that resolves type tags through `registry`.
    pub fn new(registry: TypeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Encode a message into a fresh record stamped with the current time.
    pub fn encode(
        &self,
        message: &Message,
        group: Option<&GroupFields>,
    ) -> Result<MessageDocument, CodecError> {
        Ok(MessageDocument {
            message_id: message.id(),
            message: self.encode_message(message)?,
            created_date: now_millis(),
            group: group.cloned(),
        })
    }

    pub fn decode(&self, document: &MessageDocument) -> Result<DecodedMessage, CodecError> {
        Ok(DecodedMessage {
            message: self.decode_message(&document.message)?,
            group: document.group.clone(),
            created_date: document.created_date,
        })
    }

    fn encode_message(&self, message: &Message) -> Result<EncodedMessage, CodecError> {
        let mut headers = Map::new();
        headers.insert(
            MessageHeaders::ID.to_string(),
            value::encode_value(&Value::Uuid(message.id()))?,
        );
        headers.insert(
            MessageHeaders::TIMESTAMP.to_string(),
            Json::from(message.timestamp()),
        );
        for (key, header) in message.headers().entries() {
            headers.insert(key.clone(), value::encode_value(header)?);
        }

        let (payload, input_message) = match message.body() {
            MessageBody::Plain { payload } | MessageBody::Mutable { payload } => {
                (value::encode_value(payload)?, None)
            }
            MessageBody::Error { throwable } => {
                let blob = throwable
                    .to_blob()
                    .map_err(|e| CodecError::Blob(e.to_string()))?;
                (Json::String(STANDARD.encode(blob)), None)
            }
            MessageBody::Advice {
                payload,
                input_message,
            } => {
                let input = match input_message {
                    Some(input) => Some(Box::new(self.encode_message(input)?)),
                    None => None,
                };
                (value::encode_value(payload)?, input)
            }
        };

        Ok(EncodedMessage {
            message_type: Some(message.kind().as_str().to_string()),
            headers,
            payload,
            input_message,
        })
    }

    fn decode_message(&self, encoded: &EncodedMessage) -> Result<Message, CodecError> {
        let kind = match encoded.message_type.as_deref() {
            None => MessageKind::Plain,
            Some(tag) => MessageKind::parse(tag)
                .ok_or_else(|| CodecError::UnknownMessageType(tag.to_string()))?,
        };

        let id = match encoded.headers.get(MessageHeaders::ID) {
            Some(raw) => match value::decode_value(&self.registry, raw)? {
                Value::Uuid(id) => id,
                other => {
                    return Err(CodecError::Malformed(format!(
                        "message id is not a uuid: {:?}",
                        other
                    )))
                }
            },
            None => return Err(CodecError::MissingField("headers.id")),
        };
        let timestamp = encoded
            .headers
            .get(MessageHeaders::TIMESTAMP)
            .and_then(Json::as_u64)
            .ok_or(CodecError::MissingField("headers.timestamp"))?;
        let headers = self.decode_headers(id, &encoded.headers);

        let body = match kind {
            MessageKind::Plain => MessageBody::Plain {
                payload: self.decode_payload(&encoded.payload)?,
            },
            MessageKind::Mutable => MessageBody::Mutable {
                payload: self.decode_payload(&encoded.payload)?,
            },
            MessageKind::Error => {
                let raw = encoded
                    .payload
                    .as_str()
                    .ok_or(CodecError::MissingField("payload"))?;
                let blob = STANDARD
                    .decode(raw)
                    .map_err(|e| CodecError::Blob(e.to_string()))?;
                MessageBody::Error {
                    throwable: ErrorPayload::from_blob(blob),
                }
            }
            MessageKind::Advice => MessageBody::Advice {
                payload: self.decode_payload(&encoded.payload)?,
                input_message: match &encoded.input_message {
                    Some(input) => Some(Box::new(self.decode_message(input)?)),
                    None => None,
                },
            },
        };

        Ok(Message::rehydrate(id, timestamp, headers, body))
    }

    fn decode_payload(&self, payload: &Json) -> Result<Value, CodecError> {
        value::decode_value(&self.registry, payload)
    }

    fn decode_headers(&self, id: uuid::Uuid, raw: &Map<String, Json>) -> BTreeMap<String, Value> {
        let mut headers = BTreeMap::new();
        for (key, value) in raw {
            if key == MessageHeaders::ID || key == MessageHeaders::TIMESTAMP {
                continue;
            }
            match value::decode_value(&self.registry, value) {
                Ok(decoded) => {
                    headers.insert(key.clone(), decoded);
                }
                Err(err) => {
                    warn!(message_id = %id, header = %key, error = %err, "header could not be deserialized, dropping it");
                }
            }
        }
        headers
    }
}
