//! Message envelopes.
//!
//! A [`Message`] is an immutable envelope: headers (with identity and
//! creation timestamp) plus a [`MessageBody`]. The body is a closed set of
//! variants; the codec dispatches on [`MessageKind`] when reading records back.
//!
//! ## Example
//!
//! ```
//! use message_group_store::{Message, Throwable, Value};
//!
//! let order = Message::new("order-17").with_header("priority", 3);
//! assert_eq!(order.headers().get("priority"), Some(&Value::Int(3)));
//!
//! let failed = Message::error(Throwable::new("Timeout", "no reply"));
//! let advice = Message::advice("retry", failed.clone());
//! assert_eq!(advice.input_message().map(|m| m.id()), Some(failed.id()));
//! ```

mod headers;
mod throwable;
mod value;

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

pub use headers::{now_millis, MessageHeaders};
pub use throwable::{ErrorPayload, Throwable};
pub use value::{HistoryEntry, TypedObject, Value};

/// Discriminant of a message body, persisted as `_messageType`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum MessageKind {
    #[default]
    Plain,
    Mutable,
    Error,
    Advice,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Plain => "plain",
            MessageKind::Mutable => "mutable",
            MessageKind::Error => "error",
            MessageKind::Advice => "advice",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "plain" => Some(MessageKind::Plain),
            "mutable" => Some(MessageKind::Mutable),
            "error" => Some(MessageKind::Error),
            "advice" => Some(MessageKind::Advice),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MessageBody {
    Plain {
        payload: Value,
    },
    Mutable {
        payload: Value,
    },
    Error {
        throwable: ErrorPayload,
    },
    /// Carries the message that triggered it, if any.
    Advice {
        payload: Value,
        input_message: Option<Box<Message>>,
    },
}

impl MessageBody {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageBody::Plain { .. } => MessageKind::Plain,
            MessageBody::Mutable { .. } => MessageKind::Mutable,
            MessageBody::Error { .. } => MessageKind::Error,
            MessageBody::Advice { .. } => MessageKind::Advice,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    headers: MessageHeaders,
    body: MessageBody,
}

impl Message {
    pub fn new(payload: impl Into<Value>) -> Self {
        Self::from_body(MessageBody::Plain {
            payload: payload.into(),
        })
    }

    pub fn mutable(payload: impl Into<Value>) -> Self {
        Self::from_body(MessageBody::Mutable {
            payload: payload.into(),
        })
    }

    pub fn error(throwable: impl Into<ErrorPayload>) -> Self {
        Self::from_body(MessageBody::Error {
            throwable: throwable.into(),
        })
    }

    pub fn advice(payload: impl Into<Value>, input_message: Message) -> Self {
        Self::from_body(MessageBody::Advice {
            payload: payload.into(),
            input_message: Some(Box::new(input_message)),
        })
    }

    /// New message with a fresh identity.
    pub fn from_body(body: MessageBody) -> Self {
        Self {
            headers: MessageHeaders::new(BTreeMap::new()),
            body,
        }
    }

    /// Rebuild a stored message with its original identity and timestamp.
    pub fn rehydrate(
        id: Uuid,
        timestamp: u64,
        headers: BTreeMap<String, Value>,
        body: MessageBody,
    ) -> Self {
        Self {
            headers: MessageHeaders::rehydrate(id, timestamp, headers),
            body,
        }
    }

    /// Add a custom header. `id` and `timestamp` are ignored.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> Uuid {
        self.headers.id()
    }

    pub fn timestamp(&self) -> u64 {
        self.headers.timestamp()
    }

    pub fn headers(&self) -> &MessageHeaders {
        &self.headers
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    pub fn kind(&self) -> MessageKind {
        self.body.kind()
    }

    /// The payload value; `None` for error messages.
    pub fn payload(&self) -> Option<&Value> {
        match &self.body {
            MessageBody::Plain { payload }
            | MessageBody::Mutable { payload }
            | MessageBody::Advice { payload, .. } => Some(payload),
            MessageBody::Error { .. } => None,
        }
    }

    pub fn throwable(&self) -> Option<&ErrorPayload> {
        match &self.body {
            MessageBody::Error { throwable } => Some(throwable),
            _ => None,
        }
    }

    pub fn input_message(&self) -> Option<&Message> {
        match &self.body {
            MessageBody::Advice { input_message, .. } => input_message.as_deref(),
            _ => None,
        }
    }
}
