//! Durable message store with group semantics.
//!
//! Messages are staged individually or collected into named groups for
//! aggregation, resequencing and claim-check flows. Everything is persisted
//! through a pluggable document [`MessageBackend`]; [`InMemoryBackend`] is
//! provided for tests and single-process use.

pub mod backend;
pub mod codec;
mod group;
pub mod message;
pub mod store;

pub use backend::{BackendError, FieldUpdate, Filter, InMemoryBackend, MessageBackend, Query, Sort};
pub use codec::{
    CodecError, DecodedMessage, EncodedMessage, GroupFields, MessageCodec, MessageDocument,
    TypeRegistry,
};
pub use group::{GroupId, MessageGroup};
pub use message::{
    ErrorPayload, HistoryEntry, Message, MessageBody, MessageHeaders, MessageKind, Throwable,
    TypedObject, Value,
};
pub use store::{
    DocumentMessageStore, GroupIter, MessageGroupStore, MessageStore, MessageStoreConfig,
    StoreError,
};
