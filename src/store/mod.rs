//! Message store - message and group persistence on top of a [`MessageBackend`].
//!
//! ## Example
//!
//! ```
//! use message_group_store::{
//!     DocumentMessageStore, GroupId, InMemoryBackend, Message, MessageGroupStore, MessageStore,
//! };
//!
//! let store = DocumentMessageStore::new(InMemoryBackend::new());
//! let group = GroupId::new("orders");
//!
//! let first = Message::new("a");
//! store.add_message_to_group(&group, &first).unwrap();
//! store.add_message_to_group(&group, &Message::new("b")).unwrap();
//! assert_eq!(store.message_group_size(&group).unwrap(), 2);
//!
//! let polled = store.poll_message_from_group(&group).unwrap().unwrap();
//! assert_eq!(polled.id(), first.id());
//! ```
//!
//! [`MessageBackend`]: crate::backend::MessageBackend

mod config;
mod document_store;
mod iter;

use thiserror::Error;
use uuid::Uuid;

use crate::backend::BackendError;
use crate::codec::CodecError;
use crate::group::{GroupId, MessageGroup};
use crate::message::Message;

pub use config::MessageStoreConfig;
pub use document_store::DocumentMessageStore;
pub use iter::GroupIter;

/// Error type for message store operations.
///
/// Backend and codec errors are kept as the `source`, with the identity or
/// group that was being resolved as context.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("store unavailable while {context}")]
    StoreUnavailable {
        context: String,
        #[source]
        source: BackendError,
    },
    #[error("backend failure while {context}")]
    Backend {
        context: String,
        #[source]
        source: BackendError,
    },
    #[error("could not decode {context}")]
    DecodeFailure {
        context: String,
        #[source]
        source: CodecError,
    },
    #[error("could not encode {context}")]
    EncodeFailure {
        context: String,
        #[source]
        source: CodecError,
    },
    #[error("group '{group_id}' holds {count} messages, more than a u32 can count")]
    CountOverflow { group_id: GroupId, count: u64 },
}

impl StoreError {
    pub(crate) fn backend(context: impl Into<String>, source: BackendError) -> Self {
        let context = context.into();
        if source.is_unavailable() {
            StoreError::StoreUnavailable { context, source }
        } else {
            StoreError::Backend { context, source }
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, StoreError::StoreUnavailable { .. })
    }
}

/// Storage for individual messages.
pub trait MessageStore {
    /// Store a message outside any group and hand it back unchanged.
    ///
    /// Not idempotent: adding the same message twice stores two records
    /// unless the backend enforces unique ids.
    fn add_message(&self, message: Message) -> Result<Message, StoreError>;

    /// Look up a message by id without removing it.
    fn get_message(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    /// Atomically find and delete a message.
    fn remove_message(&self, id: Uuid) -> Result<Option<Message>, StoreError>;

    /// Number of stored records, grouped or not.
    fn message_count(&self) -> Result<u64, StoreError>;
}

/// Storage for message groups.
///
/// A group exists only through its member records; a group with no members
/// reads back as an empty, zero-valued [`MessageGroup`].
pub trait MessageGroupStore {
    /// Members ordered by last-update timestamp, most recent first.
    fn get_message_group(&self, group_id: &GroupId) -> Result<MessageGroup, StoreError>;

    /// Add a member and return the group as it reads back afterwards.
    fn add_message_to_group(
        &self,
        group_id: &GroupId,
        message: &Message,
    ) -> Result<MessageGroup, StoreError>;

    /// Remove one member. A message in another group is left alone.
    fn remove_message_from_group(
        &self,
        group_id: &GroupId,
        message: &Message,
    ) -> Result<MessageGroup, StoreError>;

    /// Remove every member, one record at a time.
    fn remove_message_group(&self, group_id: &GroupId) -> Result<(), StoreError>;

    /// Atomically remove and return the oldest member (by record creation).
    fn poll_message_from_group(&self, group_id: &GroupId) -> Result<Option<Message>, StoreError>;

    /// Number of members, or `CountOverflow` if it does not fit a `u32`.
    fn message_group_size(&self, group_id: &GroupId) -> Result<u32, StoreError>;

    /// Mark the group complete. There is no way back.
    fn complete_group(&self, group_id: &GroupId) -> Result<(), StoreError>;

    /// Record the last released sequence number. Monotonicity is the
    /// caller's responsibility.
    fn set_last_released_sequence_number_for_group(
        &self,
        group_id: &GroupId,
        sequence_number: u32,
    ) -> Result<(), StoreError>;

    /// All groups present at call time, each read in full before returning.
    fn iterate_groups(&self) -> Result<GroupIter, StoreError>;
}
