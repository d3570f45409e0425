//! Backend - the document collection the message store runs on.
//!
//! Any document or relational store offering the primitives of
//! [`MessageBackend`] can host the message store. Filters are equality or
//! existence predicates on message identity and group identity.

mod in_memory;

use thiserror::Error;
use uuid::Uuid;

use crate::codec::MessageDocument;
use crate::group::GroupId;

pub use in_memory::InMemoryBackend;

/// Error type for backend operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend could not be reached.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend did not answer in time.
    #[error("backend timed out: {0}")]
    Timeout(String),
    /// Any other backend failure.
    #[error("backend error: {0}")]
    Other(String),
}

impl BackendError {
    /// Whether the error means the backend could not serve the call at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, BackendError::Unavailable(_) | BackendError::Timeout(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    All,
    MessageId(Uuid),
    GroupId(GroupId),
    MessageIdInGroup(Uuid, GroupId),
    /// Records that belong to some group.
    GroupExists,
}

impl Filter {
    pub fn matches(&self, document: &MessageDocument) -> bool {
        match self {
            Filter::All => true,
            Filter::MessageId(id) => document.message_id == *id,
            Filter::GroupId(group_id) => document.in_group(group_id),
            Filter::MessageIdInGroup(id, group_id) => {
                document.message_id == *id && document.in_group(group_id)
            }
            Filter::GroupExists => document.group.is_some(),
        }
    }
}

/// Sort orders used by the store. Ties keep insertion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sort {
    /// Most recently touched group records first.
    GroupUpdateTimestampDesc,
    /// Oldest record first.
    CreatedDateAsc,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Query {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(filter: Filter) -> Self {
        Self {
            filter,
            sort: None,
            limit: None,
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Field assignments applied by [`MessageBackend::update_many`]. They only
/// touch group metadata; payload and headers are never rewritten.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldUpdate {
    GroupUpdateTimestamp(u64),
    GroupComplete(bool),
    LastReleasedSequence(u32),
}

impl FieldUpdate {
    /// Apply to a record. Records outside any group are left untouched.
    pub fn apply(&self, document: &mut MessageDocument) {
        let Some(group) = document.group.as_mut() else {
            return;
        };
        match *self {
            FieldUpdate::GroupUpdateTimestamp(ts) => group.group_update_timestamp = ts,
            FieldUpdate::GroupComplete(complete) => group.complete = complete,
            FieldUpdate::LastReleasedSequence(n) => group.last_released_sequence = n,
        }
    }
}

/// Document collection primitives required by the message store.
///
/// `find_and_delete` must be atomic: two concurrent callers never receive the
/// same record. Implementations should surface connectivity problems as
/// [`BackendError::Unavailable`] or [`BackendError::Timeout`]; retries, if
/// any, belong here and not in the store.
pub trait MessageBackend: Send + Sync {
    fn insert(&self, collection: &str, document: MessageDocument) -> Result<(), BackendError>;

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<MessageDocument>, BackendError>;

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<MessageDocument>, BackendError>;

    /// Atomically remove and return the first record matching the query.
    fn find_and_delete(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Option<MessageDocument>, BackendError>;

    /// Apply the updates to every matching record. Returns how many matched.
    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[FieldUpdate],
    ) -> Result<u64, BackendError>;

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, BackendError>;
}
