use std::collections::HashSet;

use tracing::debug;
use uuid::Uuid;

use super::{GroupIter, MessageGroupStore, MessageStore, MessageStoreConfig, StoreError};
use crate::backend::{FieldUpdate, Filter, MessageBackend, Query, Sort};
use crate::codec::{DecodedMessage, GroupFields, MessageCodec, MessageDocument, TypeRegistry};
use crate::group::{GroupId, MessageGroup};
use crate::message::{now_millis, Message};

/// Message and group store over a document backend.
///
/// Holds no locks and no cache: every call goes to the backend. Group
/// metadata is copied onto each member record, so there is no separate group
/// record and a group disappears with its last member.
///
/// Concurrency follows the backend. Polls and removals rely on the backend's
/// atomic `find_and_delete`, so concurrent pollers never receive the same
/// message. Adding to a group is a read followed by an insert; two writers
/// creating the same group at the same moment may each seed the group
/// timestamp, and either value can win. Callers needing group-level mutual
/// exclusion must serialize externally.
pub struct DocumentMessageStore<B: MessageBackend> {
    backend: B,
    codec: MessageCodec,
    config: MessageStoreConfig,
}

impl<B: MessageBackend> DocumentMessageStore<B> {
    /// Create a store over `backend` using the default collection.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, MessageStoreConfig::default())
    }

    /// Create a store over `backend` with explicit configuration.
    pub fn with_config(backend: B, config: MessageStoreConfig) -> Self {
        Self {
            backend,
            codec: MessageCodec::default(),
            config,
        }
    }

    /// Use a registry with the application's payload types.
    pub fn with_registry(mut self, registry: TypeRegistry) -> Self {
        self.codec = MessageCodec::new(registry);
        self
    }

    pub fn collection_name(&self) -> &str {
        self.config.collection_name()
    }

    fn encode(
        &self,
        message: &Message,
        group: Option<&GroupFields>,
    ) -> Result<MessageDocument, StoreError> {
        self.codec
            .encode(message, group)
            .map_err(|source| StoreError::EncodeFailure {
                context: format!("message {}", message.id()),
                source,
            })
    }

    fn decode(&self, document: &MessageDocument) -> Result<DecodedMessage, StoreError> {
        self.codec
            .decode(document)
            .map_err(|source| StoreError::DecodeFailure {
                context: format!("message {}", document.message_id),
                source,
            })
    }

    /// Refresh the last-update timestamp on every member of the group.
    fn touch_group(&self, group_id: &GroupId, now: u64) -> Result<(), StoreError> {
        self.backend
            .update_many(
                self.collection_name(),
                &Filter::GroupId(group_id.clone()),
                &[FieldUpdate::GroupUpdateTimestamp(now)],
            )
            .map_err(|e| StoreError::backend(format!("touching group '{}'", group_id), e))?;
        Ok(())
    }

    fn update_group(&self, group_id: &GroupId, update: FieldUpdate) -> Result<(), StoreError> {
        self.backend
            .update_many(
                self.collection_name(),
                &Filter::GroupId(group_id.clone()),
                &[update, FieldUpdate::GroupUpdateTimestamp(now_millis())],
            )
            .map_err(|e| StoreError::backend(format!("updating group '{}'", group_id), e))?;
        Ok(())
    }

    /// Touch the group, then delete the member. A failed touch leaves the
    /// member in place.
    fn remove_from_group(&self, group_id: &GroupId, message_id: Uuid) -> Result<(), StoreError> {
        self.touch_group(group_id, now_millis())?;
        let removed = self
            .backend
            .find_and_delete(
                self.collection_name(),
                &Query::new(Filter::MessageIdInGroup(message_id, group_id.clone())),
            )
            .map_err(|e| {
                StoreError::backend(
                    format!("removing message {} from group '{}'", message_id, group_id),
                    e,
                )
            })?;
        debug!(group_id = %group_id, message_id = %message_id, removed = removed.is_some(), "removed message from group");
        Ok(())
    }
}

/// Build a group from its members. Group metadata is read from the first
/// record; all members carry the same values.
fn assemble_group(group_id: &GroupId, members: Vec<DecodedMessage>) -> MessageGroup {
    let mut group = MessageGroup::empty(group_id.clone());
    if let Some(fields) = members.first().and_then(|m| m.group.as_ref()) {
        group.timestamp = fields.group_timestamp;
        group.last_modified = fields.group_update_timestamp;
        group.complete = fields.complete;
        group.last_released_sequence = fields.last_released_sequence;
    }
    group.messages = members.into_iter().map(|m| m.message).collect();
    group
}

fn require_message_id(id: Uuid) -> Result<(), StoreError> {
    if id.is_nil() {
        return Err(StoreError::InvalidArgument(
            "message id must not be nil".into(),
        ));
    }
    Ok(())
}

fn require_group_id(group_id: &GroupId) -> Result<(), StoreError> {
    if group_id.is_empty() {
        return Err(StoreError::InvalidArgument(
            "group id must not be empty".into(),
        ));
    }
    Ok(())
}

impl<B: MessageBackend> MessageStore for DocumentMessageStore<B> {
    fn add_message(&self, message: Message) -> Result<Message, StoreError> {
        require_message_id(message.id())?;
        let document = self.encode(&message, None)?;
        self.backend
            .insert(self.collection_name(), document)
            .map_err(|e| StoreError::backend(format!("adding message {}", message.id()), e))?;
        Ok(message)
    }

    fn get_message(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        require_message_id(id)?;
        let document = self
            .backend
            .find_one(self.collection_name(), &Filter::MessageId(id))
            .map_err(|e| StoreError::backend(format!("getting message {}", id), e))?;
        document
            .map(|d| self.decode(&d).map(|decoded| decoded.message))
            .transpose()
    }

    fn remove_message(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        require_message_id(id)?;
        let document = self
            .backend
            .find_and_delete(self.collection_name(), &Query::new(Filter::MessageId(id)))
            .map_err(|e| StoreError::backend(format!("removing message {}", id), e))?;
        document
            .map(|d| self.decode(&d).map(|decoded| decoded.message))
            .transpose()
    }

    fn message_count(&self) -> Result<u64, StoreError> {
        self.backend
            .count(self.collection_name(), &Filter::All)
            .map_err(|e| StoreError::backend("counting messages", e))
    }
}

impl<B: MessageBackend> MessageGroupStore for DocumentMessageStore<B> {
    fn get_message_group(&self, group_id: &GroupId) -> Result<MessageGroup, StoreError> {
        require_group_id(group_id)?;
        let documents = self
            .backend
            .find(
                self.collection_name(),
                &Query::new(Filter::GroupId(group_id.clone())).sort(Sort::GroupUpdateTimestampDesc),
            )
            .map_err(|e| StoreError::backend(format!("reading group '{}'", group_id), e))?;
        let members = documents
            .iter()
            .map(|d| self.decode(d))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(assemble_group(group_id, members))
    }

    fn add_message_to_group(
        &self,
        group_id: &GroupId,
        message: &Message,
    ) -> Result<MessageGroup, StoreError> {
        require_group_id(group_id)?;
        require_message_id(message.id())?;

        // Not atomic with the insert below: see the type-level docs.
        let current = self.get_message_group(group_id)?;
        let now = now_millis();
        let fields = GroupFields {
            group_id: group_id.clone(),
            group_timestamp: if current.timestamp == 0 {
                now
            } else {
                current.timestamp
            },
            group_update_timestamp: now,
            complete: current.complete,
            last_released_sequence: current.last_released_sequence,
        };

        let document = self.encode(message, Some(&fields))?;
        // Existing members first: a failed touch must not leave the new record behind.
        self.touch_group(group_id, now)?;
        self.backend
            .insert(self.collection_name(), document)
            .map_err(|e| {
                StoreError::backend(
                    format!("adding message {} to group '{}'", message.id(), group_id),
                    e,
                )
            })?;
        debug!(group_id = %group_id, message_id = %message.id(), "added message to group");

        self.get_message_group(group_id)
    }

    fn remove_message_from_group(
        &self,
        group_id: &GroupId,
        message: &Message,
    ) -> Result<MessageGroup, StoreError> {
        require_group_id(group_id)?;
        require_message_id(message.id())?;
        self.remove_from_group(group_id, message.id())?;
        self.get_message_group(group_id)
    }

    fn remove_message_group(&self, group_id: &GroupId) -> Result<(), StoreError> {
        require_group_id(group_id)?;
        // Members are removed by id straight from the records, so a record
        // that no longer decodes is still deleted.
        let documents = self
            .backend
            .find(
                self.collection_name(),
                &Query::new(Filter::GroupId(group_id.clone())),
            )
            .map_err(|e| StoreError::backend(format!("reading group '{}'", group_id), e))?;
        for document in &documents {
            self.remove_from_group(group_id, document.message_id)?;
        }
        debug!(group_id = %group_id, removed = documents.len(), "removed message group");
        Ok(())
    }

    fn poll_message_from_group(&self, group_id: &GroupId) -> Result<Option<Message>, StoreError> {
        require_group_id(group_id)?;
        // Touch before deleting so a failed touch never drops the message.
        self.touch_group(group_id, now_millis())?;
        let document = self
            .backend
            .find_and_delete(
                self.collection_name(),
                &Query::new(Filter::GroupId(group_id.clone()))
                    .sort(Sort::CreatedDateAsc)
                    .limit(1),
            )
            .map_err(|e| StoreError::backend(format!("polling group '{}'", group_id), e))?;

        // The record is already gone if it fails to decode.
        let message = document
            .map(|d| self.decode(&d).map(|decoded| decoded.message))
            .transpose()?;
        debug!(group_id = %group_id, message_id = ?message.as_ref().map(Message::id), "polled group");
        Ok(message)
    }

    fn message_group_size(&self, group_id: &GroupId) -> Result<u32, StoreError> {
        require_group_id(group_id)?;
        let count = self
            .backend
            .count(self.collection_name(), &Filter::GroupId(group_id.clone()))
            .map_err(|e| StoreError::backend(format!("counting group '{}'", group_id), e))?;
        u32::try_from(count).map_err(|_| StoreError::CountOverflow {
            group_id: group_id.clone(),
            count,
        })
    }

    fn complete_group(&self, group_id: &GroupId) -> Result<(), StoreError> {
        require_group_id(group_id)?;
        self.update_group(group_id, FieldUpdate::GroupComplete(true))?;
        debug!(group_id = %group_id, "completed group");
        Ok(())
    }

    fn set_last_released_sequence_number_for_group(
        &self,
        group_id: &GroupId,
        sequence_number: u32,
    ) -> Result<(), StoreError> {
        require_group_id(group_id)?;
        self.update_group(group_id, FieldUpdate::LastReleasedSequence(sequence_number))?;
        debug!(group_id = %group_id, sequence_number, "set last released sequence number");
        Ok(())
    }

    fn iterate_groups(&self) -> Result<GroupIter, StoreError> {
        let documents = self
            .backend
            .find(self.collection_name(), &Query::new(Filter::GroupExists))
            .map_err(|e| StoreError::backend("listing groups", e))?;

        let mut seen = HashSet::new();
        let mut groups = Vec::new();
        for group_id in documents.iter().filter_map(MessageDocument::group_id) {
            if seen.insert(group_id.clone()) {
                groups.push(self.get_message_group(group_id)?);
            }
        }
        Ok(GroupIter::new(groups))
    }
}
