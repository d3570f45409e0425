use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Application-defined group identity.
///
/// Ids are compared as text. Callers keying groups by numbers or UUIDs must
/// format them consistently themselves.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        GroupId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        GroupId(id.to_string())
    }
}

impl From<String> for GroupId {
    fn from(id: String) -> Self {
        GroupId(id)
    }
}

impl From<&String> for GroupId {
    fn from(id: &String) -> Self {
        GroupId(id.clone())
    }
}

/// A snapshot of a message group.
///
/// A group with no members is not an error: it comes back empty, with zero
/// timestamps, not complete, and a last released sequence of 0.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageGroup {
    pub group_id: GroupId,
    pub messages: Vec<Message>,
    /// Set when the first member was added.
    pub timestamp: u64,
    pub last_modified: u64,
    pub complete: bool,
    pub last_released_sequence: u32,
}

impl MessageGroup {
    pub fn empty(group_id: GroupId) -> Self {
        Self {
            group_id,
            messages: Vec::new(),
            timestamp: 0,
            last_modified: 0,
            complete: false,
            last_released_sequence: 0,
        }
    }

    pub fn size(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn contains(&self, message: &Message) -> bool {
        self.messages.iter().any(|m| m.id() == message.id())
    }
}
