use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};
use uuid::Uuid;

use crate::group::GroupId;

/// Backend-native record: one per stored message.
///
/// Group members carry a copy of the group metadata in [`GroupFields`], so a
/// single record is enough to learn the state of its group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MessageDocument {
    #[serde(rename = "messageId")]
    pub message_id: Uuid,
    #[serde(flatten)]
    pub message: EncodedMessage,
    #[serde(rename = "_createdDate")]
    pub created_date: u64,
    #[serde(flatten)]
    pub group: Option<GroupFields>,
}

impl MessageDocument {
    pub fn group_id(&self) -> Option<&GroupId> {
        self.group.as_ref().map(|g| &g.group_id)
    }

    pub fn in_group(&self, group_id: &GroupId) -> bool {
        self.group_id() == Some(group_id)
    }
}

/// Encoded envelope. Also used, nested, for the input message of advice
/// envelopes.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodedMessage {
    /// Missing means plain.
    #[serde(rename = "_messageType", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<String>,
    #[serde(default)]
    pub headers: Map<String, Json>,
    #[serde(default)]
    pub payload: Json,
    #[serde(rename = "inputMessage", default, skip_serializing_if = "Option::is_none")]
    pub input_message: Option<Box<EncodedMessage>>,
}

/// Group metadata denormalized onto every member record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFields {
    #[serde(rename = "_groupId")]
    pub group_id: GroupId,
    #[serde(rename = "_group_timestamp", default)]
    pub group_timestamp: u64,
    #[serde(rename = "_group_update_timestamp", default)]
    pub group_update_timestamp: u64,
    #[serde(rename = "_group_complete", default)]
    pub complete: bool,
    #[serde(rename = "_last_released_sequence", default)]
    pub last_released_sequence: u32,
}

impl GroupFields {
    pub fn new(group_id: GroupId) -> Self {
        Self {
            group_id,
            group_timestamp: 0,
            group_update_timestamp: 0,
            complete: false,
            last_released_sequence: 0,
        }
    }
}
