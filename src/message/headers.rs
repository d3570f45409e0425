use std::collections::BTreeMap;
use std::time::SystemTime;

use uuid::Uuid;

use super::Value;

/// Message headers. `id` and `timestamp` are fixed at construction.
#[derive(Clone, Debug, PartialEq)]
pub struct MessageHeaders {
    id: Uuid,
    timestamp: u64,
    entries: BTreeMap<String, Value>,
}

impl MessageHeaders {
    pub const ID: &'static str = "id";
    pub const TIMESTAMP: &'static str = "timestamp";

    /// Fresh headers with a random v4 id stamped now.
    pub fn new(entries: BTreeMap<String, Value>) -> Self {
        Self::rehydrate(Uuid::new_v4(), now_millis(), entries)
    }

    /// Headers for a message read back from storage, keeping its original
    /// identity and timestamp.
    pub fn rehydrate(id: Uuid, timestamp: u64, mut entries: BTreeMap<String, Value>) -> Self {
        entries.remove(Self::ID);
        entries.remove(Self::TIMESTAMP);
        Self {
            id,
            timestamp,
            entries,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Custom headers, without `id` and `timestamp`.
    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn insert(&mut self, key: String, value: Value) {
        if key != Self::ID && key != Self::TIMESTAMP {
            self.entries.insert(key, value);
        }
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
