use serde::Deserialize;

/// Message store settings.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MessageStoreConfig {
    /// Collection (table, key prefix...) holding the message records.
    pub collection_name: String,
}

impl MessageStoreConfig {
    pub const DEFAULT_COLLECTION_NAME: &'static str = "messages";

    pub fn new(collection_name: impl Into<String>) -> Self {
        Self {
            collection_name: collection_name.into(),
        }
    }

    /// The configured collection, or the default when blank.
    pub fn collection_name(&self) -> &str {
        if self.collection_name.trim().is_empty() {
            Self::DEFAULT_COLLECTION_NAME
        } else {
            &self.collection_name
        }
    }
}

impl Default for MessageStoreConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_COLLECTION_NAME)
    }
}
