//! InMemoryBackend - HashMap-backed document collections for testing and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use super::{BackendError, FieldUpdate, Filter, MessageBackend, Query, Sort};
use crate::codec::MessageDocument;

/// In-memory backend keyed by collection name.
///
/// Records are kept in insertion order, which breaks sort ties. Clone-friendly
/// via Arc: clones share the same collections. Calls are serialized by one
/// `RwLock`, so `find_and_delete` is atomic.
#[derive(Clone)]
pub struct InMemoryBackend {
    collections: Arc<RwLock<HashMap<String, Vec<MessageDocument>>>>,
    available: Arc<AtomicBool>,
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBackend {
    /// Create a new empty, available backend.
    pub fn new() -> Self {
        Self {
            collections: Arc::new(RwLock::new(HashMap::new())),
            available: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Simulate losing (or regaining) the connection. While unavailable every
    /// call fails with [`BackendError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// All records of a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<MessageDocument> {
        self.collections
            .read()
            .map(|c| c.get(collection).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(BackendError::Unavailable("in-memory backend is offline".into()))
        }
    }
}

/// Indexes of the records matching `query`, sorted and limited.
fn select(documents: &[MessageDocument], query: &Query) -> Vec<usize> {
    let mut indexes: Vec<usize> = documents
        .iter()
        .enumerate()
        .filter(|(_, d)| query.filter.matches(d))
        .map(|(i, _)| i)
        .collect();

    // sort_by_key is stable
    match query.sort {
        Some(Sort::CreatedDateAsc) => indexes.sort_by_key(|&i| documents[i].created_date),
        Some(Sort::GroupUpdateTimestampDesc) => indexes.sort_by_key(|&i| {
            std::cmp::Reverse(
                documents[i]
                    .group
                    .as_ref()
                    .map(|g| g.group_update_timestamp)
                    .unwrap_or_default(),
            )
        }),
        None => {}
    }

    if let Some(limit) = query.limit {
        indexes.truncate(limit);
    }
    indexes
}

impl MessageBackend for InMemoryBackend {
    fn insert(&self, collection: &str, document: MessageDocument) -> Result<(), BackendError> {
        self.check_available()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| BackendError::Other("lock poisoned".into()))?;
        collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
        Ok(())
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Option<MessageDocument>, BackendError> {
        self.check_available()?;
        let collections = self
            .collections
            .read()
            .map_err(|_| BackendError::Other("lock poisoned".into()))?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| filter.matches(d)))
            .cloned())
    }

    fn find(&self, collection: &str, query: &Query) -> Result<Vec<MessageDocument>, BackendError> {
        self.check_available()?;
        let collections = self
            .collections
            .read()
            .map_err(|_| BackendError::Other("lock poisoned".into()))?;
        let Some(docs) = collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(select(docs, query)
            .into_iter()
            .map(|i| docs[i].clone())
            .collect())
    }

    fn find_and_delete(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Option<MessageDocument>, BackendError> {
        self.check_available()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| BackendError::Other("lock poisoned".into()))?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(None);
        };
        let first = select(docs, &query.clone().limit(1)).first().copied();
        Ok(first.map(|i| docs.remove(i)))
    }

    fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        updates: &[FieldUpdate],
    ) -> Result<u64, BackendError> {
        self.check_available()?;
        let mut collections = self
            .collections
            .write()
            .map_err(|_| BackendError::Other("lock poisoned".into()))?;
        let mut matched = 0;
        if let Some(docs) = collections.get_mut(collection) {
            for doc in docs.iter_mut().filter(|d| filter.matches(d)) {
                for update in updates {
                    update.apply(doc);
                }
                matched += 1;
            }
        }
        Ok(matched)
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64, BackendError> {
        self.check_available()?;
        let collections = self
            .collections
            .read()
            .map_err(|_| BackendError::Other("lock poisoned".into()))?;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| filter.matches(d)).count() as u64)
            .unwrap_or(0))
    }
}
