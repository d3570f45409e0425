use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use message_group_store::{
    BackendError, FieldUpdate, Filter, MessageBackend, MessageDocument, Query,
};

/// Backend whose every call fails with the same error.
#[derive(Clone)]
pub struct FailingBackend {
    error: BackendError,
    calls: Arc<AtomicUsize>,
}

impl FailingBackend {
    pub fn new(error: BackendError) -> Self {
        Self {
            error,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

impl MessageBackend for FailingBackend {
    fn insert(&self, _: &str, _: MessageDocument) -> Result<(), BackendError> {
        self.fail()
    }

    fn find_one(&self, _: &str, _: &Filter) -> Result<Option<MessageDocument>, BackendError> {
        self.fail()
    }

    fn find(&self, _: &str, _: &Query) -> Result<Vec<MessageDocument>, BackendError> {
        self.fail()
    }

    fn find_and_delete(&self, _: &str, _: &Query) -> Result<Option<MessageDocument>, BackendError> {
        self.fail()
    }

    fn update_many(&self, _: &str, _: &Filter, _: &[FieldUpdate]) -> Result<u64, BackendError> {
        self.fail()
    }

    fn count(&self, _: &str, _: &Filter) -> Result<u64, BackendError> {
        self.fail()
    }
}
