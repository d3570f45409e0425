//! Integration tests for single messages (MessageStore over DocumentMessageStore).

mod backends;

use std::error::Error;

use backends::FailingBackend;
use message_group_store::{
    BackendError, DocumentMessageStore, GroupId, InMemoryBackend, Message, MessageGroupStore,
    MessageStore, StoreError, Throwable, Value,
};
use uuid::Uuid;

fn store() -> DocumentMessageStore<InMemoryBackend> {
    DocumentMessageStore::new(InMemoryBackend::new())
}

// --- Add / Get ---

#[test]
fn add_returns_the_same_message() {
    let store = store();
    let message = Message::new("hello").with_header("priority", 3);
    let returned = store.add_message(message.clone()).unwrap();
    assert_eq!(returned, message);
}

#[test]
fn get_returns_an_equal_message() {
    let store = store();
    let message = Message::new("hello")
        .with_header("priority", 3)
        .with_header("correlation", Value::Uuid(Uuid::new_v4()));
    store.add_message(message.clone()).unwrap();

    let loaded = store.get_message(message.id()).unwrap().unwrap();
    assert_eq!(loaded.id(), message.id());
    assert_eq!(loaded.timestamp(), message.timestamp());
    assert_eq!(loaded.headers(), message.headers());
    assert_eq!(loaded.payload(), message.payload());
}

#[test]
fn get_does_not_remove() {
    let store = store();
    let message = store.add_message(Message::new(1)).unwrap();
    store.get_message(message.id()).unwrap();
    assert!(store.get_message(message.id()).unwrap().is_some());
    assert_eq!(store.message_count().unwrap(), 1);
}

#[test]
fn get_missing_returns_none() {
    assert!(store().get_message(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn every_variant_is_stored() {
    let store = store();
    let input = Message::new("request");
    let messages = vec![
        Message::new("plain"),
        Message::mutable("mutable"),
        Message::error(Throwable::new("Timeout", "no reply")),
        Message::advice("advice", input),
    ];
    for message in &messages {
        store.add_message(message.clone()).unwrap();
    }
    for message in &messages {
        assert_eq!(store.get_message(message.id()).unwrap().as_ref(), Some(message));
    }
}

#[test]
fn duplicate_adds_store_two_records() {
    let store = store();
    let message = Message::new("twice");
    store.add_message(message.clone()).unwrap();
    store.add_message(message.clone()).unwrap();
    assert_eq!(store.message_count().unwrap(), 2);
}

// --- Remove ---

#[test]
fn remove_returns_the_message_once() {
    let store = store();
    let message = store.add_message(Message::new("bye")).unwrap();

    assert_eq!(store.remove_message(message.id()).unwrap(), Some(message.clone()));
    assert!(store.remove_message(message.id()).unwrap().is_none());
    assert!(store.get_message(message.id()).unwrap().is_none());
}

// --- Count ---

#[test]
fn count_includes_grouped_and_loose_messages() {
    let store = store();
    store.add_message(Message::new(1)).unwrap();
    store.add_message(Message::new(2)).unwrap();
    store
        .add_message_to_group(&GroupId::new("g"), &Message::new(3))
        .unwrap();
    assert_eq!(store.message_count().unwrap(), 3);
}

// --- Errors ---

#[test]
fn nil_identity_is_rejected() {
    let store = store();
    for result in [
        store.get_message(Uuid::nil()).map(|_| ()),
        store.remove_message(Uuid::nil()).map(|_| ()),
        store
            .add_message(Message::rehydrate(
                Uuid::nil(),
                0,
                Default::default(),
                Message::new(1).body().clone(),
            ))
            .map(|_| ()),
    ] {
        assert!(matches!(result, Err(StoreError::InvalidArgument(_))));
    }
}

#[test]
fn unreachable_backend_is_store_unavailable() {
    let backend = InMemoryBackend::new();
    let store = DocumentMessageStore::new(backend.clone());
    let message = store.add_message(Message::new("x")).unwrap();

    backend.set_available(false);
    let err = store.get_message(message.id()).unwrap_err();
    assert!(err.is_unavailable());
    assert!(matches!(
        store.message_count(),
        Err(StoreError::StoreUnavailable { .. })
    ));
    assert!(store.add_message(Message::new("y")).unwrap_err().is_unavailable());

    backend.set_available(true);
    assert!(store.get_message(message.id()).unwrap().is_some());
}

#[test]
fn backend_error_is_kept_as_source() {
    let store = DocumentMessageStore::new(FailingBackend::new(BackendError::Other(
        "disk full".into(),
    )));
    let err = store.add_message(Message::new("x")).unwrap_err();
    assert!(matches!(err, StoreError::Backend { .. }));

    let source = err.source().unwrap().downcast_ref::<BackendError>().unwrap();
    assert_eq!(source, &BackendError::Other("disk full".into()));
}

#[test]
fn timeouts_are_not_retried() {
    let backend = FailingBackend::new(BackendError::Timeout("5s".into()));
    let store = DocumentMessageStore::new(backend.clone());
    let err = store.remove_message(Uuid::new_v4()).unwrap_err();
    assert!(err.is_unavailable());
    assert_eq!(backend.calls(), 1);
}

#[test]
fn undecodable_payload_fails_the_read() {
    use message_group_store::TypeRegistry;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Invoice {
        number: u32,
    }

    let backend = InMemoryBackend::new();
    let mut registry = TypeRegistry::new();
    registry.register::<Invoice>("invoice").unwrap();
    let writer = DocumentMessageStore::new(backend.clone()).with_registry(registry);
    let reader = DocumentMessageStore::new(backend);

    let message = Message::new(Value::object("invoice", &Invoice { number: 7 }).unwrap());
    writer.add_message(message.clone()).unwrap();

    assert!(writer.get_message(message.id()).unwrap().is_some());
    let err = reader.get_message(message.id()).unwrap_err();
    assert!(matches!(err, StoreError::DecodeFailure { .. }));
}
