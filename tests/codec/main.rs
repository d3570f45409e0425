//! Integration tests for the record codec (MessageCodec + TypeRegistry).

use std::collections::BTreeMap;

use message_group_store::{
    ErrorPayload, HistoryEntry, Message, MessageCodec, MessageDocument, MessageKind, Throwable,
    TypeRegistry, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Shipment {
    id: String,
    parcels: Vec<u32>,
}

fn codec() -> MessageCodec {
    let mut registry = TypeRegistry::new();
    registry.register::<Shipment>("shipment").unwrap();
    MessageCodec::new(registry)
}

fn shipment() -> Value {
    Value::object(
        "shipment",
        &Shipment {
            id: "s-1".into(),
            parcels: vec![3, 4],
        },
    )
    .unwrap()
}

fn rich_headers(message: Message) -> Message {
    let mut nested = BTreeMap::new();
    nested.insert("region".to_string(), Value::from("eu"));
    nested.insert("raw".to_string(), Value::Bytes(vec![1, 2, 3]));
    message
        .with_header("sequenceNumber", 4)
        .with_header("ratio", 0.25)
        .with_header("replyTo", Value::Uuid(Uuid::new_v4()))
        .with_header("routing", Value::Map(nested))
        .with_header("tags", Value::List(vec!["a".into(), "b".into()]))
        .with_header(
            "history",
            Value::History(vec![
                HistoryEntry::new("input", "channel", 1),
                HistoryEntry::new("aggregator", "aggregator", 2),
            ]),
        )
        .with_header("shipment", shipment())
}

fn variants() -> Vec<Message> {
    vec![
        rich_headers(Message::new(shipment())),
        rich_headers(Message::mutable(Value::List(vec![1.into(), Value::Null]))),
        rich_headers(Message::error(
            Throwable::new("DeliveryFailed", "no route").caused_by(Throwable::new("Io", "eof")),
        )),
        rich_headers(Message::error(ErrorPayload::Opaque(vec![0xff]))),
        rich_headers(Message::advice(
            "retry",
            rich_headers(Message::new(shipment())),
        )),
    ]
}

fn bytes(doc: &MessageDocument) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    (
        serde_json::to_vec(&doc.message.headers).unwrap(),
        serde_json::to_vec(&doc.message.payload).unwrap(),
        serde_json::to_vec(&doc.message.input_message).unwrap(),
    )
}

#[test]
fn every_variant_round_trips() {
    let codec = codec();
    for message in variants() {
        let doc = codec.encode(&message, None).unwrap();
        let decoded = codec.decode(&doc).unwrap();
        assert_eq!(decoded.message, message, "{:?}", message.kind());
    }
}

#[test]
fn re_encoding_reproduces_record_bytes() {
    let codec = codec();
    for message in variants() {
        let record = codec.encode(&message, None).unwrap();
        let again = codec
            .encode(&codec.decode(&record).unwrap().message, None)
            .unwrap();
        assert_eq!(bytes(&again), bytes(&record), "{:?}", message.kind());
        assert_eq!(again.message.message_type, record.message.message_type);
    }
}

#[test]
fn records_survive_a_json_trip_through_the_backend() {
    let codec = codec();
    for message in variants() {
        let record = codec.encode(&message, None).unwrap();
        let stored = serde_json::to_string(&record).unwrap();
        let loaded: MessageDocument = serde_json::from_str(&stored).unwrap();
        assert_eq!(codec.decode(&loaded).unwrap().message, message);
    }
}

#[test]
fn dropped_headers_are_the_only_loss() {
    init_tracing();
    let writer = codec();
    let reader = MessageCodec::default();
    let message = Message::new("plain payload")
        .with_header("keep", "me")
        .with_header("shipment", shipment());

    let record = writer.encode(&message, None).unwrap();
    let decoded = reader.decode(&record).unwrap().message;
    assert_eq!(decoded.id(), message.id());
    assert_eq!(decoded.timestamp(), message.timestamp());
    assert_eq!(decoded.headers().get("keep"), Some(&Value::from("me")));
    assert!(decoded.headers().get("shipment").is_none());

    let mut expected = record.message.headers.clone();
    expected.remove("shipment");
    let again = reader.encode(&decoded, None).unwrap();
    assert_eq!(again.message.headers, expected);
    assert_eq!(again.message.payload, record.message.payload);
}

#[test]
fn stored_record_without_type_reads_as_plain() {
    init_tracing();
    let id = Uuid::new_v4();
    let loaded: MessageDocument = serde_json::from_value(json!({
        "messageId": id.to_string(),
        "headers": {
            "id": {"_class": "uuid", "_value": id.to_string()},
            "timestamp": 1700000000000u64,
            "legacy": {"_class": "com.example.Gone"}
        },
        "payload": "from an older writer",
        "_createdDate": 1700000000001u64,
        "_groupId": "g1",
        "_group_timestamp": 1700000000000u64
    }))
    .unwrap();

    let decoded = codec().decode(&loaded).unwrap();
    assert_eq!(decoded.message.kind(), MessageKind::Plain);
    assert_eq!(decoded.message.id(), id);
    assert_eq!(decoded.message.timestamp(), 1_700_000_000_000);
    assert!(decoded.message.headers().is_empty());

    let group = decoded.group.unwrap();
    assert_eq!(group.group_id.as_str(), "g1");
    assert_eq!(group.group_timestamp, 1_700_000_000_000);
    assert!(!group.complete);
    assert_eq!(group.last_released_sequence, 0);
}
