use std::sync::Arc;

use tokio::sync::mpsc;
use tungstenite::protocol::Message as WsMessage;

use super::pubsub_client::Client;
use crate::broker::{Broker, Message, Subscriber};
use crate::transport::message::ServerMessage;
use crate::utils::error::DeliveryError;

#[test]
fn test_client_new() {
    let (tx, _) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    assert!(client.id.starts_with("client-"));
    assert_eq!(client.topics().count(), 0);
}

#[test]
fn test_client_send_serializes_json() {
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    assert!(client.send(&ServerMessage::Subscribed {
        topic: "news".to_string()
    }));

    let frame = rx.try_recv().unwrap();
    let value: serde_json::Value = serde_json::from_str(frame.to_text().unwrap()).unwrap();
    assert_eq!(value["type"], "subscribed");
    assert_eq!(value["topic"], "news");
}

#[test]
fn test_client_send_after_close() {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    drop(rx);
    assert!(!client.send(&ServerMessage::Error {
        message: "gone".to_string()
    }));
}

#[tokio::test]
async fn test_client_cleanup_unsubscribes_everything() {
    let broker = Broker::new();
    let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();
    let mut client = Client::new(tx);

    for topic in ["a", "b"] {
        let sink = |_m: Arc<Message>| async { Ok::<(), DeliveryError>(()) };
        let subscription = broker.subscribe(Subscriber::new(topic, sink)).await.unwrap();
        client.track(subscription);
    }
    assert!(client.is_subscribed("a"));
    assert_eq!(broker.subscriber_count("b").await, 1);

    client.cleanup(&broker).await;
    assert_eq!(client.topics().count(), 0);
    assert_eq!(broker.subscriber_count("a").await, 0);
    assert_eq!(broker.subscriber_count("b").await, 0);
}
