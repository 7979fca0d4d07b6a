use super::error::{BrokerError, DeliveryError};
use super::logging;

#[test]
fn logging_init_accepts_levels() {
    // try_init makes repeated calls harmless
    logging::init("info");
    logging::init("debug");
    logging::init("warn");
}

#[test]
fn parse_level_falls_back_to_info() {
    assert_eq!(logging::parse_level("WARNING"), tracing::Level::WARN);
    assert_eq!(logging::parse_level(" trace "), tracing::Level::TRACE);
    assert_eq!(logging::parse_level("verbose"), tracing::Level::INFO);
}

#[test]
fn broker_error_messages_and_labels() {
    let err = BrokerError::TopicNotFound("news".to_string());
    assert_eq!(err.to_string(), "unable to find topic 'news'");
    assert_eq!(err.as_label(), "topic_not_found");
    assert_eq!(BrokerError::InvalidSubscriber.as_label(), "invalid_subscriber");
    assert_eq!(BrokerError::ShuttingDown.to_string(), "broker is shutting down");
}

#[test]
fn delivery_error_from_reason() {
    let err: DeliveryError = "socket reset".into();
    assert_eq!(err, DeliveryError::Failed("socket reset".to_string()));
    assert_eq!(err.to_string(), "delivery failed: socket reset");
}
