use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Represents a published message in the Pub/Sub system.
///
/// A message is built once per `broadcast` call and then shared read-only
/// (behind an `Arc`) by every subscriber it is delivered to.
///
/// # Fields
///
/// - `id` - A UUID v4 string. Consumers may use it for idempotent processing;
///   the broker itself never inspects it.
/// - `data` - The opaque payload bytes.
/// - `publish_time` - The UTC instant at which the message was created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    id: String,
    data: Vec<u8>,
    publish_time: DateTime<Utc>,
}

impl Message {
    /// Creates a message with a fresh id stamped with the current time.
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            data: data.into(),
            publish_time: Utc::now(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn publish_time(&self) -> DateTime<Utc> {
        self.publish_time
    }
}
