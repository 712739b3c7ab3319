//! Structured trace messages.

use chrono::Utc;

use super::scope;

/// Returns the current UTC time as an ISO 8601 formatted string.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// A structured trace message.
///
/// Messages are built up from a message type and arbitrary JSON fields, then
/// emitted to every installed destination. At emission time the message is
/// stamped with a timestamp, the labels of the current context stack, and
/// the root scope's task UUID, which attributes it to its logical nesting.
///
/// # Examples
///
/// ```rust
/// use traceflow::trace::TraceMessage;
///
/// TraceMessage::new("cache:miss")
///     .with_field("key", "user:42")
///     .emit();
/// ```
#[derive(Debug, Clone)]
pub struct TraceMessage {
    message_type: String,
    fields: serde_json::Map<String, serde_json::Value>,
}

impl TraceMessage {
    /// Creates a new message of the given type.
    #[must_use]
    pub fn new(message_type: impl Into<String>) -> Self {
        Self {
            message_type: message_type.into(),
            fields: serde_json::Map::new(),
        }
    }

    /// Adds a field to the message.
    ///
    /// The keys `message_type`, `timestamp`, `context`, and `task_uuid` are
    /// reserved and stamped at emission time; a user field with one of these
    /// names is overwritten.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Emits the message to every installed destination.
    ///
    /// The message is attributed to [`current_stack`](super::current_stack),
    /// so a message emitted during a context-preserving resumption carries
    /// the wrapped coroutine's captured stack, not the ambient one.
    pub fn emit(self) {
        let stack = scope::current_stack();
        let mut payload = self.fields;
        payload.insert(
            "message_type".to_string(),
            serde_json::Value::String(self.message_type),
        );
        payload.insert(
            "timestamp".to_string(),
            serde_json::Value::String(iso_timestamp()),
        );
        payload.insert("context".to_string(), serde_json::json!(stack.labels()));
        if let Some(root) = stack.root() {
            payload.insert(
                "task_uuid".to_string(),
                serde_json::Value::String(root.task_uuid().to_string()),
            );
        }
        crate::sinks::broadcast(&serde_json::Value::Object(payload));
    }
}
