// Build events
//
// A BuildEvent is the unit of progress narration for a build session.
// Wire shape: {"type": "...", "timestamp": "<RFC 3339>", ...type-specific fields}
// The type tag is open-ended: unknown tags round-trip as EventKind::Custom.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Event type tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Status,
    File,
    Complete,
    Error,
    Custom(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::Status => "status",
            EventKind::File => "file",
            EventKind::Complete => "complete",
            EventKind::Error => "error",
            EventKind::Custom(tag) => tag.as_str(),
        }
    }

    /// `complete` and `error` end a session's active lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::Complete | EventKind::Error)
    }
}

impl From<String> for EventKind {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "status" => EventKind::Status,
            "file" => EventKind::File,
            "complete" => EventKind::Complete,
            "error" => EventKind::Error,
            _ => EventKind::Custom(tag),
        }
    }
}

impl From<&str> for EventKind {
    fn from(tag: &str) -> Self {
        EventKind::from(tag.to_string())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Custom(tag) => tag,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed, timestamped record describing one step or outcome of a build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Stamped by the channel on publish when absent; never overwritten
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    /// Type-specific payload (stage, message, path, content, project, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl BuildEvent {
    /// Create an event with no payload
    pub fn new(kind: impl Into<EventKind>) -> Self {
        Self {
            kind: kind.into(),
            timestamp: None,
            fields: Map::new(),
        }
    }

    /// Create a status event marking a stage transition
    pub fn status(stage: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(EventKind::Status)
            .with_field("stage", stage.into())
            .with_field("message", message.into())
    }

    /// Create a file event recording a path that was just written
    pub fn file(path: impl Into<String>, content: Option<String>) -> Self {
        let event = Self::new(EventKind::File).with_field("path", path.into());
        match content {
            Some(content) => event.with_field("content", content),
            None => event,
        }
    }

    /// Create a complete event carrying the resulting project
    pub fn complete(project: impl Into<String>) -> Self {
        Self::new(EventKind::Complete).with_field("project", project.into())
    }

    /// Create an error event carrying a human-readable message
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(EventKind::Error).with_field("message", message.into())
    }

    /// Attach a payload field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Set an explicit timestamp
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }

    /// Read a string payload field
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Stamp the current time unless a timestamp is already present
    pub(crate) fn stamped(mut self) -> Self {
        self.timestamp.get_or_insert_with(Utc::now);
        self
    }
}
