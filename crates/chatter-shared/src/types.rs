use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_DISPLAY_NAME;

// Opaque message identifier. Remote-assigned for composer sends,
// "{unix_millis}-{sender_id}" for side-channel sends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Compose a client-side id that is unique before the remote write
    /// completes.
    pub fn compose(at: DateTime<Utc>, sender_id: &str) -> Self {
        Self(format!("{}-{}", at.timestamp_millis(), sender_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sender {
    pub id: String,
    pub display_name: String,
}

impl Sender {
    /// Build a sender, falling back to the default display name when `name`
    /// is blank.
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        let display_name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n.to_string(),
            _ => DEFAULT_DISPLAY_NAME.to_string(),
        };
        Self {
            id: id.into(),
            display_name,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Exactly one payload kind per message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: String },
    Image { url: String },
    Location { coords: Coordinates },
    Audio { url: String },
    System { text: String },
}

impl MessageBody {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::Location { .. } => "location",
            Self::Audio { .. } => "audio",
            Self::System { .. } => "system",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub sender: Sender,
    pub sent_at: DateTime<Utc>,
    pub body: MessageBody,
}

/// Immutable newest-first snapshot of the message list.
///
/// Cloning is a reference-count bump, so readers can hold on to a snapshot for
/// a whole render pass while the engine publishes the next one.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageList(Arc<[Message]>);

impl MessageList {
    pub fn new(messages: Vec<Message>) -> Self {
        Self(Arc::from(messages))
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn ids(&self) -> Vec<&MessageId> {
        self.0.iter().map(|m| &m.id).collect()
    }

    pub fn to_vec(&self) -> Vec<Message> {
        self.0.to_vec()
    }
}

impl Default for MessageList {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for MessageList {
    type Target = [Message];

    fn deref(&self) -> &[Message] {
        &self.0
    }
}

impl From<Vec<Message>> for MessageList {
    fn from(messages: Vec<Message>) -> Self {
        Self::new(messages)
    }
}

/// A send request coming from the presentation layer. The payload is already
/// resolved: media has been uploaded and location permission granted.
#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingMessage {
    /// `None` lets the remote store assign the id.
    pub id: Option<MessageId>,
    pub sender: Sender,
    pub body: MessageBody,
}

impl OutgoingMessage {
    /// Composer message; the remote store assigns its id.
    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id: None,
            sender,
            body: MessageBody::Text { text: text.into() },
        }
    }

    /// Side-channel message (image, location, audio) with a client-composed id.
    pub fn attachment(sender: Sender, body: MessageBody) -> Self {
        let id = MessageId::compose(Utc::now(), &sender.id);
        Self {
            id: Some(id),
            sender,
            body,
        }
    }
}

/// Engine mode. `Unknown` until the first reachability signal arrives.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectivityState {
    Unknown,
    Online,
    Offline,
}

impl std::fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::Online => "online",
            Self::Offline => "offline",
        };
        f.write_str(s)
    }
}

/// Raw signal produced by a connectivity monitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Reachability {
    Reachable,
    Unreachable,
    Unknown,
}

impl From<Option<bool>> for Reachability {
    fn from(value: Option<bool>) -> Self {
        match value {
            Some(true) => Self::Reachable,
            Some(false) => Self::Unreachable,
            None => Self::Unknown,
        }
    }
}
