//! Records exchanged with the remote message collection.
//!
//! Field names follow the document shape the mobile client has always stored
//! (`_id`, `user`, `createdAt`, one payload field), so snapshots written by
//! older clients still decode.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::constants::MAX_TEXT_SIZE;
use crate::types::{Coordinates, MessageBody, OutgoingMessage, Sender};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireUser {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl From<&Sender> for WireUser {
    fn from(sender: &Sender) -> Self {
        Self {
            id: sender.id.clone(),
            name: Some(sender.display_name.clone()),
        }
    }
}

/// Payload fields. A well-formed record sets exactly one of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WirePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Coordinates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub system: bool,
}

impl WirePayload {
    pub fn from_body(body: &MessageBody) -> Self {
        match body {
            MessageBody::Text { text } => Self {
                text: Some(text.clone()),
                ..Self::default()
            },
            MessageBody::Image { url } => Self {
                image: Some(url.clone()),
                ..Self::default()
            },
            MessageBody::Location { coords } => Self {
                location: Some(*coords),
                ..Self::default()
            },
            MessageBody::Audio { url } => Self {
                audio: Some(url.clone()),
                ..Self::default()
            },
            MessageBody::System { text } => Self {
                text: Some(text.clone()),
                system: true,
                ..Self::default()
            },
        }
    }

    /// Resolve the payload to a single body kind.
    ///
    /// Media fields win over text because older clients attached an empty
    /// `text` next to images. A record with no payload becomes empty text
    /// rather than being dropped.
    pub fn to_body(&self) -> MessageBody {
        if self.system {
            return MessageBody::System {
                text: self.text.clone().unwrap_or_default(),
            };
        }
        if let Some(url) = &self.image {
            return MessageBody::Image { url: url.clone() };
        }
        if let Some(coords) = self.location {
            return MessageBody::Location { coords };
        }
        if let Some(url) = &self.audio {
            return MessageBody::Audio { url: url.clone() };
        }
        MessageBody::Text {
            text: self.text.clone().unwrap_or_default(),
        }
    }

    fn populated(&self) -> usize {
        [
            self.text.is_some(),
            self.image.is_some(),
            self.location.is_some(),
            self.audio.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// A message as stored in and delivered by the remote collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RemoteRecord {
    #[serde(rename = "_id")]
    pub id: String,
    pub user: WireUser,
    /// `None` while the server timestamp of a fresh write is still pending.
    /// Unreadable timestamps also decode as `None`.
    #[serde(rename = "createdAt", default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub payload: WirePayload,
}

impl RemoteRecord {
    pub fn sender(&self) -> Sender {
        Sender::new(self.user.id.clone(), self.user.name.as_deref())
    }

    pub fn body(&self) -> MessageBody {
        self.payload.to_body()
    }
}

/// Body of an append request. The server resolves `createdAt` and, when `id`
/// is absent, assigns one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutgoingRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user: WireUser,
    #[serde(flatten)]
    pub payload: WirePayload,
}

impl OutgoingRecord {
    /// Check the record is acceptable for the remote collection.
    pub fn validate(&self) -> Result<(), String> {
        if self.user.id.trim().is_empty() {
            return Err("user._id must not be empty".into());
        }
        if let Some(id) = &self.id {
            if id.trim().is_empty() {
                return Err("_id must not be empty when present".into());
            }
        }
        match self.payload.populated() {
            1 => {}
            0 => return Err("record has no payload".into()),
            n => return Err(format!("record has {n} payload fields, expected one")),
        }
        if self.payload.system {
            return Err("clients cannot append system notices".into());
        }
        if let Some(text) = &self.payload.text {
            if text.len() > MAX_TEXT_SIZE {
                return Err(format!(
                    "text is {} bytes (max {MAX_TEXT_SIZE})",
                    text.len()
                ));
            }
        }
        Ok(())
    }
}

impl From<&OutgoingMessage> for OutgoingRecord {
    fn from(message: &OutgoingMessage) -> Self {
        Self {
            id: message.id.as_ref().map(|id| id.0.clone()),
            user: WireUser::from(&message.sender),
            payload: WirePayload::from_body(&message.body),
        }
    }
}

/// Full ordered result set of the collection (newest first). `version`
/// increases with every append and restarts from zero with a new `epoch`
/// whenever the server loses its state.
///
/// Records that fail to decode are skipped with a warning; the rest of the
/// snapshot is kept.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    #[serde(default)]
    pub epoch: String,
    pub version: u64,
    #[serde(deserialize_with = "skip_malformed_records")]
    pub messages: Vec<RemoteRecord>,
}

impl Snapshot {
    /// Whether this snapshot is the same collection state as `(epoch, version)`.
    pub fn is_at(&self, epoch: &str, version: u64) -> bool {
        self.epoch == epoch && self.version == version
    }
}

/// Accepts RFC 3339 strings, `{ "seconds", "nanoseconds" }` maps as written
/// by document-store SDKs, and unix milliseconds.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(parse_timestamp))
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        Value::Object(map) => {
            let secs = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))?
                .as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            DateTime::<Utc>::from_timestamp(secs, u32::try_from(nanos).ok()?)
        }
        _ => None,
    }
}

fn skip_malformed_records<'de, D>(deserializer: D) -> Result<Vec<RemoteRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<Value>::deserialize(deserializer)?;
    let total = raw.len();
    let records: Vec<RemoteRecord> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Skipping malformed remote record");
                None
            }
        })
        .collect();
    if records.len() < total {
        warn!(kept = records.len(), total, "Snapshot contained malformed records");
    }
    Ok(records)
}
