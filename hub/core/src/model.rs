//! Log Data Model
//!
//! Types shared by the API client, the transports, and the live stream.
//! Field names follow the StatusHub wire format (`serviceName`, `id`, ...).

use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifier of a log entry within one resource's log
///
/// The server hands out integers, but identifiers are treated as opaque:
/// they are only ever compared for equality and set membership.
///
/// Equality goes by the printed form, so `Number(1)` and `Text("1")` are
/// the same id while `Text("01")` is not.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryId {
    /// Numeric identifier (what StatusHub servers produce)
    Number(i64),
    /// Any other identifier
    Text(String),
}

impl EntryId {
    /// The integer this id prints as, if any
    fn canonical_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.parse::<i64>().ok().filter(|n| n.to_string() == *s),
        }
    }
}

impl PartialEq for EntryId {
    fn eq(&self, other: &Self) -> bool {
        match (self.canonical_number(), other.canonical_number()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => matches!((self, other), (Self::Text(a), Self::Text(b)) if a == b),
            _ => false,
        }
    }
}

impl Eq for EntryId {}

impl Hash for EntryId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Some(n) = self.canonical_number() {
            n.hash(state);
        } else if let Self::Text(s) = self {
            s.hash(state);
        }
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for EntryId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One logged message
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    /// Unique identifier within the resource's log
    pub id: EntryId,
    /// Service that produced the message
    pub service_name: String,
    /// The message text
    pub message: String,
    /// Unix timestamp (seconds) assigned by the server
    #[serde(default)]
    pub time: i64,
    /// Retention cap carried by a pushed entry
    ///
    /// Consumed by the live stream when the entry is inserted and never
    /// stored in the log.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl LogEntry {
    /// Create an entry with no timestamp and no limit
    pub fn new(
        id: impl Into<EntryId>,
        service_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            service_name: service_name.into(),
            message: message.into(),
            time: 0,
            limit: None,
        }
    }

    /// Set the timestamp
    #[must_use]
    pub fn with_time(mut self, time: i64) -> Self {
        self.time = time;
        self
    }

    /// Attach a retention cap
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Remove and return the retention cap
    pub fn take_limit(&mut self) -> Option<usize> {
        self.limit.take()
    }

    /// Server timestamp as a UTC date, if it is set and representable
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        if self.time == 0 {
            return None;
        }
        DateTime::from_timestamp(self.time, 0)
    }
}

/// A piece of media stored on the server, without its content
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    /// Folder the media was filed under
    pub folder: String,
    /// Original file name
    pub filename: String,
    /// MIME type the server serves the content with
    pub mime: String,
    /// Unix timestamp (seconds) assigned by the server
    #[serde(default)]
    pub time: i64,
    /// Identifier used to view the content
    pub id: EntryId,
}

/// The log a stream or snapshot refers to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LogResource {
    /// The log of a single named service
    Service(String),
    /// The combined log of every service
    All,
}

impl LogResource {
    /// Service name, if this is a single-service resource
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Service(name) => Some(name),
            Self::All => None,
        }
    }
}

impl fmt::Display for LogResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(name) => write!(f, "service:{name}"),
            Self::All => f.write_str("all"),
        }
    }
}

impl From<&str> for LogResource {
    fn from(value: &str) -> Self {
        Self::Service(value.to_string())
    }
}

impl From<String> for LogResource {
    fn from(value: String) -> Self {
        Self::Service(value)
    }
}

/// Payload of one live-channel message: a single entry or a batch
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
enum EventPayload {
    Batch(Vec<LogEntry>),
    Single(LogEntry),
}

/// Decode a live-channel message into the entries it carries, in order
///
/// # Errors
///
/// Returns the JSON error if the text is neither an entry nor an array of
/// entries.
pub fn parse_event_payload(text: &str) -> Result<Vec<LogEntry>, serde_json::Error> {
    Ok(match serde_json::from_str::<EventPayload>(text)? {
        EventPayload::Batch(entries) => entries,
        EventPayload::Single(entry) => vec![entry],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_entry_wire_format() {
        let json = r#"{"serviceName":"backup","message":"done","time":1500000000,"id":42}"#;
        let entry: LogEntry = serde_json::from_str(json).unwrap();

        assert_eq!(entry.id, EntryId::Number(42));
        assert_eq!(entry.service_name, "backup");
        assert_eq!(entry.message, "done");
        assert_eq!(entry.limit, None);
        assert!(entry.timestamp().is_some());
    }

    #[test]
    fn test_limit_not_serialized_when_absent() {
        let entry = LogEntry::new(1, "svc", "hello");
        let json = serde_json::to_string(&entry).unwrap();
        assert!(!json.contains("limit"));
        assert!(json.contains("serviceName"));
    }

    #[test]
    fn test_take_limit_strips_field() {
        let mut entry = LogEntry::new(1, "svc", "hello").with_limit(10);
        assert_eq!(entry.take_limit(), Some(10));
        assert_eq!(entry.limit, None);
    }

    #[test]
    fn test_parse_single_payload() {
        let entries =
            parse_event_payload(r#"{"id":7,"serviceName":"a","message":"m","limit":3}"#).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].limit, Some(3));
    }

    #[test]
    fn test_parse_batch_payload_keeps_order() {
        let entries = parse_event_payload(
            r#"[{"id":1,"serviceName":"a","message":"x"},{"id":"b","serviceName":"a","message":"y"}]"#,
        )
        .unwrap();
        let ids: Vec<_> = entries.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId::Number(1), EntryId::from("b")]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_event_payload("not json").is_err());
        assert!(parse_event_payload(r#"{"id":1}"#).is_err());
    }

    #[test]
    fn test_resource_conversions() {
        let resource: LogResource = "nightly".into();
        assert_eq!(resource.service(), Some("nightly"));
        assert_eq!(resource.to_string(), "service:nightly");
        assert_eq!(LogResource::All.service(), None);
    }

    #[test]
    fn test_numeric_text_id_matches_number() {
        use std::collections::HashSet;

        assert_eq!(EntryId::Number(1), EntryId::from("1"));
        assert_ne!(EntryId::Number(1), EntryId::from("01"));
        assert_ne!(EntryId::Number(1), EntryId::from("+1"));
        assert_ne!(EntryId::from("a"), EntryId::from("b"));

        let seen: HashSet<EntryId> = [EntryId::Number(7)].into_iter().collect();
        assert!(seen.contains(&EntryId::from("7")));
        assert!(!seen.contains(&EntryId::from("07")));
    }

    #[test]
    fn test_media_record_wire_format() {
        let json = r#"{"folder":"plots","filename":"loss.png","mime":"image/png","time":1500000000,"id":3}"#;
        let record: MediaRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.folder, "plots");
        assert_eq!(record.filename, "loss.png");
        assert_eq!(record.mime, "image/png");
        assert_eq!(record.id, EntryId::Number(3));
    }

    #[test]
    fn test_zero_time_has_no_timestamp() {
        assert!(LogEntry::new(1, "a", "b").timestamp().is_none());
    }
}
