use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

pub type ChannelId = i64;
pub type UserId = i64;
pub type EntryId = i64;

/// A user-owned collection of time-ordered telemetry records.
///
/// Channels are created and destroyed by an external management surface;
/// this crate only ever reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    /// Owner identity.
    pub user_id: UserId,
    pub name: String,
    /// Public channels are readable by anyone.
    pub public_flag: bool,
    /// Names of the value columns this channel records. Acts as the
    /// allow-list for field selection on export.
    pub field_names: Vec<String>,
}

/// One timestamped record within a channel. Immutable once written,
/// from this crate's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub channel_id: ChannelId,
    /// Monotonically increasing per channel; the sort and pagination key.
    pub entry_id: EntryId,
    pub created_at: DateTime<Utc>,
    /// Sensor payload, keyed by field name.
    pub values: BTreeMap<String, JsonValue>,
}

/// An opaque access token bound to at most one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKey {
    pub api_key: String,
    pub channel_id: ChannelId,
    /// Write-scoped keys can also read; the distinction matters only to
    /// the (external) write surface.
    pub write_flag: bool,
}
