use crate::date_range::DateRangeParams;
use crate::models::{ApiKey, ChannelId, UserId};

/// Per-request value object for an export. Constructed from the incoming
/// HTTP request and discarded once the pipeline finishes.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub channel_id: ChannelId,
    /// Authenticated caller, if an upstream auth layer supplied one.
    pub user_id: Option<UserId>,
    /// Resolved API key, if the caller supplied a known token.
    pub api_key: Option<ApiKey>,
    /// Requested field selection; empty means all channel fields.
    pub fields: Vec<String>,
    pub range: DateRangeParams,
    /// Client-supplied UTC offset in minutes, used to pick a display zone.
    pub offset_minutes: Option<i32>,
}
