//! Access control for channel reads.
//!
//! Authorization is a pure predicate over three independent grants;
//! denial is a structured result, never an error. API-key resolution is
//! equally forgiving: an absent or unknown token means anonymous access,
//! which public channels still allow.

use crate::errors::StoreError;
use crate::models::{ApiKey, Channel, UserId};
use crate::storage::FeedStore;
use std::sync::Arc;

/// Header carrying the API key, superseded by the query aliases below.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Query-parameter aliases for the API key, in fallback order.
pub const API_KEY_ALIASES: [&str; 3] = ["key", "api_key", "apikey"];

/// Whether the caller may read this channel's data.
///
/// Granted if ANY of: the channel is public, the key is bound to this
/// exact channel, or the caller is the authenticated owner.
pub fn authorize(channel: &Channel, user_id: Option<UserId>, api_key: Option<&ApiKey>) -> bool {
    channel.public_flag
        || api_key.map(|key| key.channel_id == channel.id).unwrap_or(false)
        || user_id.map(|id| id == channel.user_id).unwrap_or(false)
}

/// Pick the caller-supplied token: header first, then the query aliases
/// in order. Blank tokens are treated as absent.
pub fn candidate_token(header: Option<&str>, aliases: [Option<&str>; 3]) -> Option<String> {
    std::iter::once(header)
        .chain(aliases)
        .flatten()
        .map(str::trim)
        .find(|token| !token.is_empty())
        .map(String::from)
}

/// Look up a caller-supplied token against the key store. An unknown
/// token is NOT an error; the caller proceeds as anonymous.
pub async fn resolve_api_key(
    store: &Arc<dyn FeedStore>,
    token: Option<&str>,
) -> Result<Option<ApiKey>, StoreError> {
    match token {
        Some(token) => store.find_api_key(token).await,
        None => Ok(None),
    }
}
