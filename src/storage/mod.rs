//! Data-access interface and the batched record source built on it.
//!
//! The export path never mutates channel data; everything here is
//! read-only. Implementations must keep `page_feeds` ordered by
//! ascending entry id, since that ordering is the streaming guarantee.

mod memory;
mod pager;

pub use memory::MemoryFeedStore;
pub use pager::FeedPager;

use crate::date_range::DateRange;
use crate::errors::StoreError;
use crate::models::{ApiKey, Channel, ChannelId, Feed};
use async_trait::async_trait;

/// Abstraction over feed persistence.
///
/// A production deployment plugs a database-backed implementation in
/// here; tests and the bundled binary use [`MemoryFeedStore`]. Reads are
/// snapshot-free: records written concurrently with an iteration may or
/// may not appear.
#[async_trait]
pub trait FeedStore: Send + Sync {
    async fn find_channel(&self, id: ChannelId) -> Result<Option<Channel>, StoreError>;

    /// Number of feeds in the channel within the inclusive range.
    async fn count_feeds(&self, channel_id: ChannelId, range: &DateRange) -> Result<u64, StoreError>;

    /// One page of feeds, ordered by ascending entry id.
    async fn page_feeds(
        &self,
        channel_id: ChannelId,
        range: &DateRange,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Feed>, StoreError>;

    /// Look up an API key by token. Unknown tokens yield `Ok(None)`.
    async fn find_api_key(&self, token: &str) -> Result<Option<ApiKey>, StoreError>;
}
