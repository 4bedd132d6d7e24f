//! In-memory feed store used by tests and the bundled server binary.

use crate::date_range::DateRange;
use crate::errors::StoreError;
use crate::models::{ApiKey, Channel, ChannelId, EntryId, Feed};
use crate::storage::FeedStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

#[derive(Default)]
struct Inner {
    channels: HashMap<ChannelId, Channel>,
    /// Feeds per channel, keyed by entry id so iteration is ordered.
    feeds: HashMap<ChannelId, BTreeMap<EntryId, Feed>>,
    api_keys: HashMap<String, ApiKey>,
}

#[derive(Default)]
pub struct MemoryFeedStore {
    inner: RwLock<Inner>,
}

impl MemoryFeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_channel(&self, channel: Channel) {
        if let Ok(mut inner) = self.inner.write() {
            inner.channels.insert(channel.id, channel);
        }
    }

    pub fn insert_feed(&self, feed: Feed) {
        if let Ok(mut inner) = self.inner.write() {
            inner
                .feeds
                .entry(feed.channel_id)
                .or_default()
                .insert(feed.entry_id, feed);
        }
    }

    pub fn insert_api_key(&self, key: ApiKey) {
        if let Ok(mut inner) = self.inner.write() {
            inner.api_keys.insert(key.api_key.clone(), key);
        }
    }
}

fn in_range(feed: &Feed, range: &DateRange) -> bool {
    feed.created_at >= range.start && feed.created_at <= range.end
}

#[async_trait]
impl FeedStore for MemoryFeedStore {
    async fn find_channel(&self, id: ChannelId) -> Result<Option<Channel>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        Ok(inner.channels.get(&id).cloned())
    }

    async fn count_feeds(&self, channel_id: ChannelId, range: &DateRange) -> Result<u64, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        let count = inner
            .feeds
            .get(&channel_id)
            .map(|feeds| feeds.values().filter(|feed| in_range(feed, range)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn page_feeds(
        &self,
        channel_id: ChannelId,
        range: &DateRange,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Feed>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        let page = inner
            .feeds
            .get(&channel_id)
            .map(|feeds| {
                feeds
                    .values()
                    .filter(|feed| in_range(feed, range))
                    .skip(offset as usize)
                    .take(limit as usize)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(page)
    }

    async fn find_api_key(&self, token: &str) -> Result<Option<ApiKey>, StoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| StoreError::Backend("store lock poisoned".to_string()))?;
        Ok(inner.api_keys.get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn feed(channel_id: ChannelId, entry_id: EntryId, minute: u32) -> Feed {
        Feed {
            channel_id,
            entry_id,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 10, minute, 0).unwrap(),
            values: BTreeMap::new(),
        }
    }

    fn full_range() -> DateRange {
        let end = Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap();
        DateRange {
            start: end - Duration::days(30),
            end,
        }
    }

    #[tokio::test]
    async fn pages_are_ordered_by_entry_id() {
        let store = MemoryFeedStore::new();
        // Inserted out of order on purpose.
        store.insert_feed(feed(1, 3, 3));
        store.insert_feed(feed(1, 1, 1));
        store.insert_feed(feed(1, 2, 2));

        let page = store.page_feeds(1, &full_range(), 0, 10).await.unwrap();
        let ids: Vec<EntryId> = page.iter().map(|f| f.entry_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn count_respects_range_bounds() {
        let store = MemoryFeedStore::new();
        store.insert_feed(feed(1, 1, 0));
        store.insert_feed(feed(1, 2, 30));

        let narrow = DateRange {
            start: Utc.with_ymd_and_hms(2024, 6, 1, 10, 15, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 6, 1, 10, 30, 0).unwrap(),
        };
        assert_eq!(store.count_feeds(1, &narrow).await.unwrap(), 1);
        assert_eq!(store.count_feeds(1, &full_range()).await.unwrap(), 2);
        assert_eq!(store.count_feeds(99, &full_range()).await.unwrap(), 0);
    }
}
