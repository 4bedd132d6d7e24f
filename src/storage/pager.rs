//! Fixed-size, forward-only paging over a channel's feeds.

use crate::date_range::DateRange;
use crate::errors::StoreError;
use crate::models::{ChannelId, Feed};
use crate::storage::FeedStore;
use std::sync::Arc;

/// Lazy iterator over fixed-size, entry-id-ordered pages of feeds.
///
/// The total row count is taken once at `open`; iteration holds no
/// transaction, so rows written to the channel while paging may or may
/// not appear. Restart by calling `open` again. Iteration stops as soon
/// as `offset >= total`, so an exact-multiple row count never issues a
/// trailing empty query.
pub struct FeedPager {
    store: Arc<dyn FeedStore>,
    channel_id: ChannelId,
    range: DateRange,
    batch_size: u64,
    total: u64,
    offset: u64,
}

impl FeedPager {
    pub async fn open(
        store: Arc<dyn FeedStore>,
        channel_id: ChannelId,
        range: DateRange,
        batch_size: u64,
    ) -> Result<Self, StoreError> {
        let total = store.count_feeds(channel_id, &range).await?;
        Ok(Self {
            store,
            channel_id,
            range,
            batch_size: batch_size.max(1),
            total,
            offset: 0,
        })
    }

    /// Matching rows at `open` time.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Next page of at most `batch_size` feeds, or `None` when exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<Feed>>, StoreError> {
        if self.offset >= self.total {
            return Ok(None);
        }
        let page = self
            .store
            .page_feeds(self.channel_id, &self.range, self.offset, self.batch_size)
            .await?;
        self.offset += self.batch_size;
        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryFeedStore;
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::BTreeMap;

    fn seeded_store(rows: i64) -> Arc<dyn FeedStore> {
        let store = MemoryFeedStore::new();
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        for i in 0..rows {
            store.insert_feed(Feed {
                channel_id: 1,
                entry_id: i + 1,
                created_at: base + Duration::seconds(i),
                values: BTreeMap::new(),
            });
        }
        Arc::new(store)
    }

    fn range() -> DateRange {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        DateRange {
            start,
            end: start + Duration::days(1),
        }
    }

    #[tokio::test]
    async fn pages_split_at_batch_size() {
        let mut pager = FeedPager::open(seeded_store(2500), 1, range(), 1000).await.unwrap();
        assert_eq!(pager.total(), 2500);

        let mut sizes = Vec::new();
        while let Some(page) = pager.next_page().await.unwrap() {
            sizes.push(page.len());
        }
        assert_eq!(sizes, vec![1000, 1000, 500]);
    }

    #[tokio::test]
    async fn exact_multiple_has_no_trailing_empty_page() {
        let mut pager = FeedPager::open(seeded_store(2000), 1, range(), 1000).await.unwrap();
        let mut pages = 0;
        while let Some(page) = pager.next_page().await.unwrap() {
            assert_eq!(page.len(), 1000);
            pages += 1;
        }
        assert_eq!(pages, 2);
    }

    #[tokio::test]
    async fn empty_channel_yields_no_pages() {
        let mut pager = FeedPager::open(seeded_store(0), 1, range(), 1000).await.unwrap();
        assert!(pager.next_page().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn page_order_is_ascending_across_pages() {
        let mut pager = FeedPager::open(seeded_store(250), 1, range(), 100).await.unwrap();
        let mut last = 0;
        while let Some(page) = pager.next_page().await.unwrap() {
            for feed in page {
                assert!(feed.entry_id > last);
                last = feed.entry_id;
            }
        }
        assert_eq!(last, 250);
    }
}
