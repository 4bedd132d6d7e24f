//! Streaming CSV export pipeline.
//!
//! Orchestrates authorize → resolve range/zone/fields → page → serialize
//! → write, with a pacing delay between batches. The pipeline's core
//! invariant is finalization: the sink is closed exactly once on every
//! exit path, including errors and client disconnects. Rows are written
//! atomically — a batch either reaches the sink whole or not at all, so
//! a terminated stream never ends in a partial CSV row.

use actix_web::web::Bytes;
use chrono::Duration;
use chrono_tz::Tz;
use log::{debug, warn};
use serde_json::Value as JsonValue;
use std::sync::Arc;

use crate::auth;
use crate::config::ExportSettings;
use crate::date_range::{self, DateRange};
use crate::errors::{ExportError, StoreError};
use crate::export::ChunkedWriter;
use crate::models::{Channel, ExportRequest, Feed};
use crate::storage::{FeedPager, FeedStore};
use crate::timezone;

/// Export state after authorization and parameter resolution, ready to
/// stream. Produced before any body byte is written, so failures up to
/// this point can still shape the HTTP status.
#[derive(Debug, Clone)]
pub struct PreparedExport {
    pub channel: Channel,
    pub range: DateRange,
    pub tz: Tz,
    /// Resolved value columns, in requested order.
    pub fields: Vec<String>,
}

/// What an export actually shipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub rows: u64,
    pub batches: u32,
}

#[derive(Clone)]
pub struct ExportPipeline {
    store: Arc<dyn FeedStore>,
    settings: ExportSettings,
}

impl ExportPipeline {
    pub fn new(store: Arc<dyn FeedStore>, settings: ExportSettings) -> Self {
        Self { store, settings }
    }

    /// Authorize the caller and resolve temporal parameters and the
    /// field list. No sink interaction happens here.
    pub async fn prepare(&self, request: &ExportRequest) -> Result<PreparedExport, ExportError> {
        let channel = self
            .store
            .find_channel(request.channel_id)
            .await?
            .ok_or(ExportError::Store(StoreError::ChannelNotFound(request.channel_id)))?;

        if !auth::authorize(&channel, request.user_id, request.api_key.as_ref()) {
            return Err(ExportError::AuthorizationDenied);
        }

        let range = date_range::resolve(
            &request.range,
            Duration::days(self.settings.default_lookback_days),
            Duration::days(self.settings.max_span_days),
        )?;

        let tz = match request.offset_minutes {
            Some(minutes) => timezone::resolve(minutes),
            None => Tz::UTC,
        };

        let fields = select_fields(&channel, &request.fields);

        Ok(PreparedExport {
            channel,
            range,
            tz,
            fields,
        })
    }

    /// Stream a prepared export into the sink. The sink is closed
    /// exactly once, whether streaming finishes, fails, or is cut off
    /// by a client disconnect.
    pub async fn stream<W: ChunkedWriter>(
        &self,
        prepared: PreparedExport,
        sink: &mut W,
    ) -> Result<ExportSummary, ExportError> {
        let result = self.stream_inner(&prepared, sink).await;
        sink.close().await;
        match &result {
            Ok(summary) => debug!(
                "export for channel {} complete: {} rows in {} batches",
                prepared.channel.id, summary.rows, summary.batches
            ),
            Err(e) => warn!("export for channel {} aborted: {}", prepared.channel.id, e),
        }
        result
    }

    /// Full export contract: prepare + stream, with the denial body and
    /// the close-once guarantee preserved even when preparation fails.
    pub async fn export<W: ChunkedWriter>(
        &self,
        request: &ExportRequest,
        sink: &mut W,
    ) -> Result<ExportSummary, ExportError> {
        match self.prepare(request).await {
            Ok(prepared) => self.stream(prepared, sink).await,
            Err(err) => {
                if matches!(err, ExportError::AuthorizationDenied) {
                    // Minimal, fast error body; ignore a dead sink.
                    let _ = sink.write(Bytes::from_static(b"-1")).await;
                }
                sink.close().await;
                Err(err)
            }
        }
    }

    async fn stream_inner<W: ChunkedWriter>(
        &self,
        prepared: &PreparedExport,
        sink: &mut W,
    ) -> Result<ExportSummary, ExportError> {
        let header = csv_header(&prepared.fields)?;
        sink.write(header)
            .await
            .map_err(|e| ExportError::SinkWrite(e.to_string()))?;

        let mut pager = FeedPager::open(
            self.store.clone(),
            prepared.channel.id,
            prepared.range,
            self.settings.batch_size,
        )
        .await?;

        debug!(
            "streaming {} rows from channel {} in batches of {}",
            pager.total(),
            prepared.channel.id,
            self.settings.batch_size
        );

        let pacing = std::time::Duration::from_millis(self.settings.pacing_delay_ms);
        let mut summary = ExportSummary { rows: 0, batches: 0 };

        while let Some(page) = pager.next_page().await? {
            let batch = encode_batch(&page, &prepared.fields, prepared.tz)?;
            sink.write(batch)
                .await
                .map_err(|e| ExportError::SinkWrite(e.to_string()))?;
            summary.rows += page.len() as u64;
            summary.batches += 1;

            // Throttle between batches so one export cannot monopolize
            // the store or flood a slow client.
            if !pacing.is_zero() {
                tokio::time::sleep(pacing).await;
            }
        }

        Ok(summary)
    }
}

/// Filter the requested field list against the channel's known columns.
/// Unknown names are dropped silently; an empty request means all.
fn select_fields(channel: &Channel, requested: &[String]) -> Vec<String> {
    if requested.is_empty() {
        return channel.field_names.clone();
    }
    requested
        .iter()
        .filter(|name| channel.field_names.iter().any(|known| known == *name))
        .cloned()
        .collect()
}

fn csv_header(fields: &[String]) -> Result<Bytes, ExportError> {
    let mut columns = vec!["created_at", "entry_id"];
    columns.extend(fields.iter().map(String::as_str));
    encode_lines(std::iter::once(columns))
}

fn encode_batch(page: &[Feed], fields: &[String], tz: Tz) -> Result<Bytes, ExportError> {
    encode_lines(page.iter().map(|feed| render_row(feed, fields, tz)))
}

/// CSV-encode rows into one contiguous chunk, standard quoting applied.
fn encode_lines<I, R, F>(rows: I) -> Result<Bytes, ExportError>
where
    I: IntoIterator<Item = R>,
    R: IntoIterator<Item = F>,
    F: AsRef<[u8]>,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(row)
            .map_err(|e| ExportError::Csv(e.to_string()))?;
    }
    let buf = writer
        .into_inner()
        .map_err(|e| ExportError::Csv(e.to_string()))?;
    Ok(Bytes::from(buf))
}

fn render_row(feed: &Feed, fields: &[String], tz: Tz) -> Vec<String> {
    let mut row = Vec::with_capacity(fields.len() + 2);
    row.push(
        feed.created_at
            .with_timezone(&tz)
            .format("%Y-%m-%d %H:%M:%S %Z")
            .to_string(),
    );
    row.push(feed.entry_id.to_string());
    for field in fields {
        row.push(feed.values.get(field).map(render_value).unwrap_or_default());
    }
    row
}

fn render_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::SinkClosed;
    use crate::models::{ApiKey, ChannelId};
    use crate::storage::MemoryFeedStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Sink that records every write and can fail on the nth attempt.
    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<Bytes>,
        attempts: usize,
        closes: usize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl ChunkedWriter for RecordingSink {
        async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
            self.attempts += 1;
            if Some(self.attempts) == self.fail_on {
                return Err(SinkClosed("simulated write failure".to_string()));
            }
            self.writes.push(chunk);
            Ok(())
        }

        async fn close(&mut self) {
            self.closes += 1;
        }
    }

    /// Store wrapper counting page fetches.
    struct CountingStore {
        inner: MemoryFeedStore,
        page_calls: AtomicUsize,
    }

    #[async_trait]
    impl FeedStore for CountingStore {
        async fn find_channel(&self, id: ChannelId) -> Result<Option<Channel>, StoreError> {
            self.inner.find_channel(id).await
        }

        async fn count_feeds(
            &self,
            channel_id: ChannelId,
            range: &DateRange,
        ) -> Result<u64, StoreError> {
            self.inner.count_feeds(channel_id, range).await
        }

        async fn page_feeds(
            &self,
            channel_id: ChannelId,
            range: &DateRange,
            offset: u64,
            limit: u64,
        ) -> Result<Vec<Feed>, StoreError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.page_feeds(channel_id, range, offset, limit).await
        }

        async fn find_api_key(&self, token: &str) -> Result<Option<ApiKey>, StoreError> {
            self.inner.find_api_key(token).await
        }
    }

    fn test_channel(public: bool) -> Channel {
        Channel {
            id: 1,
            user_id: 10,
            name: "greenhouse".to_string(),
            public_flag: public,
            field_names: vec!["field1".to_string(), "field2".to_string()],
        }
    }

    fn seeded_store(rows: i64, public: bool) -> Arc<CountingStore> {
        let inner = MemoryFeedStore::new();
        inner.insert_channel(test_channel(public));
        let now = Utc::now();
        for i in 0..rows {
            let mut values = BTreeMap::new();
            values.insert("field1".to_string(), json!(i));
            inner.insert_feed(Feed {
                channel_id: 1,
                entry_id: i + 1,
                created_at: now - Duration::seconds(rows - i),
                values,
            });
        }
        Arc::new(CountingStore {
            inner,
            page_calls: AtomicUsize::new(0),
        })
    }

    fn settings() -> ExportSettings {
        ExportSettings {
            batch_size: 1000,
            pacing_delay_ms: 0,
            max_span_days: 30,
            default_lookback_days: 1,
        }
    }

    fn request() -> ExportRequest {
        ExportRequest {
            channel_id: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn streams_one_header_write_plus_one_write_per_batch() {
        let store = seeded_store(2500, true);
        let pipeline = ExportPipeline::new(store.clone(), settings());
        let mut sink = RecordingSink::default();

        let summary = pipeline.export(&request(), &mut sink).await.unwrap();

        assert_eq!(summary, ExportSummary { rows: 2500, batches: 3 });
        assert_eq!(store.page_calls.load(Ordering::SeqCst), 3);
        // 1 header write + 3 batch writes
        assert_eq!(sink.writes.len(), 4);
        assert_eq!(sink.closes, 1);
        assert!(sink.writes[0].starts_with(b"created_at,entry_id,field1,field2"));
    }

    #[tokio::test]
    async fn sink_failure_stops_fetching_and_still_closes_once() {
        let store = seeded_store(2500, true);
        let pipeline = ExportPipeline::new(store.clone(), settings());
        let mut sink = RecordingSink {
            // Header is write 1; the second batch write fails.
            fail_on: Some(3),
            ..Default::default()
        };

        let err = pipeline.export(&request(), &mut sink).await.unwrap_err();

        assert!(matches!(err, ExportError::SinkWrite(_)));
        assert_eq!(sink.closes, 1);
        // Two batches were fetched; the third never was.
        assert_eq!(store.page_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn denied_export_writes_minimal_body_and_closes_once() {
        let store = seeded_store(10, false);
        let pipeline = ExportPipeline::new(store.clone(), settings());
        let mut sink = RecordingSink::default();

        let err = pipeline.export(&request(), &mut sink).await.unwrap_err();

        assert!(matches!(err, ExportError::AuthorizationDenied));
        assert_eq!(sink.writes, vec![Bytes::from_static(b"-1")]);
        assert_eq!(sink.closes, 1);
        assert_eq!(store.page_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn owner_and_bound_key_pass_authorization() {
        let store = seeded_store(5, false);
        let pipeline = ExportPipeline::new(store.clone(), settings());

        let mut owner_req = request();
        owner_req.user_id = Some(10);
        let mut sink = RecordingSink::default();
        assert!(pipeline.export(&owner_req, &mut sink).await.is_ok());

        let mut key_req = request();
        key_req.api_key = Some(ApiKey {
            api_key: "K".to_string(),
            channel_id: 1,
            write_flag: false,
        });
        let mut sink = RecordingSink::default();
        assert!(pipeline.export(&key_req, &mut sink).await.is_ok());
    }

    #[tokio::test]
    async fn unknown_channel_is_a_store_error() {
        let store = seeded_store(0, true);
        let pipeline = ExportPipeline::new(store, settings());
        let mut req = request();
        req.channel_id = 99;
        let mut sink = RecordingSink::default();

        let err = pipeline.export(&req, &mut sink).await.unwrap_err();
        assert!(matches!(err, ExportError::Store(StoreError::ChannelNotFound(99))));
        assert_eq!(sink.closes, 1);
        assert!(sink.writes.is_empty());
    }

    #[tokio::test]
    async fn unknown_requested_fields_are_dropped_silently() {
        let store = seeded_store(1, true);
        let pipeline = ExportPipeline::new(store, settings());
        let mut req = request();
        req.fields = vec!["field2".to_string(), "bogus".to_string()];
        let mut sink = RecordingSink::default();

        pipeline.export(&req, &mut sink).await.unwrap();
        assert!(sink.writes[0].starts_with(b"created_at,entry_id,field2\n"));
    }

    #[test]
    fn select_fields_preserves_requested_order() {
        let channel = test_channel(true);
        let requested = vec!["field2".to_string(), "field1".to_string()];
        assert_eq!(select_fields(&channel, &requested), requested);
        assert_eq!(select_fields(&channel, &[]), channel.field_names);
    }

    #[test]
    fn csv_quoting_escapes_commas_and_quotes() {
        let mut values = BTreeMap::new();
        values.insert("field1".to_string(), json!("a,b"));
        values.insert("field2".to_string(), json!("say \"hi\""));
        let feed = Feed {
            channel_id: 1,
            entry_id: 1,
            created_at: "2024-06-15T12:00:00Z".parse().unwrap(),
            values,
        };
        let fields = vec!["field1".to_string(), "field2".to_string()];

        let chunk = encode_batch(&[feed], &fields, Tz::UTC).unwrap();
        let line = String::from_utf8(chunk.to_vec()).unwrap();
        assert_eq!(line, "2024-06-15 12:00:00 UTC,1,\"a,b\",\"say \"\"hi\"\"\"\n");
    }

    #[test]
    fn timestamps_render_in_the_resolved_zone() {
        let feed = Feed {
            channel_id: 1,
            entry_id: 7,
            created_at: "2024-06-15T12:00:00Z".parse().unwrap(),
            values: BTreeMap::new(),
        };
        let row = render_row(&feed, &[], chrono_tz::Etc::GMTMinus2);
        assert_eq!(row[0], "2024-06-15 14:00:00 +02");
        assert_eq!(row[1], "7");
    }
}

