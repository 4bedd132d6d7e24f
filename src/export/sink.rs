//! Chunked output sinks for streamed response bodies.

use actix_web::web::Bytes;
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// The sink's receiving side is gone — for HTTP bodies, the client
/// disconnected. Treated as cancellation by the pipeline.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct SinkClosed(pub String);

/// A write-side abstraction over a chunked response body.
///
/// `close` must be idempotent; the pipeline guarantees it is invoked
/// exactly once per export, on every exit path.
#[async_trait]
pub trait ChunkedWriter: Send {
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed>;
    async fn close(&mut self);
}

/// Sink feeding an HTTP streaming response body through an mpsc channel.
/// Dropping the sender ends the body stream, which is how the response
/// terminates.
pub struct BodySink {
    tx: Option<mpsc::Sender<Bytes>>,
}

impl BodySink {
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx: Some(tx) }
    }
}

#[async_trait]
impl ChunkedWriter for BodySink {
    async fn write(&mut self, chunk: Bytes) -> Result<(), SinkClosed> {
        match &self.tx {
            Some(tx) => tx
                .send(chunk)
                .await
                .map_err(|_| SinkClosed("client disconnected".to_string())),
            None => Err(SinkClosed("sink already closed".to_string())),
        }
    }

    async fn close(&mut self) {
        self.tx.take();
    }
}
