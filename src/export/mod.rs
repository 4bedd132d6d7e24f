//! The batched streaming export engine.

mod pipeline;
mod sink;

pub use pipeline::{ExportPipeline, ExportSummary, PreparedExport};
pub use sink::{BodySink, ChunkedWriter, SinkClosed};
