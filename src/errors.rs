//! Shared error types for feedstream.
//!
//! The taxonomy mirrors the failure modes of the export path: denied
//! access, malformed temporal input, storage failures, and sink writes
//! that fail mid-stream after headers have already been sent.

use thiserror::Error;

/// Malformed `start`/`end` datetime input. Surfaced to the caller as a
/// client error, never silently defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse datetime '{input}'")]
pub struct ParseError {
    pub input: String,
}

impl ParseError {
    pub fn new(input: impl Into<String>) -> Self {
        Self { input: input.into() }
    }
}

/// Errors from the data-access layer.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("channel {0} not found")]
    ChannelNotFound(i64),
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors from the export pipeline.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Caller may not read this channel. Maps to the 400/`-1` response.
    #[error("authorization denied")]
    AuthorizationDenied,

    #[error("invalid date parameter: {0}")]
    Parse(#[from] ParseError),

    #[error("data access error: {0}")]
    Store(#[from] StoreError),

    #[error("csv encoding failed: {0}")]
    Csv(String),

    /// Client disconnected or the response body write failed. Headers are
    /// likely already sent, so this terminates the stream and is logged
    /// rather than mapped to an HTTP status.
    #[error("sink write failed: {0}")]
    SinkWrite(String),
}
