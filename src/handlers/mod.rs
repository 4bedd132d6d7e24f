//! HTTP handlers and shared request-scoped types.

mod feed_export;

pub use feed_export::channel_feed_csv;

use crate::config::ExportSettings;
use crate::export::ExportPipeline;
use crate::models::UserId;
use crate::storage::FeedStore;
use actix_web::{HttpMessage, HttpRequest};
use serde::Serialize;
use std::sync::Arc;

/// Shared application state for the export endpoints.
pub struct AppState {
    pub store: Arc<dyn FeedStore>,
    pub pipeline: ExportPipeline,
}

impl AppState {
    pub fn new(store: Arc<dyn FeedStore>, settings: ExportSettings) -> Self {
        Self {
            pipeline: ExportPipeline::new(store.clone(), settings),
            store,
        }
    }
}

/// Authenticated caller identity, inserted into request extensions by an
/// upstream auth middleware. Absent means anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUser(pub UserId);

/// Caller identity from request extensions, if an auth layer supplied one.
pub fn current_user(req: &HttpRequest) -> Option<UserId> {
    req.extensions().get::<AuthenticatedUser>().map(|user| user.0)
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
