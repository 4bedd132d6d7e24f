//! API routes configuration
//!
//! This module configures the HTTP routes for the feedstream API.

use crate::handlers;
use actix_web::{web, HttpResponse};
use serde_json::json;

/// Configure API routes
///
/// - GET /channels/{id}/feed.csv - Streamed CSV export of a channel's feeds
/// - GET /healthcheck - Health check endpoint
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(handlers::channel_feed_csv)
        .route("/healthcheck", web::get().to(healthcheck_handler));
}

/// Health check endpoint handler
async fn healthcheck_handler() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
