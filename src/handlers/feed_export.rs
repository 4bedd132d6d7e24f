//! Feed CSV export handler.
//!
//! `GET /channels/{id}/feed.csv` streams a channel's feeds as CSV in
//! fixed-size batches. Authorization failures keep the original API's
//! contract: status 400 with body `-1` (not 403), since existing clients
//! key on it.

use actix_web::web::Bytes;
use actix_web::{get, web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use log::{debug, error, warn};
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{current_user, AppState, ErrorResponse};
use crate::auth;
use crate::cache_key;
use crate::date_range::DateRangeParams;
use crate::errors::{ExportError, StoreError};
use crate::export::BodySink;
use crate::models::{ChannelId, ExportRequest};

/// Params whose `daily` value is an alias for 1440 minutes. They are
/// forwarded to downstream aggregation, not reprocessed here.
const DAILY_ALIAS_PARAMS: [&str; 4] = ["timescale", "average", "median", "sum"];

/// Buffered chunks between the pipeline task and the response body.
const BODY_CHANNEL_CAPACITY: usize = 8;

#[get("/channels/{id}/feed.csv")]
pub async fn channel_feed_csv(
    req: HttpRequest,
    path: web::Path<ChannelId>,
    state: web::Data<AppState>,
) -> HttpResponse {
    let channel_id = path.into_inner();

    let mut params = parse_query_pairs(req.query_string());
    normalize_daily_aliases(&mut params);

    let user_id = current_user(&req);

    // Upstream response caches dedupe identical reads by this key.
    let conn = req.connection_info();
    let key = cache_key::build(
        user_id,
        "feed_csv",
        conn.host(),
        req.path(),
        params.iter().map(|(k, v)| (k.as_str(), v.as_str())),
    );
    debug!("feed export cache key: {}", key);

    let header_token = req
        .headers()
        .get(auth::API_KEY_HEADER)
        .and_then(|value| value.to_str().ok());
    let token = auth::candidate_token(
        header_token,
        [
            param(&params, "key"),
            param(&params, "api_key"),
            param(&params, "apikey"),
        ],
    );

    let api_key = match auth::resolve_api_key(&state.store, token.as_deref()).await {
        Ok(key) => key,
        Err(e) => {
            error!("api key lookup failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Data access error".to_string(),
                message: None,
            });
        }
    };

    let request = ExportRequest {
        channel_id,
        user_id,
        api_key,
        fields: parse_field_list(param(&params, "fields")),
        range: DateRangeParams {
            // Presence alone marks a history request; garbage values
            // coerce to 0 rather than being dropped.
            days: param(&params, "days").map(|v| v.parse().unwrap_or(0)),
            start: param(&params, "start").map(String::from),
            end: param(&params, "end").map(String::from),
            results: param(&params, "results").map(|v| v.parse().unwrap_or(0)),
        },
        offset_minutes: param(&params, "offset").and_then(|v| v.parse().ok()),
    };

    let prepared = match state.pipeline.prepare(&request).await {
        Ok(prepared) => prepared,
        Err(ExportError::AuthorizationDenied) => {
            return HttpResponse::BadRequest().body("-1");
        }
        Err(ExportError::Parse(e)) => {
            return HttpResponse::BadRequest().json(ErrorResponse {
                error: "Invalid date parameter".to_string(),
                message: Some(e.to_string()),
            });
        }
        Err(ExportError::Store(StoreError::ChannelNotFound(id))) => {
            return HttpResponse::NotFound().json(ErrorResponse {
                error: format!("Channel {} not found", id),
                message: None,
            });
        }
        Err(e) => {
            error!("feed export preparation failed: {}", e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Export failed".to_string(),
                message: None,
            });
        }
    };

    // Attachment headers must precede any body byte; the pipeline then
    // feeds the chunked body from its own task.
    let (tx, rx) = mpsc::channel::<Bytes>(BODY_CHANNEL_CAPACITY);
    let mut sink = BodySink::new(tx);
    let pipeline = state.pipeline.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = pipeline.stream(prepared, &mut sink).await {
            warn!("feed export for channel {} terminated: {}", channel_id, e);
        }
    });

    let body = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(("Content-Disposition", "attachment; filename=feeds.csv"))
        .streaming(body)
}

/// Query pairs in received order; cache keys are order-sensitive.
fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query).unwrap_or_default()
}

fn param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn parse_field_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Rewrite `daily` to `1440` for the aggregation params that accept it.
fn normalize_daily_aliases(params: &mut [(String, String)]) {
    for (key, value) in params.iter_mut() {
        if value == "daily" && DAILY_ALIAS_PARAMS.contains(&key.as_str()) {
            *value = "1440".to_string();
        }
    }
}
