// Feedstream API Library
//
// This crate provides the HTTP export layer for channel telemetry:
// the streaming CSV pipeline, date-range and timezone resolution,
// access control for channel reads, and cache-key derivation for
// the surrounding read paths.

pub mod auth;
pub mod cache_key;
pub mod config;
pub mod date_range;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod routes;
pub mod storage;
pub mod timezone;
