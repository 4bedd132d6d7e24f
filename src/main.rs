// Feedstream Server
//
// HTTP server binary for the channel feed export API.

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Result;
use feedstream::config::ServerConfig;
use feedstream::handlers::AppState;
use feedstream::logging;
use feedstream::routes;
use feedstream::storage::{FeedStore, MemoryFeedStore};
use log::info;
use std::sync::Arc;

#[actix_web::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = match ServerConfig::from_file("config.toml") {
        Ok(cfg) => cfg,
        Err(_) => {
            eprintln!("Warning: config.toml not found, using defaults");
            ServerConfig::default()
        }
    };

    // Initialize logging
    logging::init_logging(&config.logging.level, &config.logging.format)?;

    info!("Starting Feedstream Server v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Configuration loaded: host={}, port={}, batch_size={}, pacing_delay_ms={}",
        config.server.host, config.server.port, config.export.batch_size, config.export.pacing_delay_ms
    );

    // The bundled store is in-memory; a production deployment plugs a
    // database-backed FeedStore implementation in here.
    let store: Arc<dyn FeedStore> = Arc::new(MemoryFeedStore::new());
    let state = web::Data::new(AppState::new(store, config.export.clone()));

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Starting HTTP server on {}", bind_addr);
    info!("Endpoints: GET /channels/{{id}}/feed.csv, GET /healthcheck");

    // Start HTTP server
    HttpServer::new(move || {
        // Allow javascript clients from any domain, matching the API's
        // public read surface.
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(1800);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(state.clone())
            .configure(routes::configure_routes)
    })
    .bind(&bind_addr)?
    .workers(if config.server.workers == 0 {
        num_cpus::get()
    } else {
        config.server.workers
    })
    .run()
    .await?;

    info!("Server shutdown complete");
    Ok(())
}
