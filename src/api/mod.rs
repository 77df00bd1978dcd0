pub mod config;
pub mod handlers;
pub mod models;

use actix_web::{web, App, HttpServer};
use anyhow::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument};

use crate::api::config::ApiConfig;
use crate::api::handlers::{detect_handler, form_error_handler, health_check, index, StartedAt};
use crate::features::FeatureExtractor;

/// Registers the routes and form handling shared by the server and tests
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::FormConfig::default().error_handler(form_error_handler))
        .service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/detect").route(web::post().to(detect_handler)))
        .service(web::resource("/health").route(web::get().to(health_check)));
}

/// Starts the API server with the specified configuration
///
/// # Arguments
/// * `config` - Server configuration (bind address and lookup settings)
/// * `extractor` - Shared feature extractor used by every worker
///
/// # Returns
/// * `Result<()>` - Success or an error
#[instrument(skip_all, fields(host = %config.host, port = config.port))]
pub async fn start_server(config: ApiConfig, extractor: Arc<FeatureExtractor>) -> Result<()> {
    info!("Starting URL feature API server on {}:{}", config.host, config.port);

    let extractor_data = web::Data::from(extractor);
    let started_data = web::Data::new(StartedAt(Instant::now()));

    let server_result = HttpServer::new(move || {
        App::new()
            .app_data(extractor_data.clone())
            .app_data(started_data.clone())
            .configure(configure)
    })
    .bind((config.host.as_str(), config.port))
    .map_err(|e| {
        error!("Failed to bind to {}:{}: {}", config.host, config.port, e);
        e
    })?
    .run()
    .await;

    if let Err(e) = server_result {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
