use actix_web::error::{InternalError, UrlencodedError};
use actix_web::http::header::ContentType;
use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::api::models::{DetectRequest, ErrorResponse, HealthStatus};
use crate::features::FeatureExtractor;

const INDEX_HTML: &str = include_str!("../../static/index.html");

/// Instant the server started, registered as app data for `/health`
#[derive(Debug, Clone, Copy)]
pub struct StartedAt(pub Instant);

/// Serves the static landing page
pub async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

/// HTTP handler for feature extraction requests
///
/// Rejects an empty `url` field with 400. Any other request gets 200 and the
/// feature record, however many of the lookups behind it failed.
#[instrument(skip(form, extractor), fields(url = %form.url))]
pub async fn detect_handler(
    form: web::Form<DetectRequest>,
    extractor: web::Data<FeatureExtractor>,
) -> impl Responder {
    let url = form.into_inner().url;
    if url.trim().is_empty() {
        warn!("Rejected request with empty URL");
        return HttpResponse::BadRequest().json(ErrorResponse::new("Missing required field: url"));
    }

    info!("Received feature request for URL: {}", url);
    let extraction = extractor.extract_detailed(&url).await;
    debug!(
        "Lookup status for {}: content={:?} whois={:?} certificate={:?}",
        url, extraction.content, extraction.whois, extraction.certificate
    );

    HttpResponse::Ok().json(extraction.record)
}

/// Health check endpoint for monitoring service status
#[instrument(skip(started))]
pub async fn health_check(started: web::Data<StartedAt>) -> impl Responder {
    let uptime_secs = started.0.elapsed().as_secs();
    debug!("Health check: uptime={}s", uptime_secs);
    HttpResponse::Ok().json(HealthStatus {
        status: "healthy".to_string(),
        uptime_secs,
    })
}

/// Turns form extraction failures into the JSON error body
pub fn form_error_handler(err: UrlencodedError, _req: &HttpRequest) -> actix_web::Error {
    warn!("Rejected malformed form body: {}", err);
    let response =
        HttpResponse::BadRequest().json(ErrorResponse::new(format!("Invalid form body: {}", err)));
    InternalError::from_response(err, response).into()
}
