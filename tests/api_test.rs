use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use url_feature_api::api::configure;
use url_feature_api::api::handlers::StartedAt;
use url_feature_api::api::models::{ErrorResponse, HealthStatus};
use url_feature_api::content::PageFetcher;
use url_feature_api::features::{FeatureExtractor, LookupError};
use url_feature_api::ssl::{CertificateInfo, CertificateProbe};
use url_feature_api::utils::clock::FixedClock;
use url_feature_api::utils::whois::{RegistrationLookup, WhoisRecord};

const FIELDS: [&str; 17] = [
    "url_length",
    "num_subdomains",
    "has_ip",
    "use_https",
    "suspicious_words",
    "num_special_chars",
    "tld",
    "domain",
    "has_forms",
    "external_redirection",
    "external_resources",
    "creation_date",
    "registrar",
    "expiration_date",
    "domain_age_days",
    "ssl_valid",
    "ssl_expiry_days",
];

struct StaticPage(Option<&'static str>);

#[async_trait]
impl PageFetcher for StaticPage {
    async fn fetch(&self, _url: &str) -> Result<String, LookupError> {
        self.0
            .map(str::to_string)
            .ok_or(LookupError::Network("connection refused".to_string()))
    }
}

struct StaticWhois(Option<WhoisRecord>);

#[async_trait]
impl RegistrationLookup for StaticWhois {
    async fn lookup(&self, domain: &str) -> Result<WhoisRecord, LookupError> {
        self.0.clone().ok_or_else(|| LookupError::NotFound(domain.to_string()))
    }
}

struct StaticCertificate(Option<CertificateInfo>);

#[async_trait]
impl CertificateProbe for StaticCertificate {
    async fn probe(&self, _url: &str) -> Result<Option<CertificateInfo>, LookupError> {
        match &self.0 {
            Some(cert) => Ok(Some(cert.clone())),
            None => Err(LookupError::Tls("self signed certificate".to_string())),
        }
    }
}

fn healthy_extractor() -> FeatureExtractor {
    let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    FeatureExtractor::with_components(
        Arc::new(StaticPage(Some(
            r#"<html><head><link rel="stylesheet" href="https://cdn.example.net/site.css"></head>
               <body><form action="/signin"></form></body></html>"#,
        ))),
        Arc::new(StaticWhois(Some(WhoisRecord {
            creation_date: Some(now - Duration::days(730)),
            registrar: Some("Example Registrar, Inc.".to_string()),
            expiration_date: Some(now + Duration::days(365)),
        }))),
        Arc::new(StaticCertificate(Some(CertificateInfo {
            issuer: "CN=Test CA".to_string(),
            subject: "CN=example.com".to_string(),
            valid_from: now - Duration::days(275),
            valid_to: now + Duration::days(90),
        }))),
        Arc::new(FixedClock(now)),
    )
}

fn failing_extractor() -> FeatureExtractor {
    FeatureExtractor::with_components(
        Arc::new(StaticPage(None)),
        Arc::new(StaticWhois(None)),
        Arc::new(StaticCertificate(None)),
        Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap())),
    )
}

macro_rules! app {
    ($extractor:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($extractor))
                .app_data(web::Data::new(StartedAt(Instant::now())))
                .configure(configure),
        )
        .await
    };
}

#[actix_web::test]
async fn test_detect_returns_every_feature() {
    let app = app!(healthy_extractor());
    let req = test::TestRequest::post()
        .uri("/detect")
        .set_form([("url", "https://secure-login.example.com/account")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let object = body.as_object().expect("JSON object");
    assert_eq!(object.len(), FIELDS.len());
    for field in FIELDS {
        assert!(object.contains_key(field), "missing key {}", field);
    }

    assert_eq!(body["url_length"], 40);
    assert_eq!(body["num_subdomains"], 1);
    assert_eq!(body["has_ip"], false);
    assert_eq!(body["use_https"], true);
    assert_eq!(body["suspicious_words"], true);
    assert_eq!(body["tld"], "com");
    assert_eq!(body["domain"], "example.com");
    assert_eq!(body["has_forms"], true);
    assert_eq!(body["external_redirection"], false);
    assert_eq!(body["external_resources"], true);
    assert_eq!(body["registrar"], "Example Registrar, Inc.");
    assert_eq!(body["creation_date"], "2023-03-02T12:00:00Z");
    assert_eq!(body["domain_age_days"], 730);
    assert_eq!(body["ssl_valid"], true);
    assert_eq!(body["ssl_expiry_days"], 90);
}

#[actix_web::test]
async fn test_detect_with_all_lookups_failing_is_still_ok() {
    let app = app!(failing_extractor());
    let req = test::TestRequest::post()
        .uri("/detect")
        .set_form([("url", "http://192.168.1.1/login")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body.as_object().map(|o| o.len()), Some(FIELDS.len()));
    assert_eq!(body["has_ip"], true);
    assert_eq!(body["suspicious_words"], true);
    assert_eq!(body["domain"], "192.168.1.1.");
    assert_eq!(body["tld"], "");
    for field in [
        "has_forms",
        "external_redirection",
        "external_resources",
        "creation_date",
        "registrar",
        "expiration_date",
        "domain_age_days",
        "ssl_expiry_days",
    ] {
        assert!(body[field].is_null(), "{} should be null", field);
    }
    assert_eq!(body["ssl_valid"], false);
}

#[actix_web::test]
async fn test_detect_without_url_field_is_rejected() {
    let app = app!(failing_extractor());
    let req = test::TestRequest::post()
        .uri("/detect")
        .set_form([("link", "http://example.com")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, "error");
}

#[actix_web::test]
async fn test_detect_with_blank_url_is_rejected() {
    let app = app!(failing_extractor());
    let req = test::TestRequest::post()
        .uri("/detect")
        .set_form([("url", "   ")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: ErrorResponse = test::read_body_json(resp).await;
    assert_eq!(body.status, "error");
    assert!(body.message.contains("url"));
}

#[actix_web::test]
async fn test_detect_rejects_get() {
    let app = app!(failing_extractor());
    let req = test::TestRequest::get().uri("/detect").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[actix_web::test]
async fn test_index_serves_form() {
    let app = app!(failing_extractor());
    let req = test::TestRequest::get().uri("/").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.starts_with("text/html"));

    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains(r#"action="/detect""#));
    assert!(html.contains(r#"name="url""#));
}

#[actix_web::test]
async fn test_health_check() {
    let app = app!(failing_extractor());
    let req = test::TestRequest::get().uri("/health").to_request();
    let health: HealthStatus = test::call_and_read_body_json(&app, req).await;
    assert_eq!(health.status, "healthy");
    assert!(health.uptime_secs < 60);
}
