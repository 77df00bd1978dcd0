//! Feature extraction: one URL in, one flat `FeatureRecord` out.
//!
//! Lexical analysis runs first and supplies the domain for the three network
//! lookups (page content, WHOIS, TLS certificate), which then run concurrently.
//! A failed lookup only blanks the fields it owns.

mod lexical;
mod outcome;
mod record;

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::content::{inspect_markup, ContentFeatures, FetchConfig, HttpPageFetcher, PageFetcher};
use crate::ssl::{CertificateInfo, CertificateProbe, NativeTlsProbe};
use crate::utils::clock::{days_between, Clock, SystemClock};
use crate::utils::whois::{self, RegistrationLookup, WhoisClient, WhoisRecord};

pub use lexical::{LexicalFeatures, SPECIAL_CHARS, SUSPICIOUS_WORDS};
pub use outcome::{LookupError, LookupStatus};
pub use record::FeatureRecord;

/// Settings for the network collaborators of a `FeatureExtractor`
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub fetch: FetchConfig,
    pub tls_timeout: Duration,
    pub whois_server: String,
    pub whois_follow: u16,
    pub whois_timeout: Duration,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            tls_timeout: Duration::from_secs(5),
            whois_server: whois::DEFAULT_WHOIS_SERVER.to_string(),
            whois_follow: whois::DEFAULT_FOLLOW,
            whois_timeout: Duration::from_secs(whois::DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// A record together with how each network lookup went
#[derive(Debug, Clone, Serialize)]
pub struct Extraction {
    pub record: FeatureRecord,
    pub content: LookupStatus,
    pub whois: LookupStatus,
    pub certificate: LookupStatus,
}

/// Collects the feature record for a URL
///
/// Holds only shared, immutable collaborators, so one instance serves all
/// requests concurrently.
pub struct FeatureExtractor {
    fetcher: Arc<dyn PageFetcher>,
    registration: Arc<dyn RegistrationLookup>,
    certificates: Arc<dyn CertificateProbe>,
    clock: Arc<dyn Clock>,
}

impl FeatureExtractor {
    /// Builds an extractor backed by reqwest, whois-rust and native-tls
    pub fn new(config: &ExtractorConfig) -> anyhow::Result<Self> {
        let fetcher = HttpPageFetcher::new(&config.fetch)?;
        let registration =
            WhoisClient::new(&config.whois_server, config.whois_follow, config.whois_timeout)?;
        let certificates = NativeTlsProbe::new(config.tls_timeout);

        Ok(Self::with_components(
            Arc::new(fetcher),
            Arc::new(registration),
            Arc::new(certificates),
            Arc::new(SystemClock),
        ))
    }

    pub fn with_components(
        fetcher: Arc<dyn PageFetcher>,
        registration: Arc<dyn RegistrationLookup>,
        certificates: Arc<dyn CertificateProbe>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            registration,
            certificates,
            clock,
        }
    }

    /// Produces the feature record for `url`; never fails
    pub async fn extract(&self, url: &str) -> FeatureRecord {
        self.extract_detailed(url).await.record
    }

    /// Produces the feature record along with the status of each lookup
    #[instrument(level = "info", skip(self))]
    pub async fn extract_detailed(&self, url: &str) -> Extraction {
        let lexical = LexicalFeatures::analyze(url);
        debug!("Lexical features: {:?}", lexical);

        let (content, registration, certificate) = tokio::join!(
            self.content_features(url),
            self.registration.lookup(&lexical.domain),
            self.certificates.probe(url),
        );

        let content_status = LookupStatus::of(&content);
        let whois_status = LookupStatus::of(&registration);
        let certificate_status = LookupStatus::of(&certificate);

        for (name, status) in [
            ("content", &content_status),
            ("whois", &whois_status),
            ("certificate", &certificate_status),
        ] {
            if !status.is_success() {
                warn!("{} lookup for {} did not succeed: {:?}", name, url, status);
            }
        }

        let now = self.clock.now();
        let record = assemble(lexical, content.ok(), registration.ok(), certificate.ok(), now);
        info!("Extracted features for {}", url);

        Extraction {
            record,
            content: content_status,
            whois: whois_status,
            certificate: certificate_status,
        }
    }

    async fn content_features(&self, url: &str) -> Result<ContentFeatures, LookupError> {
        let body = self.fetcher.fetch(url).await?;
        Ok(inspect_markup(&body))
    }
}

fn assemble(
    lexical: LexicalFeatures,
    content: Option<ContentFeatures>,
    registration: Option<WhoisRecord>,
    certificate: Option<Option<CertificateInfo>>,
    now: chrono::DateTime<chrono::Utc>,
) -> FeatureRecord {
    let registration = registration.unwrap_or_default();
    let domain_age_days = registration
        .creation_date
        .map(|created| days_between(created, now));

    let ssl_valid = certificate.is_some();
    let ssl_expiry_days = certificate
        .flatten()
        .map(|cert| days_between(now, cert.valid_to));

    FeatureRecord {
        url_length: lexical.url_length,
        num_subdomains: lexical.num_subdomains,
        has_ip: lexical.has_ip,
        use_https: lexical.use_https,
        suspicious_words: lexical.suspicious_words,
        num_special_chars: lexical.num_special_chars,
        tld: lexical.tld,
        domain: lexical.domain,

        has_forms: content.map(|c| c.has_forms),
        external_redirection: content.map(|c| c.external_redirection),
        external_resources: content.map(|c| c.external_resources),

        creation_date: registration.creation_date,
        registrar: registration.registrar,
        expiration_date: registration.expiration_date,
        domain_age_days,

        ssl_valid,
        ssl_expiry_days,
    }
}
