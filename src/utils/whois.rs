use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::io::ErrorKind;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, trace, warn};
use whois_rust::{WhoIs, WhoIsError, WhoIsLookupOptions, WhoIsServerValue};

use crate::features::LookupError;

pub const DEFAULT_WHOIS_SERVER: &str = "whois.iana.org";
pub const DEFAULT_FOLLOW: u16 = 2;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const CREATED_KEYS: &[&str] = &[
    "creation date",
    "created on",
    "created",
    "registered on",
    "registration time",
    "domain registration date",
];
const EXPIRES_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expires on",
    "expires",
    "paid-till",
];
const REGISTRAR_KEYS: &[&str] = &["registrar", "sponsoring registrar", "registrar name"];

const REFERRAL_KEYS: &[&str] = &[
    "refer",
    "whois",
    "registrar whois server",
    "whois server",
    "referralserver",
];

const NOT_FOUND_MARKERS: &[&str] = &[
    "no match for",
    "not found",
    "no entries found",
    "no data found",
    "no matching record",
    "status: free",
    "returned 0 objects",
];

/// Registration data extracted from a WHOIS response
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WhoisRecord {
    pub creation_date: Option<DateTime<Utc>>,
    pub registrar: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
}

/// Looks up registration data for a domain
#[async_trait]
pub trait RegistrationLookup: Send + Sync {
    async fn lookup(&self, domain: &str) -> Result<WhoisRecord, LookupError>;
}

/// `RegistrationLookup` speaking the WHOIS protocol through whois-rust
///
/// Queries start at a root server and follow `refer:` or `whois:` lines (IANA)
/// and `Registrar WHOIS Server:` lines (registries) up to `follow` hops. Every
/// query is pinned to one server; whois-rust's own referral following is not
/// used. The blocking socket work runs on tokio's blocking pool and the whole
/// chain shares one deadline.
#[derive(Clone)]
pub struct WhoisClient {
    whois: Arc<WhoIs>,
    root: WhoIsServerValue,
    root_host: String,
    follow: u16,
    timeout: Duration,
}

impl WhoisClient {
    pub fn new(server: &str, follow: u16, timeout: Duration) -> anyhow::Result<Self> {
        debug!("Creating WHOIS client rooted at {} (follow={})", server, follow);
        let root = WhoIsServerValue::from_string(server)
            .with_context(|| format!("Invalid WHOIS server: {}", server))?;
        let whois = WhoIs::from_host(server)
            .with_context(|| format!("Invalid WHOIS server: {}", server))?;
        Ok(Self {
            whois: Arc::new(whois),
            root,
            root_host: server.to_string(),
            follow,
            timeout,
        })
    }

    /// Runs the referral chain for `domain` and returns the last answer
    ///
    /// A failed referral hop keeps the previous answer unless that answer
    /// came from the root.
    fn query_chain(&self, domain: &str) -> Result<String, LookupError> {
        let deadline = Instant::now() + self.timeout;

        let mut host = self.root_host.clone();
        let mut raw = self.query(&self.root, domain, deadline)?;
        let mut hops = 0;

        while hops < self.follow {
            let Some(next) = referral_server(&raw) else {
                break;
            };
            if next.eq_ignore_ascii_case(&host) {
                break;
            }
            let server = match WhoIsServerValue::from_string(&next) {
                Ok(server) => server,
                Err(e) => {
                    warn!("Ignoring unusable WHOIS referral {}: {}", next, e);
                    break;
                }
            };

            debug!("Following WHOIS referral for {}: {} -> {}", domain, host, next);
            match self.query(&server, domain, deadline) {
                Ok(answer) => {
                    raw = answer;
                    host = next;
                    hops += 1;
                }
                Err(e) if hops > 0 => {
                    warn!("WHOIS referral to {} failed, keeping {}'s answer: {}", next, host, e);
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        if hops == 0 && is_root_referral(&raw) {
            // A root answer describes the TLD, not the domain
            debug!("No registry answered for {} beyond {}", domain, host);
            return Err(LookupError::NotFound(domain.to_string()));
        }

        trace!("WHOIS answer for {} came from {} after {} hop(s)", domain, host, hops);
        Ok(raw)
    }

    fn query(
        &self,
        server: &WhoIsServerValue,
        domain: &str,
        deadline: Instant,
    ) -> Result<String, LookupError> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(LookupError::Timeout(self.timeout.as_secs()));
        }

        let mut options = WhoIsLookupOptions::from_string(domain)
            .map_err(|e| LookupError::InvalidTarget(format!("{}: {}", domain, e)))?;
        options.server = Some(server.clone());
        options.follow = 0;
        options.timeout = Some(remaining);

        self.whois.lookup(options).map_err(|e| match e {
            WhoIsError::IOError(io)
                if matches!(io.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) =>
            {
                LookupError::Timeout(self.timeout.as_secs())
            }
            other => LookupError::Network(other.to_string()),
        })
    }
}

#[async_trait]
impl RegistrationLookup for WhoisClient {
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, domain: &str) -> Result<WhoisRecord, LookupError> {
        info!("Performing WHOIS lookup for domain: {}", domain);

        let client = self.clone();
        let target = domain.to_string();
        let task = tokio::task::spawn_blocking(move || client.query_chain(&target));

        let raw = match tokio::time::timeout(self.timeout, task).await {
            Err(_) => {
                warn!("WHOIS lookup for {} timed out after {:?}", domain, self.timeout);
                return Err(LookupError::Timeout(self.timeout.as_secs()));
            }
            Ok(Err(e)) => return Err(LookupError::Network(format!("WHOIS task failed: {}", e))),
            Ok(Ok(Err(e))) => {
                warn!("WHOIS lookup for {} failed: {}", domain, e);
                return Err(e);
            }
            Ok(Ok(Ok(raw))) => raw,
        };

        trace!("Raw WHOIS response for {}: {} bytes", domain, raw.len());
        parse_whois_response(domain, &raw)
    }
}

/// Server named by a referral line, without any `whois://` prefix
pub fn referral_server(raw: &str) -> Option<String> {
    let value = extract_field(raw, REFERRAL_KEYS)?;
    let value = value
        .trim_start_matches("rwhois://")
        .trim_start_matches("whois://");
    let host = value.split_whitespace().next()?.trim_end_matches('/');
    (!host.is_empty()).then(|| host.to_string())
}

fn is_root_referral(raw: &str) -> bool {
    extract_field(raw, &["refer"]).is_some()
}

/// Extracts creation date, registrar and expiration date from raw WHOIS text
pub fn parse_whois_response(domain: &str, raw: &str) -> Result<WhoisRecord, LookupError> {
    if raw.trim().is_empty() {
        return Err(LookupError::Parse(format!("empty WHOIS response for {}", domain)));
    }

    let created = extract_field(raw, CREATED_KEYS);
    let expires = extract_field(raw, EXPIRES_KEYS);
    let registrar = extract_field(raw, REGISTRAR_KEYS);

    if created.is_none() && expires.is_none() && registrar.is_none() {
        let lowered = raw.to_lowercase();
        if NOT_FOUND_MARKERS.iter().any(|marker| lowered.contains(marker)) {
            debug!("WHOIS reports no registration for {}", domain);
            return Err(LookupError::NotFound(domain.to_string()));
        }
    }

    let record = WhoisRecord {
        creation_date: created.as_deref().and_then(parse_whois_date),
        registrar,
        expiration_date: expires.as_deref().and_then(parse_whois_date),
    };

    if created.is_some() && record.creation_date.is_none() {
        warn!("Unrecognised creation date format for {}: {:?}", domain, created);
    }
    debug!("Parsed WHOIS record for {}: {:?}", domain, record);
    Ok(record)
}

/// Extract a field from the whois output by checking for multiple possible keys.
///
/// Keys are matched case-insensitively at the start of a trimmed line. When
/// the value is on the following line (as in Nominet output), that line is used.
fn extract_field(raw: &str, keys: &[&str]) -> Option<String> {
    let mut lines = raw.lines().map(str::trim);
    while let Some(line) = lines.next() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        if !keys.contains(&key.as_str()) {
            continue;
        }

        let value = value.trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
        return lines
            .find(|next| !next.is_empty())
            .filter(|next| !next.contains(':') || next.contains("://"))
            .map(str::to_string);
    }
    None
}

/// Parses the date formats commonly returned by registries
pub fn parse_whois_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let value = value
        .strip_suffix("(UTC)")
        .or_else(|| value.strip_suffix("UTC"))
        .or_else(|| value.strip_suffix("GMT"))
        .unwrap_or(value)
        .trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y.%m.%d %H:%M:%S",
        "%d-%b-%Y %H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&dt));
        }
    }

    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d", "%d-%b-%Y", "%d-%B-%Y", "%Y.%m.%d", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y",
    ];
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0).map(|dt| Utc.from_utc_datetime(&dt));
        }
    }

    None
}
