use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The flat set of signals returned for one URL
///
/// Every key is always serialized; values that could not be determined are
/// `null`. Datetimes are RFC 3339 strings in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub url_length: usize,
    pub num_subdomains: usize,
    pub has_ip: bool,
    pub use_https: bool,
    pub suspicious_words: bool,
    pub num_special_chars: usize,
    pub tld: String,
    pub domain: String,

    pub has_forms: Option<bool>,
    pub external_redirection: Option<bool>,
    pub external_resources: Option<bool>,

    pub creation_date: Option<DateTime<Utc>>,
    pub registrar: Option<String>,
    pub expiration_date: Option<DateTime<Utc>>,
    pub domain_age_days: Option<i64>,

    pub ssl_valid: bool,
    pub ssl_expiry_days: Option<i64>,
}
