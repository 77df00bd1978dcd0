use tracing::{debug, instrument, trace};

use super::host::extract_host;

/// A URL split into subdomain, registrable domain label and public suffix
///
/// Splitting follows the ICANN section of the public suffix list. Private
/// registrations such as `github.io` are not suffixes here, so
/// `user.github.io` has `github` as its domain label. Parsing never fails:
/// input without a usable host simply yields empty parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub url: String,
    pub host: String,
    pub subdomain: String,
    pub domain: String,
    pub suffix: String,
}

impl ParsedUrl {
    #[instrument(level = "trace", skip_all, fields(url = %url))]
    pub fn new(url: &str) -> Self {
        let host = extract_host(url);
        trace!("Extracted host: {:?}", host);

        let (subdomain, domain, suffix) = if host.is_ip {
            (String::new(), host.name.clone(), String::new())
        } else {
            split_host(&host.name)
        };

        debug!(
            "Split host {} into subdomain={:?} domain={:?} suffix={:?}",
            host.name, subdomain, domain, suffix
        );

        ParsedUrl {
            url: url.to_string(),
            host: host.name,
            subdomain,
            domain,
            suffix,
        }
    }

    /// Domain label and suffix joined with a dot
    ///
    /// The join is literal: an empty suffix leaves a trailing dot.
    pub fn domain_with_suffix(&self) -> String {
        format!("{}.{}", self.domain, self.suffix)
    }

    /// Dot-separated labels of the subdomain, empty when there is none
    pub fn subdomain_labels(&self) -> Vec<&str> {
        if self.subdomain.is_empty() {
            Vec::new()
        } else {
            self.subdomain.split('.').collect()
        }
    }
}

fn split_host(host: &str) -> (String, String, String) {
    if host.is_empty() {
        return (String::new(), String::new(), String::new());
    }

    // Suffix rules are lowercase; ASCII folding keeps byte offsets valid for `host`
    let suffix_len = icann_suffix_len(&host.to_ascii_lowercase()).unwrap_or(0);
    let suffix = &host[host.len() - suffix_len..];
    let remainder = host[..host.len() - suffix_len].trim_end_matches('.');

    let (subdomain, domain) = match remainder.rsplit_once('.') {
        Some((subdomain, domain)) => (subdomain, domain),
        None => ("", remainder),
    };

    (subdomain.to_string(), domain.to_string(), suffix.to_string())
}

/// Byte length of the longest ICANN public suffix of `host`, or `None` when
/// the last label is not a known suffix
fn icann_suffix_len(host: &str) -> Option<usize> {
    let mut candidate = host;
    loop {
        let suffix = psl::suffix(candidate.as_bytes())?;
        if !suffix.is_known() {
            return None;
        }
        let len = suffix.as_bytes().len();
        match suffix.typ() {
            Some(psl::Type::Private) => {
                // Private rules extend an ICANN suffix; retry on its parent
                let matched = &candidate[candidate.len() - len..];
                candidate = matched.split_once('.')?.1;
            }
            _ => return Some(len),
        }
    }
}
