use std::net::IpAddr;
use tracing::trace;

/// Host portion of a URL together with whether it is an IP literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub name: String,
    pub is_ip: bool,
}

/// Extracts the host from a URL string without requiring it to be well formed
///
/// The scheme is optional. The netloc ends at the first `/`, `?` or `#`;
/// userinfo, port and trailing dots are removed. The caller's letter case is
/// kept. Bracketed IPv6 literals come back without their brackets.
pub fn extract_host(url: &str) -> Host {
    let rest = strip_scheme(url.trim_start());

    let netloc_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
    let netloc = &rest[..netloc_end];

    // Userinfo may itself contain '@', the host follows the last one
    let host_port = match netloc.rfind('@') {
        Some(at) => &netloc[at + 1..],
        None => netloc,
    };

    if let Some(bracketed) = host_port.strip_prefix('[') {
        if let Some(close) = bracketed.find(']') {
            let literal = bracketed[..close].to_string();
            trace!("Bracketed host literal: {}", literal);
            let is_ip = literal.parse::<IpAddr>().is_ok();
            return Host { name: literal, is_ip };
        }
    }

    let host = host_port.split(':').next().unwrap_or("");
    let name = host.trim_end_matches('.').to_string();
    let is_ip = name.parse::<IpAddr>().is_ok();
    Host { name, is_ip }
}

/// Removes a leading `scheme://` or bare `//`, leaving anything else untouched
fn strip_scheme(url: &str) -> &str {
    if let Some(rest) = url.strip_prefix("//") {
        return rest;
    }
    if let Some(colon) = url.find("://") {
        let scheme = &url[..colon];
        let valid_scheme = !scheme.is_empty()
            && scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if valid_scheme {
            return &url[colon + 3..];
        }
    }
    url
}
