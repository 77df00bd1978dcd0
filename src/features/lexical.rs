use tracing::trace;

use crate::url_parser::ParsedUrl;

/// Keywords whose presence anywhere in the URL raises `suspicious_words`
pub const SUSPICIOUS_WORDS: [&str; 5] = ["secure", "account", "login", "signin", "payment"];

/// Characters counted by `num_special_chars`
pub const SPECIAL_CHARS: [char; 6] = ['@', '&', '%', '#', '$', '='];

/// Signals computed from the URL string alone
///
/// All checks are literal and case-sensitive substring tests on the raw input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalFeatures {
    pub url_length: usize,
    pub num_subdomains: usize,
    pub has_ip: bool,
    pub use_https: bool,
    pub suspicious_words: bool,
    pub num_special_chars: usize,
    pub tld: String,
    pub domain: String,
}

impl LexicalFeatures {
    pub fn analyze(url: &str) -> Self {
        let parsed = ParsedUrl::new(url);
        Self::from_parsed(&parsed)
    }

    pub fn from_parsed(parsed: &ParsedUrl) -> Self {
        let url = parsed.url.as_str();

        let features = LexicalFeatures {
            url_length: url.chars().count(),
            num_subdomains: parsed.subdomain_labels().len(),
            // Digits anywhere in the label, not a real IP-literal test
            has_ip: parsed.domain.chars().any(|c| c.is_ascii_digit()),
            use_https: url.contains("https"),
            suspicious_words: SUSPICIOUS_WORDS.iter().any(|word| url.contains(word)),
            num_special_chars: url.chars().filter(|c| SPECIAL_CHARS.contains(c)).count(),
            tld: parsed.suffix.clone(),
            domain: parsed.domain_with_suffix(),
        };

        trace!("Lexical features for {}: {:?}", url, features);
        features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_length_counts_characters() {
        assert_eq!(LexicalFeatures::analyze("http://example.com").url_length, 18);
        // Multi-byte characters count once
        assert_eq!(LexicalFeatures::analyze("http://bücher.de").url_length, 16);
    }

    #[test]
    fn test_special_char_count() {
        assert_eq!(LexicalFeatures::analyze("http://a@b#c=1").num_special_chars, 3);
        assert_eq!(
            LexicalFeatures::analyze("http://x.com/?a=1&b=%20$#").num_special_chars,
            6
        );
        assert_eq!(LexicalFeatures::analyze("http://example.com").num_special_chars, 0);
    }

    #[test]
    fn test_suspicious_words_are_case_sensitive_substrings() {
        assert!(LexicalFeatures::analyze("http://bank-login.example.com").suspicious_words);
        assert!(LexicalFeatures::analyze("http://example.com/mypayments").suspicious_words);
        assert!(!LexicalFeatures::analyze("http://LOGIN.example.com").suspicious_words);
        assert!(!LexicalFeatures::analyze("http://example.com").suspicious_words);
    }

    #[test]
    fn test_use_https_is_not_scheme_aware() {
        assert!(LexicalFeatures::analyze("https://example.com").use_https);
        assert!(LexicalFeatures::analyze("http://example.com/?next=https").use_https);
        assert!(!LexicalFeatures::analyze("http://example.com").use_https);
    }

    #[test]
    fn test_subdomain_count() {
        assert_eq!(LexicalFeatures::analyze("http://example.com").num_subdomains, 0);
        assert_eq!(LexicalFeatures::analyze("http://www.example.com").num_subdomains, 1);
        assert_eq!(
            LexicalFeatures::analyze("http://a.b.c.example.co.uk").num_subdomains,
            3
        );
    }

    #[test]
    fn test_has_ip_flags_digits_in_label() {
        assert!(LexicalFeatures::analyze("http://192.com").has_ip);
        assert!(LexicalFeatures::analyze("http://paypa1.com").has_ip);
        assert!(LexicalFeatures::analyze("http://192.168.0.1/").has_ip);
        assert!(!LexicalFeatures::analyze("http://example.com").has_ip);
        // Digits in the subdomain do not count
        assert!(!LexicalFeatures::analyze("http://host42.example.com").has_ip);
    }

    #[test]
    fn test_tld_and_domain() {
        let features = LexicalFeatures::analyze("https://secure-login.example.co.uk/account");
        assert_eq!(features.tld, "co.uk");
        assert_eq!(features.domain, "example.co.uk");
    }
}
