//! Lenient URL splitting into subdomain, domain label and public suffix.

mod host;
mod parser;

pub use host::{extract_host, Host};
pub use parser::ParsedUrl;
