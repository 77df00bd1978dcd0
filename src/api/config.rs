use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use crate::content::FetchConfig;
use crate::features::ExtractorConfig;

/// Prefix for environment overrides, e.g. `URL_FEATURES_PORT=9000`
pub const ENV_PREFIX: &str = "URL_FEATURES";

/// Configuration for the API server
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ApiConfig {
    /// Address to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Directory for log files
    pub log_dir: String,

    pub fetch_timeout_secs: u64,
    pub tls_timeout_secs: u64,
    pub whois_timeout_secs: u64,

    /// Root WHOIS server; referrals are followed from here
    pub whois_server: String,

    /// Maximum number of WHOIS referrals to follow
    pub whois_follow: u16,

    /// User-Agent sent with the page fetch
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            log_dir: "logs".to_string(),
            fetch_timeout_secs: 5,
            tls_timeout_secs: 5,
            whois_timeout_secs: 10,
            whois_server: "whois.iana.org".to_string(),
            whois_follow: 2,
            user_agent: "url-feature-api/0.1".to_string(),
        }
    }
}

impl ApiConfig {
    /// Loads defaults, then the optional TOML file, then `URL_FEATURES_*` variables
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let mut builder = Config::builder()
            .set_default("host", defaults.host)?
            .set_default("port", i64::from(defaults.port))?
            .set_default("log_dir", defaults.log_dir)?
            .set_default("fetch_timeout_secs", defaults.fetch_timeout_secs as i64)?
            .set_default("tls_timeout_secs", defaults.tls_timeout_secs as i64)?
            .set_default("whois_timeout_secs", defaults.whois_timeout_secs as i64)?
            .set_default("whois_server", defaults.whois_server)?
            .set_default("whois_follow", i64::from(defaults.whois_follow))?
            .set_default("user_agent", defaults.user_agent)?;

        if let Some(path) = path {
            debug!("Reading configuration file: {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        builder
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .context("Failed to assemble configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Settings for the extractor's network collaborators
    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig {
            fetch: FetchConfig::new()
                .with_request_timeout(Duration::from_secs(self.fetch_timeout_secs))
                .with_user_agent(self.user_agent.clone()),
            tls_timeout: Duration::from_secs(self.tls_timeout_secs),
            whois_server: self.whois_server.clone(),
            whois_follow: self.whois_follow,
            whois_timeout: Duration::from_secs(self.whois_timeout_secs),
        }
    }
}
