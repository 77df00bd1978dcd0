//! Page fetch and markup inspection.

mod markup;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    Client,
};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

use crate::features::LookupError;

pub use markup::{inspect_markup, ContentFeatures};

const FETCH_TIMEOUT: u64 = 5; // seconds
const DEFAULT_USER_AGENT: &str = "url-feature-api/0.1";

/// Configuration for the page fetch
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl FetchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overall request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the user agent string
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(FETCH_TIMEOUT),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Retrieves the body of a page as text
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, LookupError>;
}

/// `PageFetcher` backed by a reqwest client
///
/// Issues a single GET, follows redirects with reqwest's default policy and
/// does not look at the status code: whatever body arrives is returned.
pub struct HttpPageFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpPageFetcher {
    pub fn new(config: &FetchConfig) -> anyhow::Result<Self> {
        debug!("Initializing HTTP client with user agent: {}", config.user_agent);
        let mut headers = HeaderMap::new();
        match HeaderValue::from_str(&config.user_agent) {
            Ok(value) => {
                headers.insert(USER_AGENT, value);
            }
            Err(e) => {
                error!("Invalid user agent string '{}': {}", config.user_agent, e);
                return Err(e).context("Failed to create User-Agent header");
            }
        }

        let client = Client::builder()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            timeout: config.request_timeout,
        })
    }

    fn classify(&self, e: reqwest::Error) -> LookupError {
        if e.is_timeout() {
            LookupError::Timeout(self.timeout.as_secs())
        } else if e.is_builder() {
            LookupError::InvalidTarget(e.to_string())
        } else {
            LookupError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, LookupError> {
        info!("Fetching page content: {}", url);
        let resp = self.client.get(url).send().await.map_err(|e| {
            warn!("Failed to send request to {}: {}", url, e);
            self.classify(e)
        })?;

        debug!("Response status: {}", resp.status());
        trace!("Response headers: {:?}", resp.headers());

        let body = resp.bytes().await.map_err(|e| {
            warn!("Failed to read response body from {}: {}", url, e);
            self.classify(e)
        })?;

        String::from_utf8(body.to_vec()).map_err(|e| {
            warn!("Response body from {} is not UTF-8: {}", url, e);
            LookupError::Decode(e.to_string())
        })
    }
}
