use serde::{Deserialize, Serialize};

/// Form body of `POST /detect`
#[derive(Debug, Deserialize, Clone)]
pub struct DetectRequest {
    /// URL to collect features for
    pub url: String,
}

/// Standard error response format for the API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always "error"
    pub status: String,

    /// Detailed error message
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Response for health check endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime_secs: u64,
}
