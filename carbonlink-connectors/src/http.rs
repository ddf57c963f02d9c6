//! HTTP Publisher - Posting Records to a Web API
//!
//! ## Overview
//!
//! For deployments without a broker, records are posted as JSON straight to
//! a REST endpoint, one path per channel:
//!
//! ```text
//! SensorData → POST {base_url}/sensor_data
//! Alert      → POST {base_url}/alerts
//! Heartbeat  → POST {base_url}/heartbeat
//! ```
//!
//! ## Design Decisions
//!
//! HTTP is stateless, so the publisher always reports itself connected and
//! `reconnect()` is a no-op. Reliability comes from retries instead:
//!
//! - Transport errors, 5xx and 429 are retried with exponential backoff
//! - Other 4xx fail immediately
//! - Every request carries a timeout and the retry count is capped, so the
//!   worst case for one publish is bounded
//!
//! ## Example Usage
//!
//! ```rust
//! use carbonlink_connectors::http::{HttpAuth, HttpConfig, HttpPublisher};
//!
//! let config = HttpConfig::new("http://localhost:3000/api/carbon-burner")
//!     .auth(HttpAuth::Bearer("device-key".into()))
//!     .timeout_secs(5)
//!     .max_retries(2);
//!
//! let publisher = HttpPublisher::new(config).unwrap();
//! assert_eq!(
//!     publisher.url_for(carbonlink_core::Channel::Alert),
//!     "http://localhost:3000/api/carbon-burner/alerts"
//! );
//! ```

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use carbonlink_core::errors::{ConnectError, PublishError};
use carbonlink_core::payload::{Channel, Record};
use carbonlink_core::traits::{TelemetryPublisher, TransportStatus};
use thiserror::Error;

use crate::{encode_record, ConnectionStats, Connector};

/// HTTP-specific errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(String),

    /// Server returned error status
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<HttpError> for PublishError {
    fn from(err: HttpError) -> Self {
        match err {
            HttpError::Request(_) => PublishError::Rejected {
                reason: "network error",
            },
            HttpError::ServerError { status, .. } if status >= 500 => PublishError::Rejected {
                reason: "server error",
            },
            HttpError::ServerError { .. } => PublishError::Rejected {
                reason: "request refused",
            },
            HttpError::Serialization(_) => PublishError::Encoding,
            HttpError::Config(_) => PublishError::Rejected {
                reason: "invalid configuration",
            },
        }
    }
}

/// HTTP configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Base URL; channel paths are appended to it
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Device credentials
    pub auth: HttpAuth,
    /// Extra headers sent with every request
    pub headers: HashMap<String, String>,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry
    pub retry_backoff: Duration,
    /// User agent string
    pub user_agent: String,
}

/// How a device identifies itself to the API
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HttpAuth {
    /// No credentials
    #[default]
    Anonymous,
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// `Authorization: Basic <base64(username:password)>`
    Basic { username: String, password: String },
    /// Device key in a custom header, e.g. `X-API-Key`
    KeyHeader { header: String, key: String },
}

impl HttpAuth {
    /// Header name and value to attach, if any
    pub fn header(&self) -> Option<(&str, String)> {
        match self {
            HttpAuth::Anonymous => None,
            HttpAuth::Bearer(token) => Some(("Authorization", format!("Bearer {}", token))),
            HttpAuth::Basic { username, password } => {
                let encoded = base64::engine::general_purpose::STANDARD
                    .encode(format!("{}:{}", username, password));
                Some(("Authorization", format!("Basic {}", encoded)))
            }
            HttpAuth::KeyHeader { header, key } => Some((header.as_str(), key.clone())),
        }
    }
}

impl HttpConfig {
    /// Configuration for an API rooted at `base_url`
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(5),
            auth: HttpAuth::Anonymous,
            headers: HashMap::new(),
            max_retries: 2,
            retry_backoff: Duration::from_millis(100),
            user_agent: format!("CarbonLink/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Set device credentials
    pub fn auth(mut self, auth: HttpAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Set request timeout in seconds
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Set retry cap
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set initial retry delay
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Add a header to every request
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// Telemetry publisher posting to a REST API via `ureq`
pub struct HttpPublisher {
    config: HttpConfig,
    agent: ureq::Agent,
    stats: ConnectionStats,
}

impl HttpPublisher {
    /// Create new HTTP publisher
    pub fn new(config: HttpConfig) -> Result<Self, HttpError> {
        // Validate base URL
        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(HttpError::Config("Base URL must start with http:// or https://".into()));
        }
        if config.timeout.is_zero() {
            return Err(HttpError::Config("Request timeout must be non-zero".into()));
        }

        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build();

        Ok(Self {
            config,
            agent,
            stats: ConnectionStats::default(),
        })
    }

    /// Endpoint for a channel
    pub fn url_for(&self, channel: Channel) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), channel.path())
    }

    /// Delay before retry number `attempt` (1-based)
    fn backoff(&self, attempt: u32) -> Duration {
        self.config.retry_backoff * (1u32 << (attempt - 1).min(8))
    }

    /// Attach credentials, extra headers and the JSON content type
    fn build_request(&self, mut request: ureq::Request) -> ureq::Request {
        if let Some((name, value)) = self.config.auth.header() {
            request = request.set(name, &value);
        }
        for (name, value) in &self.config.headers {
            request = request.set(name, value);
        }
        request.set("Content-Type", "application/json")
    }

    /// POST a JSON body with retry logic
    fn post_with_retry(&self, url: &str, body: &[u8]) -> Result<u16, HttpError> {
        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.backoff(attempt));
            }

            let request = self.build_request(self.agent.post(url));
            match request.send_bytes(body) {
                Ok(response) => return Ok(response.status()),
                Err(ureq::Error::Status(code, response)) => {
                    let error = HttpError::ServerError {
                        status: code,
                        message: response.into_string().unwrap_or_default(),
                    };
                    // Server error or rate limit - retry
                    if code >= 500 || code == 429 {
                        log::debug!("POST {} returned {}, attempt {}", url, code, attempt + 1);
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(ureq::Error::Transport(e)) => {
                    log::debug!("POST {} failed: {}, attempt {}", url, e, attempt + 1);
                    last_error = Some(HttpError::Request(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| HttpError::Request("Unknown error".into())))
    }
}

impl Connector for HttpPublisher {
    type Error = HttpError;

    fn send(&mut self, url: &str, data: &[u8]) -> Result<(), Self::Error> {
        match self.post_with_retry(url, data) {
            Ok(_) => {
                self.stats.record_sent(data.len());
                Ok(())
            }
            Err(e) => {
                self.stats.record_failure(&e);
                Err(e)
            }
        }
    }

    fn stats(&self) -> &ConnectionStats {
        &self.stats
    }
}

impl TelemetryPublisher for HttpPublisher {
    fn publish(&mut self, channel: Channel, payload: &Record) -> Result<(), PublishError> {
        let data = encode_record(payload)?;
        let url = self.url_for(channel);
        self.send(&url, &data).map_err(PublishError::from)
    }
}

impl TransportStatus for HttpPublisher {
    fn is_connected(&self) -> bool {
        // HTTP is stateless, so we're always "connected"
        true
    }

    fn reconnect(&mut self) -> Result<(), ConnectError> {
        Ok(())
    }
}
