//! HTTP transport for the classifier
//!
//! This module issues single outbound GET requests:
//! - Normalizing scheme-less URLs to `http://`
//! - Selecting the redirect policy for the request
//! - Applying the per-request timeout configured on the client
//! - Turning rejected statuses into errors that still carry the response
//!
//! Retries live in [`crate::probe::retry`]; this layer makes exactly one attempt.

use crate::config::{ProbeConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, SERVER};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// How redirects are followed for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// The HTTP client's default redirect policy
    Standard,
    /// At most `max-redirects` hops; exceeding the cap is a redirect failure
    Limited,
}

/// Which response statuses count as success
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptStatus {
    /// 2xx only
    Success,
    /// Any status strictly below the given code
    Below(u16),
}

impl AcceptStatus {
    pub fn accepts(&self, status: StatusCode) -> bool {
        match self {
            Self::Success => status.is_success(),
            Self::Below(limit) => status.as_u16() < *limit,
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    pub redirect: RedirectMode,
    pub accept: AcceptStatus,
}

impl FetchOptions {
    /// Default redirects, 2xx only. Used for platform detection and liveness.
    pub fn standard() -> Self {
        Self {
            redirect: RedirectMode::Standard,
            accept: AcceptStatus::Success,
        }
    }

    /// Capped redirects, anything below 400 accepted. Used for the password gate.
    pub fn password_gate() -> Self {
        Self {
            redirect: RedirectMode::Limited,
            accept: AcceptStatus::Below(400),
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::standard()
    }
}

/// Snapshot of a received HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// URL after redirects, when the transport can tell
    pub final_url: Option<Url>,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body as text
    pub body: String,
}

impl HttpResponse {
    /// Value of the `Server` header, if present and readable
    pub fn server_header(&self) -> Option<&str> {
        self.headers.get(SERVER).and_then(|v| v.to_str().ok())
    }
}

/// A single failed request
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {} from {url}", .response.status)]
    Status {
        url: String,
        response: Box<HttpResponse>,
    },

    #[error("redirect failure for {url}: {message}")]
    Redirect { url: String, message: String },

    #[error("failed to read body from {url}: {message}")]
    Body { url: String, message: String },

    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
}

impl FetchError {
    /// The response attached to the failure, when a server answered
    pub fn response(&self) -> Option<&HttpResponse> {
        match self {
            Self::Status { response, .. } => Some(response),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response().map(|r| r.status)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// True for redirect-cap failures and rejected 3xx responses
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect { .. })
            || self.status().is_some_and(|s| s.is_redirection())
    }
}

/// Issues one GET request
///
/// Implementations make a single attempt and never retry.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<HttpResponse, FetchError>;
}

/// Prefixes `http://` when the URL carries neither `http://` nor `https://`
///
/// # Example
///
/// ```
/// use storefront_probe::probe::normalize_scheme;
///
/// assert_eq!(normalize_scheme("example.com"), "http://example.com");
/// assert_eq!(normalize_scheme("https://example.com"), "https://example.com");
/// ```
pub fn normalize_scheme(url: &str) -> String {
    let trimmed = url.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{}", trimmed)
    }
}

/// Builds the user agent string: `Name/Version (+ContactURL; ContactEmail)`
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.probe_name, config.probe_version, config.contact_url, config.contact_email
    )
}

/// Builds an HTTP client with the given redirect policy
///
/// # Arguments
///
/// * `probe` - Timeouts for every request
/// * `user_agent` - Identification sent with every request
/// * `redirect` - Redirect policy for this client
pub fn build_http_client(
    probe: &ProbeConfig,
    user_agent: &UserAgentConfig,
    redirect: Policy,
) -> Result<Client, reqwest::Error> {
    let timeout = Duration::from_millis(probe.timeout_ms);

    Client::builder()
        .user_agent(user_agent_string(user_agent))
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(redirect)
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by reqwest
///
/// reqwest fixes the redirect policy per client, so one client is kept per
/// [`RedirectMode`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    standard: Client,
    limited: Client,
}

impl ReqwestTransport {
    pub fn new(probe: &ProbeConfig, user_agent: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            standard: build_http_client(probe, user_agent, Policy::default())?,
            limited: build_http_client(probe, user_agent, Policy::limited(probe.max_redirects))?,
        })
    }

    fn client(&self, mode: RedirectMode) -> &Client {
        match mode {
            RedirectMode::Standard => &self.standard,
            RedirectMode::Limited => &self.limited,
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<HttpResponse, FetchError> {
        let url = normalize_scheme(url);
        let parsed = Url::parse(&url).map_err(|e| FetchError::InvalidUrl {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let response = self
            .client(options.redirect)
            .get(parsed)
            .send()
            .await
            .map_err(|e| classify_error(&url, e))?;

        let status = response.status();
        let final_url = Some(response.url().clone());
        let headers = response.headers().clone();

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout { url: url.clone() }
            } else {
                FetchError::Body {
                    url: url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let snapshot = HttpResponse {
            status,
            final_url,
            headers,
            body,
        };

        if options.accept.accepts(status) {
            Ok(snapshot)
        } else {
            Err(FetchError::Status {
                url,
                response: Box::new(snapshot),
            })
        }
    }
}

/// Maps a reqwest send error onto the transport taxonomy
fn classify_error(url: &str, e: reqwest::Error) -> FetchError {
    let url = url.to_string();
    if e.is_timeout() {
        FetchError::Timeout { url }
    } else if e.is_redirect() {
        FetchError::Redirect {
            url,
            message: e.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url,
            message: e.to_string(),
        }
    } else if e.is_builder() {
        FetchError::InvalidUrl {
            url,
            message: e.to_string(),
        }
    } else {
        FetchError::Network {
            url,
            message: e.to_string(),
        }
    }
}
